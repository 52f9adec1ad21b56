use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{
        GAME_STATE_ID, MongoDrawDocument, MongoGameStateDocument, MongoOverrideDocument, doc_id,
    },
};
use crate::dao::{
    draw_store::DrawStore,
    models::{DrawOverrideEntity, DrawQuery, DrawResultEntity, GameStateEntity},
    storage::{StorageError, StorageResult},
};

const STATE_COLLECTION_NAME: &str = "game_state";
const DRAW_COLLECTION_NAME: &str = "draw_results";
const OVERRIDE_COLLECTION_NAME: &str = "next_draw_overrides";

#[derive(Clone)]
pub struct MongoDrawStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoDrawStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        // Draw and override uniqueness rides on `_id`; only the time lookups need an index.
        let collection = self.database().await.collection::<Document>(DRAW_COLLECTION_NAME);
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"draw_time": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("draw_time_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: DRAW_COLLECTION_NAME,
                index: "draw_time",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn state_collection(&self) -> Collection<MongoGameStateDocument> {
        self.database().await.collection(STATE_COLLECTION_NAME)
    }

    async fn draw_collection(&self) -> Collection<MongoDrawDocument> {
        self.database().await.collection(DRAW_COLLECTION_NAME)
    }

    async fn override_collection(&self) -> Collection<MongoOverrideDocument> {
        self.database().await.collection(OVERRIDE_COLLECTION_NAME)
    }

    async fn load_game_state(&self) -> MongoResult<Option<GameStateEntity>> {
        let document = self
            .state_collection()
            .await
            .find_one(doc_id(GAME_STATE_ID))
            .await
            .map_err(|source| MongoDaoError::LoadState { source })?;

        document.map(TryInto::try_into).transpose()
    }

    async fn insert_game_state(&self, state: GameStateEntity) -> MongoResult<bool> {
        let document: MongoGameStateDocument = state.into();
        match self.state_collection().await.insert_one(&document).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(source) => Err(MongoDaoError::SaveState { source }),
        }
    }

    async fn advance_game_state(
        &self,
        expected_current: u32,
        now: SystemTime,
    ) -> MongoResult<Option<GameStateEntity>> {
        let Some(current) = self.load_game_state().await? else {
            return Ok(None);
        };
        if current.current_draw_number != expected_current {
            return Ok(None);
        }

        let next = current.advanced(now)?;
        let document: MongoGameStateDocument = next.clone().into();
        // The filter on the observed draw number turns the replace into a compare-and-swap.
        let result = self
            .state_collection()
            .await
            .replace_one(
                doc! {"_id": GAME_STATE_ID, "current_draw_number": i64::from(expected_current)},
                &document,
            )
            .await
            .map_err(|source| MongoDaoError::SaveState { source })?;

        if result.matched_count == 0 {
            debug!(expected_current, "game state advance lost the race");
            return Ok(None);
        }
        Ok(Some(next))
    }

    async fn update_draw_interval(
        &self,
        seconds: u32,
        now: SystemTime,
    ) -> MongoResult<Option<GameStateEntity>> {
        let document = self
            .state_collection()
            .await
            .find_one_and_update(
                doc_id(GAME_STATE_ID),
                doc! {"$set": {
                    "draw_interval_seconds": i64::from(seconds),
                    "updated_at": DateTime::from_system_time(now),
                }},
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::SaveState { source })?;

        document.map(TryInto::try_into).transpose()
    }

    /// Returns `false` when the draw number already exists.
    async fn insert_draw_result(&self, draw: DrawResultEntity) -> MongoResult<bool> {
        let draw_number = draw.draw_number;
        let document: MongoDrawDocument = draw.into();
        match self.draw_collection().await.insert_one(&document).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(source) => Err(MongoDaoError::SaveDraw {
                draw_number,
                source,
            }),
        }
    }

    async fn find_draw_result(&self, draw_number: u32) -> MongoResult<Option<DrawResultEntity>> {
        let document = self
            .draw_collection()
            .await
            .find_one(doc_id(i64::from(draw_number)))
            .await
            .map_err(|source| MongoDaoError::LoadDraw {
                draw_number,
                source,
            })?;

        document.map(TryInto::try_into).transpose()
    }

    async fn list_draw_results(&self, query: DrawQuery) -> MongoResult<Vec<DrawResultEntity>> {
        let collection = self.draw_collection().await;
        let mut find = collection
            .find(draw_filter(&query))
            .sort(doc! {"_id": -1});
        if let Some(limit) = query.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let documents: Vec<MongoDrawDocument> = find
            .await
            .map_err(|source| MongoDaoError::ListDraws { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListDraws { source })?;

        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn upsert_override(&self, entry: DrawOverrideEntity) -> MongoResult<()> {
        let draw_number = entry.draw_number;
        let document: MongoOverrideDocument = entry.into();
        let collection = self.override_collection().await;
        let filter = doc_id(i64::from(draw_number));

        // Two concurrent upserts on a missing `_id` can race on the insert; the loser retries
        // once and then takes the update path.
        let mut retried = false;
        loop {
            match collection
                .replace_one(filter.clone(), &document)
                .upsert(true)
                .await
            {
                Ok(_) => return Ok(()),
                Err(err) if is_duplicate_key(&err) && !retried => retried = true,
                Err(source) => {
                    return Err(MongoDaoError::SaveOverride {
                        draw_number,
                        source,
                    });
                }
            }
        }
    }

    async fn find_override(&self, draw_number: u32) -> MongoResult<Option<DrawOverrideEntity>> {
        let document = self
            .override_collection()
            .await
            .find_one(doc_id(i64::from(draw_number)))
            .await
            .map_err(|source| MongoDaoError::LoadOverride {
                draw_number,
                source,
            })?;

        document.map(TryInto::try_into).transpose()
    }
}

fn draw_filter(query: &DrawQuery) -> Document {
    let mut filter = Document::new();

    let mut number = Document::new();
    if let Some(from) = query.from_draw {
        number.insert("$gte", i64::from(from));
    }
    if let Some(to) = query.to_draw {
        number.insert("$lte", i64::from(to));
    }
    if !number.is_empty() {
        filter.insert("_id", number);
    }

    let mut time = Document::new();
    if let Some(since) = query.since {
        time.insert("$gte", DateTime::from_system_time(since));
    }
    if let Some(until) = query.until {
        time.insert("$lt", DateTime::from_system_time(until));
    }
    if !time.is_empty() {
        filter.insert("draw_time", time);
    }

    filter
}

impl DrawStore for MongoDrawStore {
    fn load_game_state(&self) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_game_state().await.map_err(Into::into) })
    }

    fn insert_game_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.insert_game_state(state).await.map_err(Into::into) })
    }

    fn advance_game_state(
        &self,
        expected_current: u32,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .advance_game_state(expected_current, now)
                .await
                .map_err(Into::into)
        })
    }

    fn update_draw_interval(
        &self,
        seconds: u32,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_draw_interval(seconds, now)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_draw_result(&self, draw: DrawResultEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let draw_number = draw.draw_number;
            if store.insert_draw_result(draw).await? {
                Ok(())
            } else {
                Err(StorageError::duplicate(DRAW_COLLECTION_NAME, draw_number))
            }
        })
    }

    fn find_draw_result(
        &self,
        draw_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<DrawResultEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_draw_result(draw_number).await.map_err(Into::into) })
    }

    fn list_draw_results(
        &self,
        query: DrawQuery,
    ) -> BoxFuture<'static, StorageResult<Vec<DrawResultEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_draw_results(query).await.map_err(Into::into) })
    }

    fn upsert_override(
        &self,
        entry: DrawOverrideEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_override(entry).await.map_err(Into::into) })
    }

    fn find_override(
        &self,
        draw_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<DrawOverrideEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_override(draw_number).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
