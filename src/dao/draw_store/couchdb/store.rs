use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use tracing::debug;

use crate::dao::{
    draw_store::DrawStore,
    models::{DrawOverrideEntity, DrawQuery, DrawResultEntity, GameStateEntity},
    storage::{StorageError, StorageResult},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchDrawDocument, CouchGameStateDocument, CouchOverrideDocument,
        DRAW_PREFIX, END_SUFFIX, GAME_STATE_DOC_ID, draw_doc_id, override_doc_id,
    },
};

const DRAW_COLLECTION: &str = "draw_results";
const MAX_CONFLICT_RETRIES: u32 = 3;
/// Rows fetched per `_all_docs` page when a listing needs filtering beyond the key range.
const DRAW_PAGE_SIZE: usize = 200;

/// Newest-first walk over the draw key range of a [`DrawQuery`].
#[derive(Debug, PartialEq, Eq)]
struct DrawScan {
    /// High end of the range; `_all_docs` is read with `descending=true`.
    start_key: String,
    end_key: String,
    page_size: usize,
}

impl DrawScan {
    /// `None` when the query cannot match anything (inverted range or zero limit).
    fn plan(query: &DrawQuery) -> Option<Self> {
        let from = query.from_draw.unwrap_or(0);
        if query.to_draw.is_some_and(|to| to < from) || query.limit == Some(0) {
            return None;
        }

        let start_key = match query.to_draw {
            Some(to) => draw_doc_id(to),
            None => format!("{DRAW_PREFIX}{END_SUFFIX}"),
        };
        // Key bounds are exact for draw numbers; time bounds still filter rows after the fetch.
        let page_size = match (query.limit, query.since.is_none() && query.until.is_none()) {
            (Some(limit), true) => limit,
            (Some(limit), false) => limit.max(DRAW_PAGE_SIZE),
            (None, _) => DRAW_PAGE_SIZE,
        };

        Some(Self {
            start_key,
            end_key: draw_doc_id(from),
            page_size,
        })
    }
}

/// Result of a document PUT. CouchDB answers 409 when the revision is stale or the id is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PutOutcome {
    Written,
    Conflict,
}

#[derive(Clone)]
pub struct CouchDrawStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchDrawStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.with_auth(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .with_auth(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                // 412 means another instance created it first.
                if create.status().is_success() || create.status() == StatusCode::PRECONDITION_FAILED
                {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<PutOutcome>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(PutOutcome::Conflict),
            status if status.is_success() => Ok(PutOutcome::Written),
            status => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status,
            }),
        }
    }

    /// Fetch one page of documents whose ids run from `start_key` down to `end_key`, skipping
    /// the first `skip` rows.
    async fn list_documents_descending<T>(
        &self,
        start_key: &str,
        end_key: &str,
        limit: usize,
        skip: usize,
    ) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_string()),
            ("descending", "true".to_string()),
            ("startkey", format!("\"{start_key}\"")),
            ("endkey", format!("\"{end_key}\"")),
            ("limit", limit.to_string()),
            ("skip", skip.to_string()),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(|doc| {
                from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: ALL_DOCS.to_string(),
                    source,
                })
            })
            .collect()
    }

    async fn load_game_state(&self) -> CouchResult<Option<GameStateEntity>> {
        let doc = self
            .get_document::<CouchGameStateDocument>(GAME_STATE_DOC_ID)
            .await?;
        Ok(doc.map(Into::into))
    }

    async fn insert_game_state(&self, state: GameStateEntity) -> CouchResult<bool> {
        let doc = CouchGameStateDocument::from((state, None));
        let outcome = self.put_document(GAME_STATE_DOC_ID, &doc).await?;
        Ok(outcome == PutOutcome::Written)
    }

    async fn advance_game_state(
        &self,
        expected_current: u32,
        now: SystemTime,
    ) -> CouchResult<Option<GameStateEntity>> {
        let Some(doc) = self
            .get_document::<CouchGameStateDocument>(GAME_STATE_DOC_ID)
            .await?
        else {
            return Ok(None);
        };
        if doc.current_draw_number != expected_current {
            return Ok(None);
        }

        let rev = doc.rev.clone();
        let next = GameStateEntity::from(doc).advanced(now)?;
        let updated = CouchGameStateDocument::from((next.clone(), rev));
        // The revision we read acts as the compare-and-swap token.
        match self.put_document(GAME_STATE_DOC_ID, &updated).await? {
            PutOutcome::Written => Ok(Some(next)),
            PutOutcome::Conflict => {
                debug!(expected_current, "game state advance lost the race");
                Ok(None)
            }
        }
    }

    async fn update_draw_interval(
        &self,
        seconds: u32,
        now: SystemTime,
    ) -> CouchResult<Option<GameStateEntity>> {
        for _ in 0..MAX_CONFLICT_RETRIES {
            let Some(doc) = self
                .get_document::<CouchGameStateDocument>(GAME_STATE_DOC_ID)
                .await?
            else {
                return Ok(None);
            };

            let rev = doc.rev.clone();
            let mut state = GameStateEntity::from(doc);
            state.draw_interval_seconds = seconds;
            state.updated_at = now;
            let updated = CouchGameStateDocument::from((state.clone(), rev));
            if self.put_document(GAME_STATE_DOC_ID, &updated).await? == PutOutcome::Written {
                return Ok(Some(state));
            }
        }

        Err(CouchDaoError::ConflictRetriesExhausted {
            doc_id: GAME_STATE_DOC_ID.to_owned(),
            attempts: MAX_CONFLICT_RETRIES,
        })
    }

    async fn list_draw_results(&self, query: DrawQuery) -> CouchResult<Vec<DrawResultEntity>> {
        let Some(scan) = DrawScan::plan(&query) else {
            return Ok(Vec::new());
        };

        let mut start_key = scan.start_key;
        let mut skip = 0;
        let mut draws = Vec::new();
        loop {
            let page = self
                .list_documents_descending::<CouchDrawDocument>(
                    &start_key,
                    &scan.end_key,
                    scan.page_size,
                    skip,
                )
                .await?;
            let fetched = page.len();
            let last_id = page.last().map(|doc| doc.id.clone());

            for doc in page {
                let draw = DrawResultEntity::try_from(doc)?;
                if query.matches(&draw) {
                    draws.push(draw);
                    if query.limit == Some(draws.len()) {
                        return Ok(draws);
                    }
                }
            }

            match last_id {
                // Resume after the last row seen.
                Some(id) if fetched == scan.page_size => {
                    start_key = id;
                    skip = 1;
                }
                _ => return Ok(draws),
            }
        }
    }

    async fn upsert_override(&self, entry: DrawOverrideEntity) -> CouchResult<()> {
        let doc_id = override_doc_id(entry.draw_number);
        for _ in 0..MAX_CONFLICT_RETRIES {
            let rev = self
                .get_document::<CouchOverrideDocument>(&doc_id)
                .await?
                .and_then(|existing| existing.rev);
            let doc = CouchOverrideDocument::from((entry.clone(), rev));
            if self.put_document(&doc_id, &doc).await? == PutOutcome::Written {
                return Ok(());
            }
        }

        Err(CouchDaoError::ConflictRetriesExhausted {
            doc_id,
            attempts: MAX_CONFLICT_RETRIES,
        })
    }
}

impl DrawStore for CouchDrawStore {
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
            let doc = CouchDrawDocument::from(draw);
            match store.put_document(&doc.id, &doc).await? {
                PutOutcome::Written => Ok(()),
                PutOutcome::Conflict => Err(StorageError::duplicate(DRAW_COLLECTION, draw_number)),
            }
        })
    }

    fn find_draw_result(
        &self,
        draw_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<DrawResultEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchDrawDocument>(&draw_doc_id(draw_number))
                .await?;
            Ok(doc.map(DrawResultEntity::try_from).transpose()?)
        })
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
        Box::pin(async move {
            let doc = store
                .get_document::<CouchOverrideDocument>(&override_doc_id(draw_number))
                .await?;
            Ok(doc.map(DrawOverrideEntity::try_from).transpose()?)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .with_auth(store.client.get(&url))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
