//! Process-local [`DrawStore`] used by tests and single-node demo runs.

use std::{sync::Arc, time::SystemTime};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::dao::{
    draw_store::DrawStore,
    models::{DrawOverrideEntity, DrawQuery, DrawResultEntity, GameStateEntity},
    storage::{StorageError, StorageResult},
};

const DRAW_COLLECTION: &str = "draw_results";

/// In-memory backend. Cloning shares the same underlying maps.
#[derive(Clone, Default)]
pub struct MemoryDrawStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    state: Mutex<Option<GameStateEntity>>,
    draws: DashMap<u32, DrawResultEntity>,
    overrides: DashMap<u32, DrawOverrideEntity>,
}

impl MemoryDrawStore {
    /// Create an empty store with no game state seeded.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DrawStore for MemoryDrawStore {
    fn load_game_state(&self) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.state.lock().await.clone()) })
    }

    fn insert_game_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.state.lock().await;
            if guard.is_some() {
                return Ok(false);
            }
            *guard = Some(state);
            Ok(true)
        })
    }

    fn advance_game_state(
        &self,
        expected_current: u32,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.state.lock().await;
            let Some(current) = guard.as_ref() else {
                return Ok(None);
            };
            if current.current_draw_number != expected_current {
                return Ok(None);
            }
            let next = current.advanced(now)?;
            *guard = Some(next.clone());
            Ok(Some(next))
        })
    }

    fn update_draw_interval(
        &self,
        seconds: u32,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.state.lock().await;
            Ok(guard.as_mut().map(|state| {
                state.draw_interval_seconds = seconds;
                state.updated_at = now;
                state.clone()
            }))
        })
    }

    fn insert_draw_result(&self, draw: DrawResultEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            match inner.draws.entry(draw.draw_number) {
                Entry::Occupied(_) => Err(StorageError::duplicate(
                    DRAW_COLLECTION,
                    draw.draw_number,
                )),
                Entry::Vacant(slot) => {
                    slot.insert(draw);
                    Ok(())
                }
            }
        })
    }

    fn find_draw_result(
        &self,
        draw_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<DrawResultEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .draws
                .get(&draw_number)
                .map(|entry| entry.value().clone()))
        })
    }

    fn list_draw_results(
        &self,
        query: DrawQuery,
    ) -> BoxFuture<'static, StorageResult<Vec<DrawResultEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut draws: Vec<DrawResultEntity> = inner
                .draws
                .iter()
                .filter(|entry| query.matches(entry.value()))
                .map(|entry| entry.value().clone())
                .collect();
            draws.sort_by(|a, b| b.draw_number.cmp(&a.draw_number));
            if let Some(limit) = query.limit {
                draws.truncate(limit);
            }
            Ok(draws)
        })
    }

    fn upsert_override(
        &self,
        entry: DrawOverrideEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.overrides.insert(entry.draw_number, entry);
            Ok(())
        })
    }

    fn find_override(
        &self,
        draw_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<DrawOverrideEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .overrides
                .get(&draw_number)
                .map(|entry| entry.value().clone()))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dao::models::{ColorEntity, DrawSourceEntity};

    fn state(current: u32) -> GameStateEntity {
        GameStateEntity {
            current_draw_number: current,
            next_draw_number: current + 1,
            next_draw_time: None,
            draw_interval_seconds: 180,
            updated_at: SystemTime::UNIX_EPOCH,
        }
    }

    fn draw(draw_number: u32, winning_number: u8) -> DrawResultEntity {
        DrawResultEntity {
            draw_number,
            winning_number,
            winning_color: ColorEntity::Black,
            draw_time: SystemTime::UNIX_EPOCH + Duration::from_secs(u64::from(draw_number)),
            total_bets: 0,
            total_stake: 0,
            total_payout: 0,
            source: DrawSourceEntity::Manual,
        }
    }

    #[tokio::test]
    async fn game_state_is_inserted_once() {
        let store = MemoryDrawStore::new();
        assert!(store.insert_game_state(state(1)).await.unwrap());
        assert!(!store.insert_game_state(state(50)).await.unwrap());
        let loaded = store.load_game_state().await.unwrap().unwrap();
        assert_eq!(loaded.current_draw_number, 1);
    }

    #[tokio::test]
    async fn advance_is_compare_and_swap() {
        let store = MemoryDrawStore::new();
        store.insert_game_state(state(7)).await.unwrap();

        let now = SystemTime::now();
        let first = store.advance_game_state(7, now).await.unwrap();
        let second = store.advance_game_state(7, now).await.unwrap();

        assert_eq!(first.map(|s| s.current_draw_number), Some(8));
        assert!(second.is_none());
        let loaded = store.load_game_state().await.unwrap().unwrap();
        assert_eq!(loaded.current_draw_number, 8);
        assert_eq!(loaded.next_draw_number, 9);
    }

    #[tokio::test]
    async fn duplicate_draws_are_rejected() {
        let store = MemoryDrawStore::new();
        store.insert_draw_result(draw(3, 17)).await.unwrap();
        let err = store.insert_draw_result(draw(3, 2)).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { .. }));
        let kept = store.find_draw_result(3).await.unwrap().unwrap();
        assert_eq!(kept.winning_number, 17);
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_limited() {
        let store = MemoryDrawStore::new();
        for n in 1..=5 {
            store.insert_draw_result(draw(n, 1)).await.unwrap();
        }
        let listed = store
            .list_draw_results(DrawQuery {
                from_draw: Some(2),
                limit: Some(3),
                ..DrawQuery::default()
            })
            .await
            .unwrap();
        let numbers: Vec<u32> = listed.iter().map(|d| d.draw_number).collect();
        assert_eq!(numbers, vec![5, 4, 3]);
    }
}
