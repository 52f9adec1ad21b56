//! Admin-forced winning numbers for draws that have not happened yet.

use std::time::SystemTime;

use tracing::{info, warn};

use crate::{
    dao::models::DrawOverrideEntity,
    error::ServiceError,
    services::{draw_service, game_state_service, sse_events},
    state::{
        SharedState,
        draw::{OverrideNote, OverrideRecord, OverrideStatus},
        wheel::RouletteNumber,
    },
};

/// Set or replace the forced winning number of `draw_number` with the default audit note.
pub async fn set_override(
    state: &SharedState,
    draw_number: i64,
    winning_number: i64,
) -> Result<OverrideRecord, ServiceError> {
    set_override_with_note(state, draw_number, winning_number, OverrideNote::default()).await
}

/// Set or replace the forced winning number of `draw_number`.
///
/// Overrides can be rewritten any number of times until the draw is recorded. After that the
/// draw is history and the call fails with [`ServiceError::InvalidState`].
///
/// The existence check and the upsert are two storage calls. A draw recorded between them
/// leaves the written override behind; the recorded result still wins, and the call reports
/// [`ServiceError::InvalidState`] because the draw is re-checked after the write.
pub async fn set_override_with_note(
    state: &SharedState,
    draw_number: i64,
    winning_number: i64,
    note: OverrideNote,
) -> Result<OverrideRecord, ServiceError> {
    let draw_number = draw_service::validate_draw_number(draw_number)?;
    let winning_number = RouletteNumber::try_from(winning_number)?;

    if draw_service::lookup_draw(state, draw_number).await?.is_some() {
        return Err(already_recorded(draw_number));
    }

    let record = OverrideRecord {
        draw_number,
        winning_number,
        winning_color: winning_number.color(),
        is_manual: true,
        note,
        created_at: SystemTime::now(),
    };

    let store = state.require_draw_store().await?;
    store
        .upsert_override(DrawOverrideEntity::from(record.clone()))
        .await?;

    if draw_service::lookup_draw(state, draw_number).await?.is_some() {
        warn!(draw_number, "draw recorded while its override was being written");
        return Err(already_recorded(draw_number));
    }

    info!(
        draw_number,
        winning_number = %record.winning_number,
        winning_color = %record.winning_color,
        source = %record.note.source,
        reason = %record.note.reason,
        "set next draw override"
    );
    sse_events::broadcast_override_set(state, &record);
    Ok(record)
}

/// Force the winning number of whichever draw is next according to the game state.
pub async fn set_next_draw_override(
    state: &SharedState,
    winning_number: i64,
    note: OverrideNote,
) -> Result<OverrideRecord, ServiceError> {
    let current = game_state_service::get_state(state).await?;
    set_override_with_note(state, i64::from(current.next_draw_number), winning_number, note).await
}

fn already_recorded(draw_number: u32) -> ServiceError {
    ServiceError::InvalidState(format!(
        "draw {draw_number} has already been recorded; its override can no longer change"
    ))
}

/// Fetch the override of `draw_number`. Absence is the normal case.
pub async fn get_override(
    state: &SharedState,
    draw_number: u32,
) -> Result<Option<OverrideRecord>, ServiceError> {
    let store = state.require_draw_store().await?;
    store
        .find_override(draw_number)
        .await?
        .map(|entity| {
            OverrideRecord::try_from(entity).map_err(|err| {
                ServiceError::Corrupted(format!("override for draw {draw_number}: {err}"))
            })
        })
        .transpose()
}

/// Where the override slot of `draw_number` stands.
pub async fn override_status(
    state: &SharedState,
    draw_number: i64,
) -> Result<OverrideStatus, ServiceError> {
    let draw_number = draw_service::validate_draw_number(draw_number)?;
    if let Some(draw) = draw_service::lookup_draw(state, draw_number).await? {
        return Ok(OverrideStatus::Consumed(draw));
    }

    Ok(match get_override(state, draw_number).await? {
        Some(record) => OverrideStatus::Pending(record),
        None => OverrideStatus::NoOverride,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            draw_store::{DrawStore, memory::MemoryDrawStore},
            models::{DrawQuery, DrawResultEntity, DrawSourceEntity, GameStateEntity},
            storage::StorageResult,
        },
        state::{AppState, draw::BetTotals, wheel::WheelColor},
    };

    async fn fresh_state() -> SharedState {
        AppState::with_store(AppConfig::default(), Arc::new(MemoryDrawStore::new())).await
    }

    #[tokio::test]
    async fn upsert_keeps_a_single_record() {
        let state = fresh_state().await;
        set_override(&state, 10, 7).await.unwrap();
        let replaced = set_override(&state, 10, 22).await.unwrap();

        assert_eq!(replaced.winning_number.value(), 22);
        assert_eq!(replaced.winning_color, WheelColor::Black);
        assert!(replaced.is_manual);

        let stored = get_override(&state, 10).await.unwrap().unwrap();
        assert_eq!(stored, replaced);
    }

    #[tokio::test]
    async fn audit_note_is_stored_and_replaced() {
        let state = fresh_state().await;
        let first = set_override(&state, 10, 7).await.unwrap();
        assert_eq!(first.note, OverrideNote::default());

        let note = OverrideNote::new(Some("floor".into()), Some("wheel calibration".into()));
        set_override_with_note(&state, 10, 22, note.clone())
            .await
            .unwrap();

        let stored = get_override(&state, 10).await.unwrap().unwrap();
        assert_eq!(stored.note, note);
        assert_eq!(stored.winning_number.value(), 22);
    }

    #[tokio::test]
    async fn draw_recorded_during_the_write_is_reported() {
        let store = RecordsOnUpsert::default();
        let state = AppState::with_store(AppConfig::default(), Arc::new(store)).await;

        assert!(matches!(
            set_override(&state, 6, 11).await,
            Err(ServiceError::InvalidState(_))
        ));
        assert!(matches!(
            override_status(&state, 6).await.unwrap(),
            OverrideStatus::Consumed(_)
        ));
    }

    /// Memory store that records the draw right after an override for it is written.
    #[derive(Default)]
    struct RecordsOnUpsert {
        inner: MemoryDrawStore,
    }

    impl DrawStore for RecordsOnUpsert {
        fn load_game_state(&self) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
            self.inner.load_game_state()
        }

        fn insert_game_state(
            &self,
            state: GameStateEntity,
        ) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.insert_game_state(state)
        }

        fn advance_game_state(
            &self,
            expected_current: u32,
            now: SystemTime,
        ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
            self.inner.advance_game_state(expected_current, now)
        }

        fn update_draw_interval(
            &self,
            seconds: u32,
            now: SystemTime,
        ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
            self.inner.update_draw_interval(seconds, now)
        }

        fn insert_draw_result(
            &self,
            draw: DrawResultEntity,
        ) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.insert_draw_result(draw)
        }

        fn find_draw_result(
            &self,
            draw_number: u32,
        ) -> BoxFuture<'static, StorageResult<Option<DrawResultEntity>>> {
            self.inner.find_draw_result(draw_number)
        }

        fn list_draw_results(
            &self,
            query: DrawQuery,
        ) -> BoxFuture<'static, StorageResult<Vec<DrawResultEntity>>> {
            self.inner.list_draw_results(query)
        }

        fn upsert_override(
            &self,
            entry: DrawOverrideEntity,
        ) -> BoxFuture<'static, StorageResult<()>> {
            let inner = self.inner.clone();
            Box::pin(async move {
                let draw = DrawResultEntity {
                    draw_number: entry.draw_number,
                    winning_number: entry.winning_number,
                    winning_color: entry.winning_color,
                    draw_time: SystemTime::now(),
                    total_bets: 0,
                    total_stake: 0,
                    total_payout: 0,
                    source: DrawSourceEntity::Manual,
                };
                inner.upsert_override(entry).await?;
                inner.insert_draw_result(draw).await
            })
        }

        fn find_override(
            &self,
            draw_number: u32,
        ) -> BoxFuture<'static, StorageResult<Option<DrawOverrideEntity>>> {
            self.inner.find_override(draw_number)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    #[tokio::test]
    async fn absence_is_not_an_error() {
        let state = fresh_state().await;
        assert!(get_override(&state, 3).await.unwrap().is_none());
        assert_eq!(
            override_status(&state, 3).await.unwrap(),
            OverrideStatus::NoOverride
        );
    }

    #[tokio::test]
    async fn recorded_draw_consumes_the_slot() {
        let state = fresh_state().await;
        set_override(&state, 4, 36).await.unwrap();
        assert!(matches!(
            override_status(&state, 4).await.unwrap(),
            OverrideStatus::Pending(_)
        ));

        draw_service::record_draw(&state, 4, 36, BetTotals::default())
            .await
            .unwrap();
        assert!(matches!(
            override_status(&state, 4).await.unwrap(),
            OverrideStatus::Consumed(_)
        ));
        assert!(matches!(
            set_override(&state, 4, 1).await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn rejects_out_of_range_numbers() {
        let state = fresh_state().await;
        assert!(matches!(
            set_override(&state, 10, 37).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(get_override(&state, 10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn next_draw_override_follows_state() {
        let state = fresh_state().await;
        assert!(matches!(
            set_next_draw_override(&state, 5, OverrideNote::default()).await,
            Err(ServiceError::NotInitialized)
        ));

        game_state_service::initialize_state(&state, Some(12), None)
            .await
            .unwrap();
        let record = set_next_draw_override(&state, 5, OverrideNote::default()).await.unwrap();
        assert_eq!(record.draw_number, 12);
    }
}
