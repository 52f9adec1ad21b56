//! Records authoritative draw results and serves the draw history.

use std::time::SystemTime;

use tracing::{info, warn};

use crate::{
    dao::{
        models::{DrawQuery, DrawResultEntity},
        storage::StorageError,
    },
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        draw::{BetTotals, DrawResult, DrawSource},
        wheel::{RouletteNumber, WheelColor},
    },
};

/// Check that `draw_number` is a positive value that fits the draw counter.
pub fn validate_draw_number(draw_number: i64) -> Result<u32, ServiceError> {
    u32::try_from(draw_number)
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "invalid draw number {draw_number}: must be a positive integer"
            ))
        })
}

/// Record the winning number entered by an administrator for `draw_number`.
///
/// The color is derived from the number. A second call for the same draw fails with
/// [`ServiceError::DuplicateDraw`] and leaves the first result untouched.
pub async fn record_draw(
    state: &SharedState,
    draw_number: i64,
    winning_number: i64,
    totals: BetTotals,
) -> Result<DrawResult, ServiceError> {
    let draw_number = validate_draw_number(draw_number)?;
    let winning_number = RouletteNumber::try_from(winning_number)?;

    store_result(
        state,
        draw_number,
        winning_number,
        winning_number.color(),
        totals,
        DrawSource::Manual,
    )
    .await
}

/// Persist a result whose color has already been established by the caller.
///
/// Only the draw cycle calls this directly, passing the color stored on an override.
pub(crate) async fn store_result(
    state: &SharedState,
    draw_number: u32,
    winning_number: RouletteNumber,
    winning_color: WheelColor,
    totals: BetTotals,
    source: DrawSource,
) -> Result<DrawResult, ServiceError> {
    let store = state.require_draw_store().await?;
    let draw = DrawResult {
        draw_number,
        winning_number,
        winning_color,
        draw_time: SystemTime::now(),
        totals,
        source,
    };

    match store.insert_draw_result(draw.clone().into()).await {
        Ok(()) => {}
        Err(StorageError::Duplicate { .. }) => {
            warn!(draw_number, "draw already recorded; rejecting duplicate");
            return Err(ServiceError::DuplicateDraw { draw_number });
        }
        Err(err) => return Err(err.into()),
    }

    info!(
        draw_number,
        winning_number = %draw.winning_number,
        winning_color = %draw.winning_color,
        source = draw.source.as_str(),
        "recorded draw result"
    );
    sse_events::broadcast_draw_recorded(state, &draw);
    Ok(draw)
}

/// Look up the recorded result for `draw_number`.
pub async fn find_draw(state: &SharedState, draw_number: i64) -> Result<DrawResult, ServiceError> {
    let draw_number = validate_draw_number(draw_number)?;
    lookup_draw(state, draw_number)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("draw {draw_number} has not been recorded")))
}

pub(crate) async fn lookup_draw(
    state: &SharedState,
    draw_number: u32,
) -> Result<Option<DrawResult>, ServiceError> {
    let store = state.require_draw_store().await?;
    store
        .find_draw_result(draw_number)
        .await?
        .map(into_domain)
        .transpose()
}

/// List recorded draws, newest first. The row count never exceeds the configured history limit.
pub async fn list_draws(
    state: &SharedState,
    mut query: DrawQuery,
) -> Result<Vec<DrawResult>, ServiceError> {
    let cap = state.config().history_limit();
    query.limit = Some(query.limit.map_or(cap, |limit| limit.min(cap)));
    load_draws(state, query).await
}

/// Load every draw matching `query` without applying the history cap.
pub(crate) async fn load_draws(
    state: &SharedState,
    query: DrawQuery,
) -> Result<Vec<DrawResult>, ServiceError> {
    let store = state.require_draw_store().await?;
    store
        .list_draw_results(query)
        .await?
        .into_iter()
        .map(into_domain)
        .collect()
}

fn into_domain(entity: DrawResultEntity) -> Result<DrawResult, ServiceError> {
    let draw_number = entity.draw_number;
    DrawResult::try_from(entity)
        .map_err(|err| ServiceError::Corrupted(format!("draw {draw_number}: {err}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::draw_store::memory::MemoryDrawStore, state::AppState};

    async fn fresh_state() -> SharedState {
        AppState::with_store(AppConfig::default(), Arc::new(MemoryDrawStore::new())).await
    }

    #[test]
    fn draw_number_must_be_positive() {
        assert_eq!(validate_draw_number(1).unwrap(), 1);
        assert!(validate_draw_number(0).is_err());
        assert!(validate_draw_number(-4).is_err());
        assert!(validate_draw_number(i64::from(u32::MAX) + 1).is_err());
    }

    #[tokio::test]
    async fn record_derives_color() {
        let state = fresh_state().await;
        let draw = record_draw(&state, 5, 17, BetTotals::default()).await.unwrap();
        assert_eq!(draw.winning_color, WheelColor::Black);
        assert_eq!(draw.source, DrawSource::Manual);

        let zero = record_draw(&state, 6, 0, BetTotals::default()).await.unwrap();
        assert_eq!(zero.winning_color, WheelColor::Green);
    }

    #[tokio::test]
    async fn invalid_input_writes_nothing() {
        let state = fresh_state().await;
        for number in [37, -1] {
            let err = record_draw(&state, 5, number, BetTotals::default())
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::InvalidInput(_)));
        }
        let err = record_draw(&state, 0, 3, BetTotals::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        assert!(list_draws(&state, DrawQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_is_capped() {
        let state = fresh_state().await;
        let cap = state.config().history_limit();
        for n in 1..=(cap as i64 + 5) {
            record_draw(&state, n, n % 37, BetTotals::default())
                .await
                .unwrap();
        }

        let listed = list_draws(
            &state,
            DrawQuery {
                limit: Some(cap * 2),
                ..DrawQuery::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(listed.len(), cap);
        assert_eq!(listed[0].draw_number, cap as u32 + 5);
    }

    #[tokio::test]
    async fn missing_draw_is_not_found() {
        let state = fresh_state().await;
        assert!(matches!(
            find_draw(&state, 42).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
