//! Reads, seeds and advances the singleton game state.

use std::time::SystemTime;

use tracing::{debug, info};

use crate::{
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        draw::{
            GameState, MAX_DRAW_INTERVAL_SECONDS, MAX_START_DRAW_NUMBER,
            MIN_DRAW_INTERVAL_SECONDS,
        },
    },
};

/// Return the current game state, failing with [`ServiceError::NotInitialized`] before seeding.
pub async fn get_state(state: &SharedState) -> Result<GameState, ServiceError> {
    let store = state.require_draw_store().await?;
    store
        .load_game_state()
        .await?
        .map(GameState::from)
        .ok_or(ServiceError::NotInitialized)
}

/// Seed the game state if none exists yet.
///
/// Returns the state now stored and whether this call created it. An existing state is never
/// overwritten, so calling this on every boot is safe.
pub async fn initialize_state(
    state: &SharedState,
    start_draw_number: Option<u32>,
    draw_interval_seconds: Option<u32>,
) -> Result<(GameState, bool), ServiceError> {
    let start = start_draw_number.unwrap_or_else(|| state.config().initial_draw_number());
    if !(1..=MAX_START_DRAW_NUMBER).contains(&start) {
        return Err(ServiceError::InvalidInput(format!(
            "start draw number must be between 1 and {MAX_START_DRAW_NUMBER} (got {start})"
        )));
    }
    let interval = match draw_interval_seconds {
        Some(seconds) => validate_interval(seconds)?,
        None => state.config().draw_interval_seconds(),
    };

    let store = state.require_draw_store().await?;
    let seeded = GameState::seed(start, interval, SystemTime::now());
    let created = store.insert_game_state(seeded.into()).await?;

    let current = store
        .load_game_state()
        .await?
        .map(GameState::from)
        .ok_or(ServiceError::NotInitialized)?;

    if created {
        info!(
            next_draw_number = current.next_draw_number,
            draw_interval_seconds = current.draw_interval_seconds,
            "seeded game state"
        );
    } else {
        debug!(
            current_draw_number = current.current_draw_number,
            "game state already present; seeding skipped"
        );
    }

    Ok((current, created))
}

/// Advance from whatever draw number is current right now.
pub async fn advance_draw(state: &SharedState) -> Result<GameState, ServiceError> {
    let current = get_state(state).await?;
    advance_draw_from(state, current.current_draw_number).await
}

/// Advance the state only if its current draw number is still `expected_current`.
///
/// Of several callers racing from the same observed state exactly one succeeds; the others get
/// [`ServiceError::Conflict`] and must not retry. Once the counter is exhausted every call fails
/// with [`ServiceError::InvalidState`].
pub async fn advance_draw_from(
    state: &SharedState,
    expected_current: u32,
) -> Result<GameState, ServiceError> {
    let store = state.require_draw_store().await?;
    match store
        .advance_game_state(expected_current, SystemTime::now())
        .await?
    {
        Some(next) => {
            let next = GameState::from(next);
            info!(
                current_draw_number = next.current_draw_number,
                next_draw_number = next.next_draw_number,
                "advanced game state"
            );
            sse_events::broadcast_state_advanced(state, &next);
            Ok(next)
        }
        None => match store.load_game_state().await? {
            None => Err(ServiceError::NotInitialized),
            Some(actual) => Err(ServiceError::Conflict(format!(
                "expected current draw {expected_current}, found {}",
                actual.current_draw_number
            ))),
        },
    }
}

/// Change the pause between draws. The draw numbers are left untouched.
pub async fn update_draw_interval(
    state: &SharedState,
    seconds: u32,
) -> Result<GameState, ServiceError> {
    let seconds = validate_interval(seconds)?;
    let store = state.require_draw_store().await?;
    let updated = store
        .update_draw_interval(seconds, SystemTime::now())
        .await?
        .map(GameState::from)
        .ok_or(ServiceError::NotInitialized)?;

    info!(draw_interval_seconds = seconds, "updated draw interval");
    Ok(updated)
}

fn validate_interval(seconds: u32) -> Result<u32, ServiceError> {
    if (MIN_DRAW_INTERVAL_SECONDS..=MAX_DRAW_INTERVAL_SECONDS).contains(&seconds) {
        Ok(seconds)
    } else {
        Err(ServiceError::InvalidInput(format!(
            "draw interval must be between {MIN_DRAW_INTERVAL_SECONDS} and {MAX_DRAW_INTERVAL_SECONDS} seconds (got {seconds})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::draw_store::memory::MemoryDrawStore, state::AppState,
    };

    async fn fresh_state() -> SharedState {
        AppState::with_store(AppConfig::default(), Arc::new(MemoryDrawStore::new())).await
    }

    #[tokio::test]
    async fn get_state_before_seed_is_not_initialized() {
        let state = fresh_state().await;
        assert!(matches!(
            get_state(&state).await,
            Err(ServiceError::NotInitialized)
        ));
        assert!(matches!(
            advance_draw(&state).await,
            Err(ServiceError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn initialize_is_insert_only() {
        let state = fresh_state().await;
        let (first, created) = initialize_state(&state, Some(100), Some(60)).await.unwrap();
        assert!(created);
        assert_eq!(first.next_draw_number, 100);
        assert_eq!(first.draw_interval_seconds, 60);

        let (second, created) = initialize_state(&state, Some(5), None).await.unwrap();
        assert!(!created);
        assert_eq!(second.next_draw_number, 100);
    }

    #[tokio::test]
    async fn stale_expectation_conflicts() {
        let state = fresh_state().await;
        initialize_state(&state, Some(1), None).await.unwrap();

        let advanced = advance_draw_from(&state, 0).await.unwrap();
        assert_eq!(advanced.current_draw_number, 1);
        assert_eq!(advanced.next_draw_number, 2);

        let err = advance_draw_from(&state, 0).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(get_state(&state).await.unwrap().current_draw_number, 1);
    }

    #[tokio::test]
    async fn counter_stops_at_the_largest_draw_number() {
        let state = fresh_state().await;
        assert!(matches!(
            initialize_state(&state, Some(u32::MAX), None).await,
            Err(ServiceError::InvalidInput(_))
        ));

        let (seeded, _) = initialize_state(&state, Some(MAX_START_DRAW_NUMBER), None)
            .await
            .unwrap();
        assert_eq!(seeded.next_draw_number, u32::MAX - 1);

        let advanced = advance_draw(&state).await.unwrap();
        assert_eq!(advanced.current_draw_number, u32::MAX - 1);
        assert_eq!(advanced.next_draw_number, u32::MAX);

        assert!(matches!(
            advance_draw(&state).await,
            Err(ServiceError::InvalidState(_))
        ));
        let unchanged = get_state(&state).await.unwrap();
        assert_eq!(unchanged.current_draw_number, u32::MAX - 1);
        assert_eq!(unchanged.next_draw_number, u32::MAX);
    }

    #[tokio::test]
    async fn interval_bounds() {
        let state = fresh_state().await;
        initialize_state(&state, None, None).await.unwrap();

        assert!(matches!(
            update_draw_interval(&state, 29).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            update_draw_interval(&state, 301).await,
            Err(ServiceError::InvalidInput(_))
        ));
        let updated = update_draw_interval(&state, 300).await.unwrap();
        assert_eq!(updated.draw_interval_seconds, 300);
        assert_eq!(updated.current_draw_number, 0);
    }
}
