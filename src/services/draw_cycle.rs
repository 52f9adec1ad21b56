//! One turn of the wheel: pick the winning number, record it, move the state forward.

use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    services::{draw_service, game_state_service, override_service},
    state::{
        SharedState,
        draw::{BetTotals, DrawResult, DrawSource, GameState},
        wheel::RouletteNumber,
    },
};

/// What a spin produced.
#[derive(Debug, Clone)]
pub struct SpinOutcome {
    pub draw: DrawResult,
    pub state: GameState,
    /// `true` when the draw had already been recorded and the spin only advanced the state.
    pub resumed: bool,
}

/// Run the draw for the upcoming draw number.
///
/// A pending override is used verbatim, including its stored color. Without one the number is
/// drawn at random. If the upcoming draw is already recorded (a previous spin crashed before
/// advancing), the state is advanced without writing a second result.
pub async fn spin(state: &SharedState) -> Result<SpinOutcome, ServiceError> {
    spin_with(state, random_number).await
}

async fn spin_with(
    state: &SharedState,
    pick: impl FnOnce() -> RouletteNumber,
) -> Result<SpinOutcome, ServiceError> {
    let current = game_state_service::get_state(state).await?;
    let draw_number = current.next_draw_number;

    if let Some(existing) = draw_service::lookup_draw(state, draw_number).await? {
        warn!(draw_number, "upcoming draw already recorded; advancing only");
        let next = advance_past(state, current.current_draw_number, draw_number).await?;
        return Ok(SpinOutcome {
            draw: existing,
            state: next,
            resumed: true,
        });
    }

    let (number, color, source) = match override_service::get_override(state, draw_number).await? {
        Some(forced) => (forced.winning_number, forced.winning_color, DrawSource::Override),
        None => {
            let number = pick();
            (number, number.color(), DrawSource::Random)
        }
    };

    let draw = draw_service::store_result(
        state,
        draw_number,
        number,
        color,
        BetTotals::default(),
        source,
    )
    .await?;
    let next = advance_past(state, current.current_draw_number, draw_number).await?;

    info!(
        draw_number,
        winning_number = %draw.winning_number,
        source = draw.source.as_str(),
        next_draw_number = next.next_draw_number,
        "draw cycle completed"
    );
    Ok(SpinOutcome {
        draw,
        state: next,
        resumed: false,
    })
}

/// Advance from `expected_current` once `draw_number` is recorded.
///
/// A concurrent spin may have advanced the state first. That is the outcome this spin wanted,
/// so the reloaded state is returned instead of the conflict.
async fn advance_past(
    state: &SharedState,
    expected_current: u32,
    draw_number: u32,
) -> Result<GameState, ServiceError> {
    match game_state_service::advance_draw_from(state, expected_current).await {
        Err(ServiceError::Conflict(reason)) => {
            let reloaded = game_state_service::get_state(state).await?;
            if reloaded.current_draw_number >= draw_number {
                debug!(draw_number, "state already advanced by a concurrent spin");
                Ok(reloaded)
            } else {
                Err(ServiceError::Conflict(reason))
            }
        }
        other => other,
    }
}

fn random_number() -> RouletteNumber {
    RouletteNumber::random(&mut rand::rng())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::draw_store::memory::MemoryDrawStore,
        state::{AppState, wheel::WheelColor},
    };

    async fn seeded_state() -> SharedState {
        let state =
            AppState::with_store(AppConfig::default(), Arc::new(MemoryDrawStore::new())).await;
        game_state_service::initialize_state(&state, Some(1), None)
            .await
            .unwrap();
        state
    }

    fn pocket(value: i64) -> RouletteNumber {
        RouletteNumber::try_from(value).unwrap()
    }

    #[tokio::test]
    async fn override_wins_over_random() {
        let state = seeded_state().await;
        override_service::set_override(&state, 1, 0).await.unwrap();

        let outcome = spin_with(&state, || pocket(19)).await.unwrap();
        assert_eq!(outcome.draw.draw_number, 1);
        assert_eq!(outcome.draw.winning_number.value(), 0);
        assert_eq!(outcome.draw.winning_color, WheelColor::Green);
        assert_eq!(outcome.draw.source, DrawSource::Override);
        assert_eq!(outcome.state.next_draw_number, 2);
        assert!(!outcome.resumed);
    }

    #[tokio::test]
    async fn random_when_no_override() {
        let state = seeded_state().await;
        let outcome = spin_with(&state, || pocket(19)).await.unwrap();
        assert_eq!(outcome.draw.winning_number.value(), 19);
        assert_eq!(outcome.draw.winning_color, WheelColor::Red);
        assert_eq!(outcome.draw.source, DrawSource::Random);
    }

    #[tokio::test]
    async fn resumes_after_recorded_but_not_advanced() {
        let state = seeded_state().await;
        draw_service::record_draw(&state, 1, 8, BetTotals::default())
            .await
            .unwrap();

        let outcome = spin_with(&state, || pocket(19)).await.unwrap();
        assert!(outcome.resumed);
        assert_eq!(outcome.draw.winning_number.value(), 8);
        assert_eq!(outcome.state.current_draw_number, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_spins_never_fail_after_committing() {
        for _ in 0..50 {
            let state = seeded_state().await;
            let left = tokio::spawn({
                let state = state.clone();
                async move { spin_with(&state, || pocket(4)).await }
            });
            let right = tokio::spawn({
                let state = state.clone();
                async move { spin_with(&state, || pocket(9)).await }
            });
            let results = [left.await.unwrap(), right.await.unwrap()];

            let stored = draw_service::find_draw(&state, 1).await.unwrap();
            for result in &results {
                match result {
                    Ok(outcome) => {
                        assert_eq!(outcome.draw, stored);
                        assert_eq!(outcome.state.current_draw_number, 1);
                    }
                    // Only a spin that wrote nothing may fail.
                    Err(err) => {
                        assert!(matches!(err, ServiceError::DuplicateDraw { draw_number: 1 }))
                    }
                }
            }
            assert!(results.iter().any(Result::is_ok));

            let after = game_state_service::get_state(&state).await.unwrap();
            assert_eq!(after.current_draw_number, 1);
            assert_eq!(after.next_draw_number, 2);
        }
    }

    #[test]
    fn random_pockets_are_in_range() {
        for _ in 0..500 {
            assert!(random_number().value() <= crate::state::wheel::MAX_NUMBER);
        }
    }
}
