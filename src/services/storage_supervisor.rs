use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{draw_store::DrawStore, storage::StorageError},
    services::{game_state_service, sse_events},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the storage backend and keep the shared state in degraded mode while it is
/// unavailable. Seeds the game state on every successful connection when configured to.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn DrawStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                install(&state, store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                watch_health(&state, store.as_ref()).await;
                warn!("exhausted storage reconnect attempts; staying in degraded mode");

                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

async fn install(state: &SharedState, store: Arc<dyn DrawStore>) {
    state.set_draw_store(store).await;
    sse_events::broadcast_system_status(state, false);

    if state.config().seed_on_startup() {
        if let Err(err) = game_state_service::initialize_state(state, None, None).await {
            warn!(error = %err, "failed to seed game state");
        }
    }
}

/// Poll the backend until it stays unreachable after [`MAX_RECONNECT_ATTEMPTS`] reconnects.
async fn watch_health(state: &SharedState, store: &dyn DrawStore) {
    loop {
        if store.health_check().await.is_ok() {
            if state.is_degraded().await {
                info!("storage healthy again; leaving degraded mode");
                set_degraded(state, false).await;
            }
            sleep(HEALTH_POLL_INTERVAL).await;
            continue;
        }

        let mut reconnect_delay = INITIAL_DELAY;
        let mut reconnected = false;
        for attempt in 0..MAX_RECONNECT_ATTEMPTS {
            match store.try_reconnect().await {
                Ok(()) => {
                    info!("storage reconnection succeeded after health check failure");
                    reconnected = true;
                    break;
                }
                Err(reconnect_err) => {
                    if attempt == 0 {
                        warn!(
                            attempt, error = %reconnect_err,
                            "storage reconnect first attempt failed; entering degraded mode"
                        );
                        set_degraded(state, true).await;
                    } else {
                        warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                    }
                    sleep(reconnect_delay).await;
                    reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
                }
            }
        }

        if !reconnected {
            return;
        }
        set_degraded(state, false).await;
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

async fn set_degraded(state: &SharedState, value: bool) {
    if state.is_degraded().await != value {
        state.update_degraded(value).await;
        sse_events::broadcast_system_status(state, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig, dao::draw_store::memory::MemoryDrawStore, state::AppState,
    };

    #[tokio::test]
    async fn install_seeds_and_leaves_degraded_mode() {
        let state = AppState::new(AppConfig::default());
        let mut status = state.public_sse().subscribe();

        install(&state, Arc::new(MemoryDrawStore::new())).await;

        assert!(!state.is_degraded().await);
        let seeded = game_state_service::get_state(&state).await.unwrap();
        assert_eq!(seeded.next_draw_number, 1);
        let event = status.try_recv().unwrap();
        assert_eq!(event.event.as_deref(), Some("system_status"));
    }
}
