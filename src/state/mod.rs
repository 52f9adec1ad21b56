pub mod draw;
mod sse;
pub mod wheel;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};

use crate::{config::AppConfig, dao::draw_store::DrawStore, error::ServiceError};

pub use self::sse::SseHub;
use self::sse::SseState;

pub type SharedState = Arc<AppState>;

/// Central application state holding the storage handle, SSE hubs and configuration.
pub struct AppState {
    draw_store: RwLock<Option<Arc<dyn DrawStore>>>,
    sse: SseState,
    degraded: watch::Sender<bool>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            draw_store: RwLock::new(None),
            sse: SseState::new(64, 16),
            degraded: degraded_tx,
            config,
        })
    }

    /// Build a state with `store` already installed.
    pub async fn with_store(config: AppConfig, store: Arc<dyn DrawStore>) -> SharedState {
        let state = Self::new(config);
        state.set_draw_store(store).await;
        state
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current draw store, if one is installed.
    pub async fn draw_store(&self) -> Option<Arc<dyn DrawStore>> {
        let guard = self.draw_store.read().await;
        guard.as_ref().cloned()
    }

    /// Return the installed store, or [`ServiceError::Degraded`] when storage is unusable.
    pub async fn require_draw_store(&self) -> Result<Arc<dyn DrawStore>, ServiceError> {
        if self.is_degraded().await {
            return Err(ServiceError::Degraded);
        }
        self.draw_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new draw store implementation and leave degraded mode.
    pub async fn set_draw_store(&self, store: Arc<dyn DrawStore>) {
        {
            let mut guard = self.draw_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, notifying watchers only when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.sse.public()
    }

    /// Broadcast hub used for the admin SSE stream.
    pub fn admin_sse(&self) -> &SseHub {
        self.sse.admin().hub()
    }

    /// Token guard that ensures a single admin SSE subscriber at a time.
    pub fn admin_token(&self) -> &Mutex<Option<String>> {
        self.sse.admin().token()
    }

    /// Whether `provided` matches the configured static token or the live SSE token.
    pub async fn accepts_admin_token(&self, provided: &str) -> bool {
        if self.config.admin_token() == Some(provided) {
            return true;
        }
        let guard = self.admin_token().lock().await;
        guard.as_deref() == Some(provided)
    }
}
