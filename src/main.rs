//! Roulette Back binary entrypoint wiring REST, SSE and the storage supervisor.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roulette_back::{
    config::AppConfig,
    dao::{
        draw_store::{DrawStore, memory::MemoryDrawStore},
        storage::StorageError,
    },
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

/// Storage backends selectable through `STORAGE_BACKEND`.
#[derive(Debug, Clone, Copy)]
enum Backend {
    #[cfg(feature = "mongo-store")]
    Mongo,
    #[cfg(feature = "couch-store")]
    Couch,
    Memory,
}

impl Backend {
    fn from_env() -> anyhow::Result<Self> {
        let raw = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "mongo".into());
        match raw.to_ascii_lowercase().as_str() {
            #[cfg(feature = "mongo-store")]
            "mongo" | "mongodb" => Ok(Self::Mongo),
            #[cfg(feature = "couch-store")]
            "couch" | "couchdb" => Ok(Self::Couch),
            "memory" => Ok(Self::Memory),
            other => bail!("unsupported STORAGE_BACKEND `{other}`"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let backend = Backend::from_env()?;
    let app_state = AppState::new(config);

    info!(?backend, "starting storage supervisor");
    spawn_storage_supervisor(app_state.clone(), backend);

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

fn spawn_storage_supervisor(state: SharedState, backend: Backend) {
    match backend {
        #[cfg(feature = "mongo-store")]
        Backend::Mongo => {
            use roulette_back::dao::draw_store::mongodb::{MongoConfig, MongoDrawStore};

            tokio::spawn(storage_supervisor::run(state, || async {
                let config = MongoConfig::from_env().await?;
                let store = MongoDrawStore::connect(config).await?;
                Ok::<Arc<dyn DrawStore>, StorageError>(Arc::new(store))
            }));
        }
        #[cfg(feature = "couch-store")]
        Backend::Couch => {
            use roulette_back::dao::draw_store::couchdb::{CouchConfig, CouchDrawStore};

            tokio::spawn(storage_supervisor::run(state, || async {
                let config = CouchConfig::from_env()?;
                let store = CouchDrawStore::connect(config).await?;
                Ok::<Arc<dyn DrawStore>, StorageError>(Arc::new(store))
            }));
        }
        Backend::Memory => {
            // A single store instance, so reconnects keep the recorded history.
            let store = MemoryDrawStore::new();
            tokio::spawn(storage_supervisor::run(state, move || {
                let store = store.clone();
                async move { Ok::<Arc<dyn DrawStore>, StorageError>(Arc::new(store)) }
            }));
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
