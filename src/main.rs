//! Forecast quiz backend entrypoint wiring REST, SSE and the storage supervisor.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use forecast_quiz_back::{
    config::AppConfig,
    dao::{
        game_store::{QuizStore, memory::MemoryQuizStore},
        storage::StorageError,
    },
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "couch-store")]
use forecast_quiz_back::dao::game_store::couchdb::{CouchConfig, CouchQuizStore};
#[cfg(feature = "mongo-store")]
use forecast_quiz_back::dao::game_store::mongodb::{MongoConfig, MongoQuizStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    info!(questions = config.questions().len(), "question bank loaded");

    let app_state = AppState::new(config);
    let backend = StoreBackend::from_env()?;
    info!(backend = backend.name(), "selected storage backend");

    tokio::spawn(storage_supervisor::watch_degraded(app_state.clone()));
    tokio::spawn(storage_supervisor::run(app_state.clone(), move || {
        let backend = backend.clone();
        async move { backend.connect().await }
    }));

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

/// Storage backend selected with `QUIZ_STORE`.
#[derive(Clone)]
enum StoreBackend {
    /// Kept across reconnects so the supervisor never swaps in an empty store.
    Memory(MemoryQuizStore),
    #[cfg(feature = "mongo-store")]
    Mongo,
    #[cfg(feature = "couch-store")]
    Couch,
}

impl StoreBackend {
    fn from_env() -> anyhow::Result<Self> {
        let requested = env::var("QUIZ_STORE").ok();
        match requested.as_deref().map(str::trim) {
            Some("memory") => Ok(Self::Memory(MemoryQuizStore::new())),
            #[cfg(feature = "mongo-store")]
            Some("mongo") | None => Ok(Self::Mongo),
            #[cfg(feature = "couch-store")]
            Some("couch") => Ok(Self::Couch),
            #[cfg(not(feature = "mongo-store"))]
            None => Ok(Self::Memory(MemoryQuizStore::new())),
            Some(other) => anyhow::bail!("unsupported QUIZ_STORE value `{other}`"),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            #[cfg(feature = "mongo-store")]
            Self::Mongo => "mongo",
            #[cfg(feature = "couch-store")]
            Self::Couch => "couch",
        }
    }

    async fn connect(&self) -> Result<Arc<dyn QuizStore>, StorageError> {
        match self {
            Self::Memory(store) => Ok(Arc::new(store.clone())),
            #[cfg(feature = "mongo-store")]
            Self::Mongo => {
                let config = MongoConfig::from_env().await?;
                Ok(Arc::new(MongoQuizStore::connect(config).await?))
            }
            #[cfg(feature = "couch-store")]
            Self::Couch => {
                let config = CouchConfig::from_env()?;
                Ok(Arc::new(CouchQuizStore::connect(config).await?))
            }
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
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
