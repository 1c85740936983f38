//! Playlist Quiz Back binary entrypoint wiring REST, SSE, storage and background tasks.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playlist_quiz_back::{
    config::AppConfig,
    dao::quiz_store::{QuizStore, memory::MemoryQuizStore},
    routes,
    services::{
        identity::HeaderIdentityProvider,
        progression,
        video_provider::{StaticVideoProvider, VideoInfoProvider},
    },
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let video_provider = build_video_provider(&config)?;
    let app_state = AppState::new(config, video_provider, Arc::new(HeaderIdentityProvider));

    install_store(&app_state).await?;
    tokio::spawn(progression::run(app_state.clone()));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the storage backend from `QUIZ_STORE` (`mongo` by default when compiled in).
async fn install_store(state: &SharedState) -> anyhow::Result<()> {
    let default_backend = if cfg!(feature = "mongo-store") {
        "mongo"
    } else {
        "memory"
    };
    let backend = env::var("QUIZ_STORE").unwrap_or_else(|_| default_backend.into());

    match backend.as_str() {
        "memory" => {
            warn!("using the in-memory store; data is lost on restart");
            let store: Arc<dyn QuizStore> = Arc::new(MemoryQuizStore::new());
            state.set_quiz_store(store).await;
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => spawn_mongo_supervisor(state.clone()),
        other => anyhow::bail!("unsupported QUIZ_STORE backend `{other}`"),
    }
    Ok(())
}

/// Connect to MongoDB in the background; the API stays in degraded mode until it succeeds.
#[cfg(feature = "mongo-store")]
fn spawn_mongo_supervisor(state: SharedState) {
    use playlist_quiz_back::{
        dao::{
            quiz_store::mongodb::{MongoConfig, MongoQuizStore},
            storage::StorageError,
        },
        services::storage_supervisor,
    };

    tokio::spawn(storage_supervisor::run(state, || async {
        let config = MongoConfig::from_env().await?;
        let store = MongoQuizStore::connect(config).await?;
        Ok::<_, StorageError>(Arc::new(store) as Arc<dyn QuizStore>)
    }));
}

/// YouTube lookups when `YOUTUBE_API_KEY` is set, otherwise playlists must carry titles.
#[cfg_attr(not(feature = "youtube"), allow(unused_variables))]
fn build_video_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn VideoInfoProvider>> {
    match env::var("YOUTUBE_API_KEY").ok().filter(|key| !key.is_empty()) {
        #[cfg(feature = "youtube")]
        Some(api_key) => {
            use playlist_quiz_back::services::video_provider::YoutubeVideoProvider;

            let provider = YoutubeVideoProvider::new(config.youtube_api_base.clone(), api_key)
                .context("building YouTube client")?;
            info!(base_url = %config.youtube_api_base, "YouTube metadata lookups enabled");
            Ok(Arc::new(provider))
        }
        _ => {
            warn!("no video metadata provider; untitled playlist entries will be skipped");
            Ok(Arc::new(StaticVideoProvider::empty()))
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
                warn!(error = %err, "cannot listen for SIGTERM; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
