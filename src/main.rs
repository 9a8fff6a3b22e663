//! Charades backend binary entrypoint wiring REST, SSE, the kiosk game loop,
//! and file-backed player storage.

use std::{env, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use charades_back::{
    config::AppConfig,
    dao::player_store::file::FileStore,
    engine::{AppState, SharedState, game_loop::GameLoop},
    routes,
    services::sse_events,
};

/// Default location of the player store document.
const DEFAULT_STORE_PATH: &str = "data/players.json";
/// Environment variable that overrides [`DEFAULT_STORE_PATH`].
const STORE_PATH_ENV: &str = "CHARADES_BACK_STORE_PATH";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    anyhow::ensure!(
        config.level_tasks(&config.game().level).is_some(),
        "configured level `{}` is not in the level table (available: {})",
        config.game().level,
        config.level_names().collect::<Vec<_>>().join(", ")
    );

    let store_path = env::var_os(STORE_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));

    let app_state = AppState::new(config);

    tokio::spawn(run_storage_supervisor(app_state.clone(), store_path));
    tokio::spawn(GameLoop::new(app_state.clone()).run());

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

/// Supervises the player store by retrying in the background and toggling
/// degraded mode when the backing file becomes unusable.
async fn run_storage_supervisor(state: SharedState, path: PathBuf) {
    let initial_delay_ms = 1000;
    let mut delay = Duration::from_millis(initial_delay_ms);
    let max_delay = Duration::from_secs(10);

    loop {
        if let Some(store) = state.player_store().await {
            match store.health_check().await {
                Ok(_) => {
                    // Healthy store: reset the retry backoff and avoid
                    // re-reading the file in a tight loop.
                    delay = Duration::from_millis(initial_delay_ms);
                    sleep(Duration::from_secs(5)).await;
                }
                Err(err) => {
                    // Existing store failed: drop it, flip to degraded mode,
                    // and retry with exponential backoff.
                    warn!(error = %err, "player store check failed; entering degraded mode");
                    state.clear_player_store().await;
                    sse_events::broadcast_system_status(&state, true);
                    sleep(delay).await;
                    delay = (delay * 2).min(max_delay);
                }
            }
            continue;
        }

        match FileStore::connect(path.clone()).await {
            Ok(store) => {
                info!(path = %path.display(), "player store ready; leaving degraded mode");
                state.install_player_store(Arc::new(store)).await;
                sse_events::broadcast_system_status(&state, false);
                delay = Duration::from_millis(initial_delay_ms);
            }
            Err(err) => {
                // Could not open the store at all: wait and retry.
                warn!(error = %err, "failed to open player store");
                sleep(delay).await;
                delay = (delay * 2).min(max_delay);
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

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
