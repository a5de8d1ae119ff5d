//! Agent Brain API server: combined HTTP server + background worker,
//! the single binary that owns one state directory for its lifetime.

use std::net::SocketAddr;
use std::path::PathBuf;

use agent_brain_common::tracing_init::LogFormat;
use agent_brain_config::ApplicationConfig;
use tracing::{error, info, warn};

type MainResult = Result<(), Box<dyn std::error::Error>>;

fn resolve_state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AGENT_BRAIN_STATE_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agent-brain")
}

#[tokio::main]
async fn main() -> MainResult {
    agent_brain_common::initialize_environment();

    let state_dir = resolve_state_dir();
    let config = ApplicationConfig::load(Some(&state_dir))?;

    let log_format = if config.telemetry.environment == "production" {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    agent_brain_common::init_tracing(log_format);

    for (severity, message) in config.validate_all() {
        match severity {
            agent_brain_config::Severity::Critical => error!("configuration problem: {message}"),
            agent_brain_config::Severity::Warning => warn!("configuration warning: {message}"),
        }
    }

    info!(state_dir = %state_dir.display(), "starting Agent Brain API server");

    let lock_guard = agent_brain_api::bootstrap::acquire_runtime_lock(&state_dir, &config)?;

    let bind_host = config.server.bind_host.clone();
    let bind_port = config.server.bind_port;

    let (state, worker) = agent_brain_api::bootstrap::initialize_app_state(config, state_dir.clone()).await?;
    let worker_handle = agent_brain_api::state::spawn_worker(worker);

    let app = agent_brain_api::routes::create_router().with_state(state);

    let addr: SocketAddr = format!("{bind_host}:{bind_port}").parse()?;
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    worker_handle.abort();
    agent_brain_runtime::stop(&state_dir, lock_guard)?;
    info!("shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut signal) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            signal.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
