use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use watchpost_agent::config::AgentConfig;
use watchpost_agent::integrations::{build_integrations, default_registry};
use watchpost_agent::scheduler::spawn_scheduler;
use watchpost_agent::state::AgentState;

#[derive(Debug, Parser)]
#[command(name = "watchpost", version, about = "Metrics agent with pluggable integrations")]
struct Cli {
    /// Path to the agent config file.
    #[arg(short, long, env = "WATCHPOST_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }

    tracing::info!("Watchpost agent starting");

    let config = match AgentConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        },
    };
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    }

    let registry = default_registry(&config.server.instance);
    tracing::info!(available = ?registry.names(), "Integration registry ready");

    let integrations = match build_integrations(&config, &registry) {
        Ok(integrations) => integrations,
        Err(e) => {
            tracing::error!(error = %e, "Failed to construct integrations");
            std::process::exit(1);
        },
    };

    let listen_addr = config.server.listen_addr.clone();
    let state = AgentState::new(config, integrations);
    let cancel = CancellationToken::new();
    let schedulers = spawn_scheduler(&state, cancel.clone());
    let app = watchpost_agent::build_app(state);

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %listen_addr, error = %e, "Failed to bind listener");
            std::process::exit(1);
        },
    };
    tracing::info!(addr = %listen_addr, "Serving metrics");

    let shutdown = cancel.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown requested");
            shutdown.cancel();
        })
        .await;
    if let Err(e) = served {
        tracing::error!(error = %e, "Server error");
    }

    cancel.cancel();
    for handle in schedulers {
        let _ = handle.await;
    }
    tracing::info!("Watchpost agent stopped");
}
