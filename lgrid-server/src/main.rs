//! lgrid-server - Leesburg Grid campaign strategy service
//!
//! Hosts the framework store, live workspaces with autosave, research and
//! strategy generation, and read-only share links over HTTP + SSE.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lgrid_common::config::{default_config_path, load_toml_config, KeySource};
use lgrid_common::db::init_database;
use lgrid_common::EventBus;
use lgrid_server::config::{Overrides, Settings};
use lgrid_server::services::{AnthropicClient, AnthropicGenerator, Generator, UnconfiguredGenerator};
use lgrid_server::{build_router, AppState};

/// Command-line arguments for lgrid-server
#[derive(Parser, Debug)]
#[command(name = "lgrid-server")]
#[command(about = "Leesburg Grid campaign strategy service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "LGRID_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "LGRID_HOST")]
    host: Option<String>,

    /// SQLite database file
    #[arg(short, long, env = "LGRID_DATABASE")]
    database: Option<PathBuf>,

    /// TOML bootstrap file
    #[arg(short, long, env = "LGRID_CONFIG")]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "LGRID_LOG_LEVEL")]
    log_level: Option<String>,

    /// Base URL used when building share links
    #[arg(long, env = "LGRID_PUBLIC_BASE_URL")]
    public_base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path().context("Failed to locate config directory")?,
    };
    let toml_config = load_toml_config(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let config_found = toml_config.is_some();

    let settings = Settings::resolve(
        toml_config.unwrap_or_default(),
        Overrides {
            host: args.host,
            port: args.port,
            database: args.database,
            log_level: args.log_level,
            public_base_url: args.public_base_url,
        },
    );

    init_tracing(&settings)?;

    info!(
        "Starting Leesburg Grid (lgrid-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if config_found {
        info!("Loaded config from {}", config_path.display());
    } else {
        info!("No config file at {}, using defaults", config_path.display());
    }
    info!("Database: {}", settings.database_path.display());

    let db = init_database(&settings.database_path)
        .await
        .context("Failed to initialize database")?;

    let event_bus = EventBus::new(256);
    let generator = build_generator(&settings)?;

    let bind_address = settings.bind_address();
    let workspace_idle = settings.workspace_idle;
    let state = AppState::new(db, event_bus, generator, settings);
    let workspaces = state.workspaces.clone();
    let sweep_every = workspace_idle.clamp(Duration::from_secs(1), Duration::from_secs(60));
    let _sweeper = workspaces.spawn_idle_sweeper(sweep_every, workspace_idle);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("lgrid-server listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    workspaces.close_all().await;
    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(settings: &Settings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "lgrid_server={level},lgrid_common={level},tower_http=info",
            level = settings.log_level
        )
        .into()
    });

    let file_layer = match &settings.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

fn build_generator(settings: &Settings) -> Result<Arc<dyn Generator>> {
    let (Some(api_key), Some(source)) = (settings.anthropic_api_key.clone(), settings.api_key_source) else {
        warn!("No Anthropic API key configured; generation endpoints will fail until LGRID_ANTHROPIC_API_KEY is set");
        return Ok(Arc::new(UnconfiguredGenerator));
    };

    let client = AnthropicClient::new(api_key, settings.model.clone(), settings.max_tokens)
        .context("Failed to build Anthropic client")?;
    if source == KeySource::EnvironmentOverTomlConfig {
        warn!("Anthropic API key found in environment and TOML. Using environment (highest priority).");
    }
    info!("Anthropic API key loaded from {}", source);
    info!(model = %client.model(), "Generation enabled");
    Ok(Arc::new(AnthropicGenerator::new(client)))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
