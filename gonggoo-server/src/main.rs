//! Gonggoo payments server
//!
//! Confirms, cancels and refunds payments through the payment gateway, keeps
//! orders and stock consistent with them, and releases orders whose payment
//! never completed.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::runtime::ConfigStore;
use config::{ConfigLoader, get_database_url};
use gonggoo_core::processors::StaleOrderSweeper;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Gonggoo - payments backend for the group-buying app
#[derive(Parser, Debug)]
#[command(name = "gonggoo-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./gonggoo-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting gonggoo-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader
        .load()
        .inspect_err(|e| tracing::error!(path = ?args.config, error = %e, "Invalid configuration"))?;

    let listen_addr = loaded_config.server.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let (shared_config, sweeper_config) = loaded_config.into_shared();
    let sweeper_config = ConfigStore::new(sweeper_config);

    let db_pool = connect_database(args.migrate).await?;

    // Per-request timeouts come from the gateway config, so the client
    // itself carries none.
    let http_client = reqwest::Client::builder()
        .user_agent(concat!("gonggoo-server/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let state = AppState::new(
        db_pool.clone(),
        http_client,
        shared_config,
        sweeper_config.clone(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = StaleOrderSweeper::new(db_pool.clone(), sweeper_config, shutdown_rx);
    let sweeper_handle = tokio::spawn(sweeper.run());

    let reload_notify = spawn_config_reload_handler(state.clone(), config_loader);

    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    reload_notify.notify_one();
    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper_handle.await {
        tracing::error!("Stale order sweeper task failed: {}", e);
    }

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Connect to `DATABASE_URL`, optionally applying pending migrations.
async fn connect_database(migrate: bool) -> anyhow::Result<PgPool> {
    let database_url = get_database_url().inspect_err(|e| tracing::error!("{}", e))?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Database connection failed"))?;

    if migrate {
        tracing::info!("Applying database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Migration failed"))?;
        tracing::info!("Database schema is up to date");
    }
    Ok(db_pool)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
