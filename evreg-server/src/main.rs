//! Event Registration Server
//!
//! HTTP front for the registration, attendance-token, and lifecycle engine.

use clap::Parser;
use evreg_core::admission::AdmissionController;
use evreg_core::clock::{Clock, SystemClock};
use evreg_core::history::HistoryReader;
use evreg_core::issuer::{CredentialSource, OsRngCredentials, TokenIssuer};
use evreg_core::lifecycle::LifecycleScheduler;
use evreg_core::notify::{NoopNotifier, Notifier, WebhookNotifier};
use evreg_core::redemption::RedemptionService;
use evreg_core::store::{EngineStore, PgEngineStore};
use evreg_server::config::{ConfigLoader, get_database_url};
use evreg_server::server::{build_router, run_server};
use evreg_server::state::{AdminAccess, AppState};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Event registration and attendance engine
#[derive(Parser, Debug)]
#[command(name = "evreg-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./evreg-config.toml")]
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

    tracing::info!("Starting evreg-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = ConfigLoader::new(&args.config, args.listen);
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    // Engine wiring: one store and clock shared by every service.
    let store: Arc<dyn EngineStore> = Arc::new(PgEngineStore::new(db_pool.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let credentials: Arc<dyn CredentialSource> = Arc::new(OsRngCredentials);
    let notifier: Arc<dyn Notifier> = match &loaded_config.notifier.webhook_url {
        Some(url) => {
            tracing::info!(endpoint = %url, "Admission notices will be posted to webhook");
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => {
            tracing::info!("No notification webhook configured, notices are dropped");
            Arc::new(NoopNotifier)
        }
    };

    let admission = Arc::new(AdmissionController::new(
        store.clone(),
        clock.clone(),
        TokenIssuer::new(store.clone(), clock.clone(), credentials.clone()),
        notifier,
    ));
    let redemption = Arc::new(RedemptionService::new(store.clone(), clock.clone()));
    let history = Arc::new(HistoryReader::new(store.clone()));
    let lifecycle = Arc::new(LifecycleScheduler::new(
        store.clone(),
        clock.clone(),
        TokenIssuer::new(store.clone(), clock.clone(), credentials),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler_handle = if loaded_config.scheduler.enabled {
        let interval = std::time::Duration::from_secs(loaded_config.scheduler.interval_secs);
        tracing::info!(interval_secs = interval.as_secs(), "Starting lifecycle scheduler");
        Some(tokio::spawn(
            lifecycle.clone().run(shutdown_rx, interval),
        ))
    } else {
        tracing::warn!("Lifecycle scheduler disabled by configuration");
        None
    };

    let state = AppState {
        admission,
        redemption,
        history,
        lifecycle,
        admin: Arc::new(AdminAccess::new(loaded_config.admin_secret_hash)),
    };

    let listen_addr = loaded_config.server.listen;
    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr, shutdown_tx).await;

    if let Some(handle) = scheduler_handle {
        if let Err(e) = handle.await {
            tracing::error!("Lifecycle scheduler task panicked: {}", e);
        }
    }

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
