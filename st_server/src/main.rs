//! Tournament scheduling server.
//!
//! Serves fixture generation, knockout brackets, result entry and standings over HTTP,
//! backed by PostgreSQL or by process memory.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use log::info;
use pico_args::Arguments;
use sports_tournament::{
    InMemoryRepository, PhaseOrchestrator, TournamentRepository, db::Database,
};
use st_server::{
    api,
    config::{ServerConfig, StorageBackend},
    logging,
};

const HELP: &str = "\
Run the tournament scheduling server

USAGE:
  st_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6970]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --storage    BACKEND     postgres or memory          [default: env STORAGE_BACKEND or postgres]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  STORAGE_BACKEND          postgres or memory
  ROUND_INTERVAL_DAYS      Days between knockout rounds (default: 7)
  WIN_POINTS, DRAW_POINTS, LOSS_POINTS
  YELLOW_CARD_WEIGHT, BLUE_CARD_WEIGHT, RED_CARD_WEIGHT
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    storage: Option<StorageBackend>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        storage: pargs.opt_value_from_str("--storage")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.storage)?;
    config.validate()?;
    info!(
        "Starting tournament server at {} ({:?} storage)",
        config.bind, config.storage
    );

    let repository: Arc<dyn TournamentRepository> = match config.storage {
        StorageBackend::Postgres => {
            let db = Database::new(&config.database)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            db.migrate()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to apply migrations: {}", e))?;
            info!("Database connected successfully");
            Arc::new(db.repository())
        }
        StorageBackend::Memory => {
            log::warn!("Using in-memory storage, data is lost on shutdown");
            Arc::new(InMemoryRepository::new())
        }
    };

    let orchestrator = Arc::new(PhaseOrchestrator::new(
        repository,
        config.standings,
        config.days_between_rounds,
    ));
    let app = api::create_router(api::AppState { orchestrator });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
