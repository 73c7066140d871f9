use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use student_api::app::{app, AppState};
use student_api::config;
use student_api::database::{DatabaseManager, MemoryStudentStore, PgStudentStore, StudentStore};

/// Student records API server.
#[derive(Debug, Parser)]
#[command(name = "student-api")]
#[command(about = "Student records REST API", version)]
struct Args {
    /// Port to listen on. Overrides API_PORT / PORT.
    #[arg(short, long)]
    port: Option<u16>,

    /// PostgreSQL connection URL. Overrides DATABASE_URL.
    #[arg(long)]
    database_url: Option<String>,

    /// Keep records in process memory instead of PostgreSQL.
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = config::config().clone();
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(url) = args.database_url {
        config.database.url = Some(url);
    }
    let config = Arc::new(config);
    info!("Starting Student API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        warn!("JWT_SECRET is not set; every protected request will be rejected");
    }

    let (store, manager): (Arc<dyn StudentStore>, Option<DatabaseManager>) = if args.memory {
        info!("Using in-memory student store");
        (Arc::new(MemoryStudentStore::new()), None)
    } else {
        let manager = DatabaseManager::connect(&config.database)
            .await
            .context("failed to connect to PostgreSQL")?;
        manager.migrate().await?;
        (Arc::new(PgStudentStore::new(manager.pool())), Some(manager))
    };

    let router = app(AppState::new(store, config.clone()));

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Student API listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(manager) = manager {
        manager.close().await;
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
