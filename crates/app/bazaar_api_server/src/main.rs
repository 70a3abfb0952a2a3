//! Bazaar marketplace API server binary.
//!
//! Serves the REST API over PostgreSQL when `DATABASE_URL` is set, otherwise
//! over a process-local in-memory store.

use std::sync::Arc;
use std::time::Duration;

use bazaar_api::config::ApiConfig;
use bazaar_core::store::{DocumentStore, MemoryStore, PgStore, TimedStore};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI arguments. Flags override the matching environment variables.
#[derive(Parser, Debug)]
#[command(name = "bazaar_api_server", about = "Bazaar marketplace API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<String>,

    /// Port to listen on; replaces the port of the bind address.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// PostgreSQL connection URL. Without it documents live in memory.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Seconds between sweeps of expired revoked tokens.
    #[arg(long, default_value_t = 600)]
    purge_interval_secs: u64,
}

fn bind_addr(args: &Args, config: &ApiConfig) -> String {
    let base = args.bind.clone().unwrap_or_else(|| config.bind_addr.clone());
    match args.port {
        Some(port) => {
            let host = base.rsplit_once(':').map_or(base.as_str(), |(host, _)| host);
            format!("{host}:{port}")
        }
        None => base,
    }
}

async fn open_store(
    args: &Args,
    config: &ApiConfig,
) -> Result<Arc<dyn DocumentStore>, Box<dyn std::error::Error>> {
    let inner: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            info!(max_connections = args.max_connections, "connecting to PostgreSQL");
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(config.store_timeout)
                .connect(url)
                .await?;
            info!("running database migrations");
            bazaar_api::migrate(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(Arc::new(TimedStore::new(inner, config.store_timeout)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,bazaar_api=debug,bazaar_core=debug")
            }),
        )
        .init();

    let args = Args::parse();
    let mut config = ApiConfig::from_env();
    config.bind_addr = bind_addr(&args, &config);
    if let Some(url) = args.database_url.clone().filter(|u| !u.trim().is_empty()) {
        config.database_url = Some(url);
    }
    info!(?config, "starting bazaar_api_server");

    let store = open_store(&args, &config).await?;
    let state = bazaar_api::AppState::new(store, config.clone());

    if let Some(seed) = &config.admin_seed {
        state
            .auth
            .ensure_admin(&seed.name, &seed.email, &seed.password)
            .await?;
    }

    let shutdown = CancellationToken::new();
    let purge = tokio::spawn({
        let revocations = Arc::clone(&state.revocations);
        let shutdown = shutdown.clone();
        let period = Duration::from_secs(args.purge_interval_secs.max(1));
        async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        revocations.purge_expired();
                    }
                }
            }
        }
    });

    let app = bazaar_api::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down"),
                    _ = shutdown.cancelled() => {}
                }
            }
        })
        .await;

    shutdown.cancel();
    let _ = purge.await;
    result?;
    Ok(())
}
