//! Timely API server
//!
//! ```bash
//! DATABASE_URL=postgres://... AUTH_JWT_SECRET=... cargo run --bin timely-server
//! ```

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use timely_core::BookingEnvironment;
use timely_postgres::PgStores;
use timely_web::{AppState, Config, cors_layer, router};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},timely_web=debug,sqlx=warn", config.server.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Timely server");

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    timely_core::metrics::register_metrics();

    info!(
        database = %config.postgres.url.split('@').next_back().unwrap_or("unknown"),
        max_connections = config.postgres.max_connections,
        "Connecting to PostgreSQL"
    );
    let pool = timely_postgres::connect(&config.pool_settings()).await?;

    if config.postgres.run_migrations {
        timely_postgres::migrate(&pool).await?;
    }

    let verifier = config.auth.verifier();
    if verifier.is_degraded() {
        warn!(
            "AUTH_JWT_SECRET is not set: bearer tokens are decoded WITHOUT signature or expiry checks"
        );
    }

    let stores = PgStores::new(pool.clone());
    let env = BookingEnvironment::new(stores.slots, stores.appointments, stores.businesses);
    let state = AppState::new(env, verifier).with_metrics(prometheus);

    let app = router(state).layer(cors_layer(&config.server.cors_allowed_origins));

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, closing database pool");
    let timeout = config.shutdown_timeout();
    if tokio::time::timeout(timeout, pool.close()).await.is_err() {
        warn!(timeout_secs = timeout.as_secs(), "Database pool close timed out");
    }

    info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal"),
        () = terminate => info!("Received SIGTERM signal"),
    }
}
