//! EWM event service server.
//!
//! This binary:
//! - Loads configuration from the environment (and `.env`)
//! - Installs the Prometheus exporter
//! - Connects the view aggregator to the stats collector
//! - Serves the HTTP API until Ctrl+C or SIGTERM
//!
//! # Usage
//!
//! ```bash
//! STATS_SERVER_URL=http://localhost:9090 cargo run --bin ewm-server
//! ```

use ewm_core::environment::{Clock, DomainEnvironment, SystemClock};
use ewm_core::ledger::Registry;
use ewm_core::service::EventService;
use ewm_core::stats::HttpStatsClient;
use ewm_core::views::ViewAggregator;
use ewm_web::{build_router, AppState, Config};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.server.log_level)
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        stats = %config.stats.url,
        initiator_lead_hours = config.lead_times.initiator_hours,
        admin_lead_hours = config.lead_times.admin_hours,
        "Configuration loaded"
    );

    ewm_web::metrics::install(config.metrics_addr()?)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let stats = HttpStatsClient::new(config.stats.url.clone(), config.stats_timeout())?;
    let views = ViewAggregator::new(Arc::new(stats), Arc::clone(&clock), config.view_config());
    let env = DomainEnvironment::new(clock, config.lead_times());
    let service = EventService::new(Arc::new(Registry::new()), env, views);

    let app = build_router(AppState::new(Arc::new(service)));

    let addr = config.http_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Server listening");

    let shutdown_timeout = config.shutdown_timeout();
    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    // Bound the drain once a signal has been received.
    tokio::select! {
        result = server => result?,
        () = async {
            shutdown_signal().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => warn!(timeout = ?shutdown_timeout, "Graceful shutdown timed out"),
    }

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
