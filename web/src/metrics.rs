//! Prometheus exporter setup.
//!
//! The counters themselves are emitted from `ewm-core`; this module
//! describes them and installs the exporter that serves `/metrics`.

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use thiserror::Error;

/// Metrics setup failure.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// The exporter could not be built or installed.
    #[error("Failed to install Prometheus exporter: {0}")]
    Install(String),
}

/// Install the global recorder and start the scrape listener on `addr`.
///
/// Must be called from inside a Tokio runtime, once per process.
///
/// # Errors
///
/// Returns [`MetricsError::Install`] if a recorder is already installed
/// or the listener cannot be started.
pub fn install(addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    tracing::info!(addr = %addr, "Metrics server started - available at http://{}/metrics", addr);
    Ok(())
}

fn register_metrics() {
    describe_counter!(
        "ewm.requests.submitted",
        "Participation requests accepted for processing"
    );
    describe_counter!(
        "ewm.requests.confirmed",
        "Participation requests that took a slot"
    );
    describe_counter!(
        "ewm.requests.rejected",
        "Participation requests rejected by the initiator or by capacity"
    );
    describe_counter!(
        "ewm.requests.cancelled",
        "Participation requests withdrawn by their requester"
    );
    describe_counter!("ewm.events.published", "Events published by an admin");
    describe_counter!(
        "ewm.stats.failures",
        "Stats collector calls that failed or timed out"
    );
    describe_counter!(
        "ewm.stats.hits_dropped",
        "View hits dropped because the hit queue was full"
    );
}
