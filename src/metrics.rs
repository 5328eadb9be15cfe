//! Metrics initialization for Prometheus exporter.
//!
//! Counters recorded by the crate:
//!
//! - `pac_requests_total`: PAC requests received by the HTTP server
//! - `pac_cache_hits_total`: requests served without a rebuild
//! - `pac_cache_rebuilds_total`: successful rebuilds after a source change
//! - `pac_build_failures_total`: failed fingerprint or build attempts

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;
use crate::error::{Error, Result};

/// Initialize the metrics system based on configuration.
///
/// When metrics are enabled, this starts an HTTP listener exposing
/// `/metrics` for Prometheus to scrape. Otherwise it does nothing and every
/// counter update is a no-op.
pub fn init(config: &MetricsConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen)
        .install()
        .map_err(|err| Error::Metrics(err.to_string()))?;

    Ok(())
}
