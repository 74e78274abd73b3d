//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pgsocket_connections_total` (counter): accepted connections
//! - `pgsocket_active_connections` (gauge): currently open connections
//! - `pgsocket_preamble_frames_total` (counter): classified frames by kind
//!   (socket mode counts one per connection; call mode counts declines only)
//! - `pgsocket_preamble_aborted_total` (counter): connections lost before handoff, by reason
//! - `pgsocket_handoff_failures_total` (counter): session handler failures

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::preamble::FrameKind;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => ::tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => ::tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_opened() {
    ::metrics::counter!("pgsocket_connections_total").increment(1);
    ::metrics::gauge!("pgsocket_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    ::metrics::gauge!("pgsocket_active_connections").decrement(1.0);
}

pub fn record_preamble_frame(kind: FrameKind) {
    ::metrics::counter!("pgsocket_preamble_frames_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_preamble_aborted(reason: &'static str) {
    ::metrics::counter!("pgsocket_preamble_aborted_total", "reason" => reason).increment(1);
}

pub fn record_handoff_failure() {
    ::metrics::counter!("pgsocket_handoff_failures_total").increment(1);
}
