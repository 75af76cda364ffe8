//! Prometheus Metrics Module
//!
//! Counters describing session traffic. Recording is a no-op until
//! [`init_metrics`] installs the Prometheus recorder.
//!
//! # Metrics
//!
//! - `bztcp_records_delivered_total`: STREAM records handed to the sink
//! - `bztcp_pings_sent_total`: keep-alive probes written
//! - `bztcp_pongs_received_total`: keep-alive answers read
//! - `bztcp_ignored_messages_total`: well-formed lines with an unknown status
//! - `bztcp_session_errors_total`: sessions ended by an error, by kind

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::OnceLock;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

static INSTALLED: OnceLock<SocketAddr> = OnceLock::new();

/// Install the Prometheus recorder and serve `/metrics` on `port`.
///
/// Must be called from within a Tokio runtime. Later calls are no-ops.
///
/// # Errors
///
/// Returns an error if the recorder or the HTTP listener cannot be installed.
pub fn init_metrics(port: u16) -> Result<SocketAddr, BuildError> {
    if let Some(addr) = INSTALLED.get() {
        return Ok(*addr);
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    register_metrics();

    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(*INSTALLED.get_or_init(|| addr))
}

fn register_metrics() {
    describe_counter!(
        "bztcp_records_delivered_total",
        "STREAM records delivered to the record sink"
    );
    describe_counter!("bztcp_pings_sent_total", "Keep-alive PING messages sent");
    describe_counter!(
        "bztcp_pongs_received_total",
        "Keep-alive PONG messages received"
    );
    describe_counter!(
        "bztcp_ignored_messages_total",
        "Messages with an unrecognised status"
    );
    describe_counter!(
        "bztcp_session_errors_total",
        "Sessions terminated by an error, by kind"
    );
}

/// Record a STREAM record delivered to the sink.
pub fn record_delivered() {
    counter!("bztcp_records_delivered_total").increment(1);
}

/// Record a PING written to the server.
pub fn record_ping_sent() {
    counter!("bztcp_pings_sent_total").increment(1);
}

/// Record a PONG read from the server.
pub fn record_pong_received() {
    counter!("bztcp_pongs_received_total").increment(1);
}

/// Record a message whose status the client does not handle.
///
/// The status itself comes from the server and is only logged, never used as
/// a label.
pub fn record_ignored() {
    counter!("bztcp_ignored_messages_total").increment(1);
}

/// Record a session ended by an error of `kind`.
pub fn record_session_error(kind: &'static str) {
    counter!("bztcp_session_errors_total", "kind" => kind).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_noop() {
        record_delivered();
        record_ping_sent();
        record_pong_received();
        record_ignored();
        record_session_error("invalid_key");
    }
}
