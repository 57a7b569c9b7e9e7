//! Prometheus metrics for the proxy
//!
//! Labels carry outcomes only, never instance ids or key material.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

use crate::error::{Result, ServerError};

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_CLIENT_ERROR: &str = "client_error";
pub const OUTCOME_SERVER_ERROR: &str = "server_error";

pub const PATH_DIRECT: &str = "direct";
pub const PATH_RE_ENCRYPTED: &str = "re_encrypted";

pub fn record_message(outcome: &str, duration: Duration) {
    counter!("samba_messages_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("samba_message_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_route_path(path: &str) {
    counter!("samba_routed_messages_total", "path" => path.to_string()).increment(1);
}

pub fn record_rekey_request(outcome: &str, duration: Duration) {
    counter!("samba_rekey_requests_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("samba_rekey_request_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_rekey_cache_hit() {
    counter!("samba_rekey_cache_hits_total").increment(1);
}

pub fn set_registered_instances(count: usize) {
    gauge!("samba_registered_instances").set(count as f64);
}

pub fn set_assigned_functions(count: usize) {
    gauge!("samba_assigned_functions").set(count as f64);
}

pub fn init_prometheus_recorder() -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("Failed to install Prometheus recorder: {}", e)))
}
