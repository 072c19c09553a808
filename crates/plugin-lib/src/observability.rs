//! Observability for the cost source plugin
//!
//! Provides:
//! - Prometheus metrics for RPC latency, errors and returned cost points
//! - Structured JSON log events with tracing

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// Latency buckets in seconds; backend round trips dominate
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Registered once per process
static GLOBAL_METRICS: OnceLock<PluginMetricsInner> = OnceLock::new();

struct PluginMetricsInner {
    rpc_duration_seconds: HistogramVec,
    rpc_errors: IntCounterVec,
    cost_points_returned: IntCounter,
}

impl PluginMetricsInner {
    fn new() -> Self {
        Self {
            rpc_duration_seconds: register_histogram_vec!(
                "kubecost_plugin_rpc_duration_seconds",
                "Time spent serving cost source RPCs",
                &["method"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register rpc_duration_seconds"),

            rpc_errors: register_int_counter_vec!(
                "kubecost_plugin_rpc_errors_total",
                "Cost source RPCs that failed, by error kind",
                &["method", "kind"]
            )
            .expect("Failed to register rpc_errors_total"),

            cost_points_returned: register_int_counter!(
                "kubecost_plugin_cost_points_returned_total",
                "Actual cost results returned to callers"
            )
            .expect("Failed to register cost_points_returned_total"),
        }
    }
}

/// Handle to the process-wide plugin metrics
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct PluginMetrics {
    _private: (),
}

impl Default for PluginMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginMetrics {
    /// Create a handle, registering the collectors on first use
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PluginMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PluginMetricsInner {
        GLOBAL_METRICS.get_or_init(PluginMetricsInner::new)
    }

    pub fn observe_rpc(&self, method: &str, elapsed: Duration) {
        self.inner()
            .rpc_duration_seconds
            .with_label_values(&[method])
            .observe(elapsed.as_secs_f64());
    }

    pub fn inc_rpc_error(&self, method: &str, kind: &str) {
        self.inner()
            .rpc_errors
            .with_label_values(&[method, kind])
            .inc();
    }

    pub fn add_cost_points(&self, count: usize) {
        self.inner().cost_points_returned.inc_by(count as u64);
    }
}

/// Structured logger for plugin lifecycle and request events
#[derive(Clone)]
pub struct StructuredLogger {
    plugin_name: String,
}

impl StructuredLogger {
    pub fn new(plugin_name: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, listen_addr: &str, base_url: &str) {
        info!(
            event = "plugin_started",
            plugin = %self.plugin_name,
            version = %version,
            listen_addr = %listen_addr,
            kubecost_url = %base_url,
            "Cost source plugin started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "plugin_shutdown",
            plugin = %self.plugin_name,
            reason = %reason,
            "Cost source plugin shutting down"
        );
    }

    pub fn log_request(&self, method: &str, resource: &str, elapsed: Duration, results: usize) {
        info!(
            event = "rpc_completed",
            plugin = %self.plugin_name,
            method = %method,
            resource = %resource,
            elapsed_ms = elapsed.as_millis() as u64,
            results = results,
            "Served cost source request"
        );
    }

    pub fn log_request_failure(&self, method: &str, resource: &str, kind: &str, error: &str) {
        warn!(
            event = "rpc_failed",
            plugin = %self.plugin_name,
            method = %method,
            resource = %resource,
            kind = %kind,
            error = %error,
            "Cost source request failed"
        );
    }
}
