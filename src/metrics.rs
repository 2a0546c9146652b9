use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics exporter
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();

    let handle = builder
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    init_metric_descriptions();

    handle
}

/// Initialize metric descriptions (can be called multiple times safely)
pub fn init_metric_descriptions() {
    describe_counter!(
        "gateway_requests_total",
        "Total gateway operations by name and outcome"
    );
    describe_histogram!(
        "gateway_request_duration_seconds",
        "Gateway operation duration in seconds"
    );
    describe_gauge!(
        "gateway_info",
        "Gateway version and build information"
    );

    gauge!("gateway_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record one success/failure outcome for a named operation
pub fn record_outcome(operation: &str, success: bool) {
    counter!(
        "gateway_requests_total",
        "operation" => operation.to_string(),
        "outcome" => if success { "success" } else { "failure" },
    )
    .increment(1);
}

/// Record one latency observation for a named operation
pub fn record_duration(operation: &str, duration: Duration) {
    histogram!(
        "gateway_request_duration_seconds",
        "operation" => operation.to_string(),
    )
    .record(duration.as_secs_f64());
}
