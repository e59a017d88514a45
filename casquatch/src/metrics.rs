use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, Encoder,
    HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};

/// Upper bounds in seconds, from sub-millisecond local reads to slow batches
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5, 1.0, 5.0,
];

lazy_static! {
    pub static ref REQUEST_LATENCY: HistogramVec = register_histogram_vec!(
        "casquatch_request_duration_seconds",
        "Time from issuing a mapped CQL request to its result, per table",
        &["operation", "table", "outcome"],
        LATENCY_BUCKETS.to_vec()
    ).unwrap();

    pub static ref REQUESTS: IntCounterVec = register_int_counter_vec!(
        "casquatch_requests_total",
        "Mapped CQL requests issued by the driver",
        &["operation", "table", "outcome"]
    ).unwrap();

    pub static ref PENDING_ASYNC_OPERATIONS: IntGaugeVec = register_int_gauge_vec!(
        "casquatch_pending_async_operations",
        "Asynchronous saves and deletes not yet acknowledged",
        &["operation"]
    ).unwrap();
}

/// Count one request against `table` and observe how long it took.
pub fn record_operation(operation: &str, table: &str, success: bool, elapsed: Duration) {
    let labels = [operation, table, if success { "ok" } else { "error" }];
    REQUESTS.with_label_values(&labels).inc();
    REQUEST_LATENCY
        .with_label_values(&labels)
        .observe(elapsed.as_secs_f64());
}

/// Render every registered metric in the Prometheus text format.
pub fn gather_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&prometheus::gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
