use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static PULLS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "namerator_pulls_total",
        "Snapshot pulls by origin (remote, missing, cached, unavailable)",
        &["origin"]
    )
    .expect("register pulls_total")
});

pub static PUSHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "namerator_pushes_total",
        "Snapshot pushes by result",
        &["result"]
    )
    .expect("register pushes_total")
});

pub static MUTATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "namerator_mutations_total",
        "Local mutations applied by operation",
        &["op"]
    )
    .expect("register mutations_total")
});

pub static SYNC_CHANGES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "namerator_sync_changes_total",
        "Sync ticks that replaced local state with newer remote data"
    )
    .expect("register sync_changes_total")
});

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
