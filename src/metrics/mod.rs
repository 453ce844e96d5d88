//! Prometheus metrics exposed at `/metrics`. Mirrors the reference fleet's
//! pattern of a handful of process-wide registered collectors plus a thin
//! handler that renders the default registry.

use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramVec, IntCounterVec, TextEncoder};

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    prometheus::register_int_counter_vec!(
        "feed_core_http_requests_total",
        "Total HTTP requests handled, by path and status class",
        &["path", "status"]
    )
    .expect("metric registration")
});

pub static CACHE_RESULT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    prometheus::register_int_counter_vec!(
        "feed_core_cache_result_total",
        "Cache lookups by outcome (hit/miss)",
        &["outcome"]
    )
    .expect("metric registration")
});

pub static CANDIDATE_POOL_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    prometheus::register_histogram_vec!(
        "feed_core_candidate_pool_duration_seconds",
        "Time spent fanning out the four candidate pools",
        &["pool"]
    )
    .expect("metric registration")
});

pub static PREFETCH_ESTIMATED_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    prometheus::register_histogram_vec!(
        "feed_core_prefetch_estimated_bytes",
        "Estimated prefetch plan size per card, in megabytes",
        &["quality"]
    )
    .expect("metric registration")
});

pub async fn render() -> String {
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
