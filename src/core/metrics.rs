//! Prometheus metrics for the fetch pipeline
//!
//! Queue depth and admissions, per-platform outcomes and fetch latency.
//! Exposed on `/metrics` by the dashboard server.

#![allow(clippy::expect_used)]

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec, IntCounterVec, IntGauge,
};

/// Tasks waiting behind the in-flight one
pub static QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("lashmedia_queue_depth", "Number of tasks waiting in the queue")
        .expect("static metric definition")
});

/// 1 while a task is running, 0 when idle
pub static TASKS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("lashmedia_tasks_in_flight", "Number of tasks currently executing")
        .expect("static metric definition")
});

/// Admission results
/// Labels: outcome (started/queued/queue_full/user_cap/cooldown)
pub static ADMISSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "lashmedia_admissions_total",
        "Requests by admission outcome",
        &["outcome"]
    )
    .expect("static metric definition")
});

/// Finished downloads
/// Labels: platform, status (success/failed)
pub static DOWNLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "lashmedia_downloads_total",
        "Finished downloads by platform and status",
        &["platform", "status"]
    )
    .expect("static metric definition")
});

/// Fetch failures by kind (see `FetchError::subcategory`)
pub static FETCH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "lashmedia_fetch_failures_total",
        "Fetch failures by error kind",
        &["kind"]
    )
    .expect("static metric definition")
});

/// Time spent inside yt-dlp per platform
pub static FETCH_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "lashmedia_fetch_duration_seconds",
        "Wall time of a fetch by platform",
        &["platform"],
        vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    )
    .expect("static metric definition")
});

/// Forces registration so `/metrics` lists every series from the first scrape.
pub fn init_metrics() {
    Lazy::force(&QUEUE_DEPTH);
    Lazy::force(&TASKS_IN_FLIGHT);
    Lazy::force(&ADMISSIONS_TOTAL);
    Lazy::force(&DOWNLOADS_TOTAL);
    Lazy::force(&FETCH_FAILURES_TOTAL);
    Lazy::force(&FETCH_DURATION_SECONDS);
    log::info!("Metrics registry initialized");
}

pub fn record_admission(outcome: &str) {
    ADMISSIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_download(platform: &str, success: bool) {
    let status = if success { "success" } else { "failed" };
    DOWNLOADS_TOTAL.with_label_values(&[platform, status]).inc();
}

pub fn record_fetch_failure(kind: &str) {
    FETCH_FAILURES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_fetch_duration(platform: &str, seconds: f64) {
    FETCH_DURATION_SECONDS.with_label_values(&[platform]).observe(seconds);
}

/// Renders all registered metrics in the Prometheus text format.
pub fn render() -> String {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        log::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
