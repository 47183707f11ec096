//! Prometheus metrics for the pipeline.
//!
//! This module provides metrics for:
//! - Stats API fetches (retries)
//! - Staging (rows written, uploads)
//! - Warehouse statements
//! - Graph runs (task outcomes, durations)

use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

// =============================================================================
// Stats API
// =============================================================================

/// Retried stats API calls by reason.
pub static FETCH_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("hoopline_fetch_retries_total", "Total retried stats API calls"),
        &["reason"], // "timeout", "error"
    )
    .unwrap()
});

// =============================================================================
// Staging
// =============================================================================

/// Rows written to staged CSV files by table.
pub static ROWS_STAGED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("hoopline_rows_staged_total", "Total rows written to staged CSV files"),
        &["table"],
    )
    .unwrap()
});

/// Object uploads by result.
pub static UPLOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("hoopline_uploads_total", "Total staged file uploads"),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

// =============================================================================
// Warehouse
// =============================================================================

/// Warehouse statements by result.
pub static WAREHOUSE_STATEMENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "hoopline_warehouse_statements_total",
            "Total warehouse statements submitted",
        ),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

// =============================================================================
// Graph runs
// =============================================================================

/// Finished tasks by task id and final state.
pub static TASK_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("hoopline_task_runs_total", "Total finished tasks"),
        &["task", "state"],
    )
    .unwrap()
});

/// Task duration in seconds by operator.
pub static TASK_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("hoopline_task_duration_seconds", "Duration of task execution")
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0, 900.0, 3600.0]),
        &["operator"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(FETCH_RETRIES.clone()),
        Box::new(ROWS_STAGED.clone()),
        Box::new(UPLOADS.clone()),
        Box::new(WAREHOUSE_STATEMENTS.clone()),
        Box::new(TASK_RUNS.clone()),
        Box::new(TASK_DURATION.clone()),
    ]
}

/// Registry holding every pipeline metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        registry.register(metric).unwrap();
    }
    registry
});

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
