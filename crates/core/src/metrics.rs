//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Ticket issuance and resolution
//! - Wait and service durations
//! - Snapshot persistence

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Queue Metrics
// =============================================================================

/// Tickets issued total by service type.
pub static TICKETS_ISSUED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("queue_buddy_tickets_issued_total", "Total tickets issued"),
        &["service_type"],
    )
    .unwrap()
});

/// Tickets called to a counter total by service type.
pub static TICKETS_CALLED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("queue_buddy_tickets_called_total", "Total tickets called"),
        &["service_type"],
    )
    .unwrap()
});

/// Tickets resolved total by service type and outcome.
pub static TICKETS_RESOLVED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "queue_buddy_tickets_resolved_total",
            "Total tickets resolved",
        ),
        &["service_type", "outcome"], // outcome: "completed", "skipped"
    )
    .unwrap()
});

/// Call attempts rejected because the counter was still serving.
pub static COUNTER_BUSY_REJECTIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "queue_buddy_counter_busy_rejections_total",
        "Total call-next attempts rejected because the counter was busy",
    )
    .unwrap()
});

/// Minutes between issue and call.
pub static WAIT_MINUTES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "queue_buddy_wait_minutes",
            "Minutes a completed ticket waited before being called",
        )
        .buckets(vec![1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0]),
        &["service_type"],
    )
    .unwrap()
});

/// Minutes between call and completion.
pub static SERVICE_MINUTES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "queue_buddy_service_minutes",
            "Minutes spent serving a completed ticket",
        )
        .buckets(vec![1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0]),
        &["service_type"],
    )
    .unwrap()
});

// =============================================================================
// Persistence Metrics
// =============================================================================

/// Snapshot writes that failed.
pub static SNAPSHOT_SAVE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "queue_buddy_snapshot_save_failures_total",
        "Total queue snapshot writes that failed",
    )
    .unwrap()
});

/// Statistics discarded because their date was not today.
pub static STATS_ROLLOVERS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "queue_buddy_stats_rollovers_total",
        "Total times daily statistics were reset for a new day",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Queue
        Box::new(TICKETS_ISSUED.clone()),
        Box::new(TICKETS_CALLED.clone()),
        Box::new(TICKETS_RESOLVED.clone()),
        Box::new(COUNTER_BUSY_REJECTIONS.clone()),
        Box::new(WAIT_MINUTES.clone()),
        Box::new(SERVICE_MINUTES.clone()),
        // Persistence
        Box::new(SNAPSHOT_SAVE_FAILURES.clone()),
        Box::new(STATS_ROLLOVERS.clone()),
    ]
}
