//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the queue server:
//! - HTTP request metrics (latency, counts, auth failures)
//! - WebSocket connection metrics
//! - Queue gauges (collected dynamically before each scrape)
//!
//! Queue transition counters live in the core crate and are registered here.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};
use queue_buddy_core::{ServiceType, TicketStatus};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "queue_buddy_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("queue_buddy_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "queue_buddy_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication and authorization failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "queue_buddy_auth_failures_total",
            "Total authentication and authorization failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "queue_buddy_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "queue_buddy_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "queue_buddy_ws_messages_sent_total",
            "WebSocket messages sent",
        ),
        &["type"],
    )
    .unwrap()
});

/// WebSocket lag events (when client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "queue_buddy_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Queue Gauges (collected dynamically)
// =============================================================================

/// Tickets by current status.
pub static TICKETS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "queue_buddy_tickets_by_status",
            "Current ticket count by status",
        ),
        &["status"],
    )
    .unwrap()
});

/// Waiting customers per service type.
pub static QUEUE_WAITING: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "queue_buddy_queue_waiting",
            "Customers waiting per service type",
        ),
        &["service_type"],
    )
    .unwrap()
});

/// Counters open for calls.
pub static COUNTERS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("queue_buddy_counters_active", "Number of active counters").unwrap()
});

/// Counters currently serving a ticket.
pub static COUNTERS_BUSY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "queue_buddy_counters_busy",
        "Number of counters currently serving a customer",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();
    registry.register(Box::new(WS_LAG_EVENTS.clone())).unwrap();

    // Queue
    registry
        .register(Box::new(TICKETS_BY_STATUS.clone()))
        .unwrap();
    registry.register(Box::new(QUEUE_WAITING.clone())).unwrap();
    registry.register(Box::new(COUNTERS_ACTIVE.clone())).unwrap();
    registry.register(Box::new(COUNTERS_BUSY.clone())).unwrap();

    // Core metrics (ticket transitions, timings, persistence)
    for metric in queue_buddy_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Refresh the queue gauges from the current queue snapshot.
pub fn collect_dynamic_metrics(state: &AppState) {
    let snapshot = state.queue().snapshot();

    for status in TicketStatus::ALL {
        let count = snapshot
            .tickets
            .iter()
            .filter(|t| t.status() == status)
            .count();
        TICKETS_BY_STATUS
            .with_label_values(&[status.as_str()])
            .set(count as i64);
    }

    for service_type in ServiceType::ALL {
        QUEUE_WAITING
            .with_label_values(&[service_type.as_str()])
            .set(snapshot.waiting_count(Some(service_type)) as i64);
    }

    let active = snapshot.counters.iter().filter(|c| c.is_active).count();
    let busy = snapshot
        .counters
        .iter()
        .filter(|c| c.current_ticket_id.is_some())
        .count();
    COUNTERS_ACTIVE.set(active as i64);
    COUNTERS_BUSY.set(busy as i64);
}

static UUID_REGEX: Lazy<regex_lite::Regex> = Lazy::new(|| {
    regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap()
});
static NUMERIC_REGEX: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());
static USER_REGEX: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/users/[^/]+").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_REGEX.replace_all(path, "{id}");
    let result = NUMERIC_REGEX.replace_all(&result, "/{id}$1");
    let result = USER_REGEX.replace_all(&result, "/users/{user_id}");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/tickets/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/tickets/{id}");
    }

    #[test]
    fn test_normalize_path_counter_id() {
        let path = "/api/v1/counters/3/call-next";
        assert_eq!(normalize_path(path), "/api/v1/counters/{id}/call-next");
    }

    #[test]
    fn test_normalize_path_user_id() {
        assert_eq!(
            normalize_path("/api/v1/users/rina.s/admin"),
            "/api/v1/users/{user_id}/admin"
        );
        assert_eq!(normalize_path("/api/v1/users"), "/api/v1/users");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/queue/waiting-count";
        assert_eq!(normalize_path(path), "/api/v1/queue/waiting-count");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("queue_buddy_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_queue_metrics() {
        // Vec metrics only appear once a label set has been touched.
        QUEUE_WAITING.with_label_values(&["teller"]).set(0);
        TICKETS_BY_STATUS.with_label_values(&["waiting"]).set(0);
        COUNTERS_ACTIVE.set(0);
        WS_CONNECTIONS_TOTAL.inc();
        queue_buddy_core::metrics::TICKETS_ISSUED
            .with_label_values(&["teller"])
            .inc();

        let output = encode_metrics();

        assert!(output.contains("queue_buddy_queue_waiting"));
        assert!(output.contains("queue_buddy_tickets_by_status"));
        assert!(output.contains("queue_buddy_counters_active"));
        assert!(output.contains("queue_buddy_ws_connections_total"));
        assert!(output.contains("queue_buddy_tickets_issued_total"));
    }
}
