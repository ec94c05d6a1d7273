use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use queue_buddy_core::{AuditFilter, AuditRecord, DEFAULT_AUDIT_LIMIT};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

/// Query parameters for audit endpoint
#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    /// Filter by queue ticket ID
    pub ticket_id: Option<String>,
    /// Filter by counter
    pub counter_id: Option<u32>,
    /// Filter by event type
    pub event_type: Option<String>,
    /// Filter by acting user ID
    pub user_id: Option<String>,
    /// Filter events after this timestamp (ISO 8601)
    pub from: Option<DateTime<Utc>>,
    /// Filter events before this timestamp (ISO 8601)
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of events to return (default 100, max 1000)
    pub limit: Option<i64>,
    /// Pagination offset (default 0)
    pub offset: Option<i64>,
}

/// Response for audit query endpoint
#[derive(Debug, Serialize)]
pub struct AuditQueryResponse {
    /// Matching events, newest first
    pub events: Vec<AuditRecord>,
    /// Total number of matching events
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Query audit events
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditQueryResponse>, ApiError> {
    let mut filter = AuditFilter::new()
        .with_limit(params.limit.unwrap_or(DEFAULT_AUDIT_LIMIT))
        .with_offset(params.offset.unwrap_or(0));

    if let Some(ref ticket_id) = params.ticket_id {
        filter = filter.with_ticket_id(ticket_id);
    }

    if let Some(counter_id) = params.counter_id {
        filter = filter.with_counter_id(counter_id);
    }

    if let Some(ref event_type) = params.event_type {
        filter = filter.with_event_type(event_type);
    }

    if let Some(ref user_id) = params.user_id {
        filter = filter.with_user_id(user_id);
    }

    if params.from.is_some() || params.to.is_some() {
        filter = filter.with_time_range(params.from, params.to);
    }

    let events = state.audit_store().query(&filter).map_err(|e| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to query audit events: {}", e),
        )
    })?;

    // Count ignores paging
    let total = state.audit_store().count(&filter).map_err(|e| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to count audit events: {}", e),
        )
    })?;

    Ok(Json(AuditQueryResponse {
        events,
        total,
        limit: filter.limit,
        offset: filter.offset,
    }))
}
