//! Ticket API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use queue_buddy_core::{AuditEvent, ServiceType, Ticket, TicketFilter, TicketState, TicketStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for drawing a ticket
#[derive(Debug, Deserialize)]
pub struct TakeTicketBody {
    pub service_type: ServiceType,
}

/// Query parameters for listing tickets
#[derive(Debug, Deserialize)]
pub struct ListTicketsParams {
    /// Filter by status
    pub status: Option<String>,
    /// Filter by service type
    pub service_type: Option<String>,
}

/// Ticket as returned by the API
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: String,
    pub number: u32,
    pub display_code: String,
    pub service_type: ServiceType,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub called_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_id: Option<u32>,
    /// 1-based place among waiting tickets of the same service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<usize>,
}

impl TicketResponse {
    pub fn with_position(mut self, queue_position: Option<usize>) -> Self {
        self.queue_position = queue_position;
        self
    }
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        let (completed_at, skipped_at) = match ticket.state {
            TicketState::Completed { completed_at, .. } => (Some(completed_at), None),
            TicketState::Skipped { skipped_at, .. } => (None, Some(skipped_at)),
            _ => (None, None),
        };
        Self {
            status: ticket.status(),
            called_at: ticket.state.called_at(),
            counter_id: ticket.state.counter_id(),
            completed_at,
            skipped_at,
            id: ticket.id,
            number: ticket.number,
            display_code: ticket.display_code,
            service_type: ticket.service_type,
            created_at: ticket.created_at,
            queue_position: None,
        }
    }
}

/// Response for listing tickets
#[derive(Debug, Serialize)]
pub struct ListTicketsResponse {
    pub tickets: Vec<TicketResponse>,
    pub total: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// Draw a new ticket
pub async fn take_ticket(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TakeTicketBody>,
) -> (StatusCode, Json<TicketResponse>) {
    let queue = state.queue();
    let ticket = queue.take_ticket(body.service_type);
    let position = queue.queue_position(&ticket.id);

    state.audit().try_emit(AuditEvent::TicketIssued {
        ticket_id: ticket.id.clone(),
        display_code: ticket.display_code.clone(),
        service_type: ticket.service_type,
    });
    state
        .ws_broadcaster()
        .ticket_issued(&ticket, queue.waiting_count(Some(ticket.service_type)));

    (
        StatusCode::CREATED,
        Json(TicketResponse::from(ticket).with_position(position)),
    )
}

/// Get a ticket by ID
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TicketResponse>, ApiError> {
    let queue = state.queue();
    match queue.ticket(&id) {
        Some(ticket) => {
            let position = queue.queue_position(&id);
            Ok(Json(TicketResponse::from(ticket).with_position(position)))
        }
        None => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Ticket not found: {}", id),
        )),
    }
}

/// List tickets in issue order with optional filters
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTicketsParams>,
) -> Result<Json<ListTicketsResponse>, ApiError> {
    let mut filter = TicketFilter::new();

    if let Some(ref status) = params.status {
        let status = status
            .parse::<TicketStatus>()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
        filter = filter.with_status(status);
    }

    if let Some(ref service_type) = params.service_type {
        filter = filter.with_service_type(parse_service_type(service_type)?);
    }

    let tickets: Vec<TicketResponse> = state
        .queue()
        .tickets(&filter)
        .into_iter()
        .map(TicketResponse::from)
        .collect();

    Ok(Json(ListTicketsResponse {
        total: tickets.len(),
        tickets,
    }))
}

/// Parse a `service_type` query value, rejecting unknown names with 400.
pub(crate) fn parse_service_type(value: &str) -> Result<ServiceType, ApiError> {
    value
        .parse::<ServiceType>()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use queue_buddy_core::testing::fixtures;

    #[test]
    fn test_response_flattens_state() {
        let (queue, _store, _clock) = fixtures::queue_service();
        let waiting = queue.take_ticket(ServiceType::CustomerService);

        let json = serde_json::to_value(TicketResponse::from(waiting.clone()).with_position(Some(1)))
            .unwrap();
        assert_eq!(json["display_code"], "B001");
        assert_eq!(json["status"], "waiting");
        assert_eq!(json["queue_position"], 1);
        assert!(json.get("called_at").is_none());
        assert!(json.get("counter_id").is_none());

        queue.call_next(3).unwrap();
        let completed = queue.complete_service(3).unwrap();
        let json = serde_json::to_value(TicketResponse::from(completed)).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["counter_id"], 3);
        assert!(json.get("completed_at").is_some());
        assert!(json.get("skipped_at").is_none());
        assert!(json.get("queue_position").is_none());
    }

    #[test]
    fn test_parse_service_type() {
        assert_eq!(parse_service_type("loan").unwrap(), ServiceType::Loan);
        let (status, body) = parse_service_type("mortgage").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("mortgage"));
    }
}
