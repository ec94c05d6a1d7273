//! Counter (service point) handlers used by officers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use queue_buddy_core::queue::minutes_between;
use queue_buddy_core::{AuditEvent, Counter, QueueError, Ticket, TicketState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use super::handlers::{api_error, ApiError};
use super::middleware::AuthUser;
use super::tickets::TicketResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SetActiveBody {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetOfficerBody {
    pub name: String,
}

/// Counter with the ticket it is serving
#[derive(Debug, Serialize)]
pub struct CounterResponse {
    #[serde(flatten)]
    pub counter: Counter,
    pub current_ticket: Option<TicketResponse>,
}

/// Result of a call/complete/skip action.
///
/// `ticket` is null when there was nothing to act on.
#[derive(Debug, Serialize)]
pub struct CounterActionResponse {
    pub ticket: Option<TicketResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CounterActionResponse {
    fn done(ticket: Ticket) -> Self {
        Self {
            ticket: Some(TicketResponse::from(ticket)),
            message: None,
        }
    }

    fn nothing(message: &str) -> Self {
        Self {
            ticket: None,
            message: Some(message.to_string()),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_counters(State(state): State<Arc<AppState>>) -> Json<Vec<CounterResponse>> {
    let snapshot = state.queue().snapshot();
    let counters = snapshot
        .counters
        .iter()
        .map(|counter| CounterResponse {
            current_ticket: counter
                .current_ticket_id
                .as_deref()
                .and_then(|id| snapshot.ticket(id))
                .cloned()
                .map(TicketResponse::from),
            counter: counter.clone(),
        })
        .collect();
    Json(counters)
}

/// Call the next waiting customer to this counter
pub async fn call_next(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(counter_id): Path<u32>,
) -> Result<Json<CounterActionResponse>, ApiError> {
    let counter = find_counter(&state, counter_id)?;

    match state.queue().call_next(counter_id) {
        Ok(Some(ticket)) => {
            state.audit().try_emit(AuditEvent::TicketCalled {
                ticket_id: ticket.id.clone(),
                display_code: ticket.display_code.clone(),
                counter_id,
                called_by: user_id,
            });
            state.ws_broadcaster().ticket_called(&ticket, &counter);
            Ok(Json(CounterActionResponse::done(ticket)))
        }
        Ok(None) => {
            // The counter may have been switched off since it was looked up
            let active = state
                .queue()
                .counter(counter_id)
                .map_or(counter.is_active, |c| c.is_active);
            let message = if active {
                "No customers waiting"
            } else {
                "Counter is inactive"
            };
            Ok(Json(CounterActionResponse::nothing(message)))
        }
        Err(e @ QueueError::CounterBusy { .. }) => {
            Err(api_error(StatusCode::CONFLICT, e.to_string()))
        }
        Err(e) => {
            error!(counter_id, "Call failed: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Finish serving the current customer
pub async fn complete(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(counter_id): Path<u32>,
) -> Result<Json<CounterActionResponse>, ApiError> {
    find_counter(&state, counter_id)?;

    let Some(ticket) = state.queue().complete_service(counter_id) else {
        return Ok(Json(CounterActionResponse::nothing(
            "No customer is being served",
        )));
    };

    if let TicketState::Completed {
        called_at,
        completed_at,
        ..
    } = ticket.state
    {
        state.audit().try_emit(AuditEvent::TicketCompleted {
            ticket_id: ticket.id.clone(),
            display_code: ticket.display_code.clone(),
            counter_id,
            completed_by: user_id,
            wait_minutes: minutes_between(ticket.created_at, called_at),
            service_minutes: minutes_between(called_at, completed_at),
        });
    }
    state.ws_broadcaster().ticket_resolved(&ticket, counter_id);

    Ok(Json(CounterActionResponse::done(ticket)))
}

/// Mark the current customer as a no-show
pub async fn skip(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(counter_id): Path<u32>,
) -> Result<Json<CounterActionResponse>, ApiError> {
    find_counter(&state, counter_id)?;

    let Some(ticket) = state.queue().skip_ticket(counter_id) else {
        return Ok(Json(CounterActionResponse::nothing(
            "No customer is being served",
        )));
    };

    state.audit().try_emit(AuditEvent::TicketSkipped {
        ticket_id: ticket.id.clone(),
        display_code: ticket.display_code.clone(),
        counter_id,
        skipped_by: user_id,
    });
    state.ws_broadcaster().ticket_resolved(&ticket, counter_id);

    Ok(Json(CounterActionResponse::done(ticket)))
}

/// Open or close a counter
pub async fn set_active(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(counter_id): Path<u32>,
    Json(body): Json<SetActiveBody>,
) -> Result<Json<Counter>, ApiError> {
    let counter = state
        .queue()
        .set_counter_active(counter_id, body.is_active)
        .ok_or_else(|| counter_not_found(counter_id))?;

    state.audit().try_emit(AuditEvent::CounterActiveChanged {
        counter_id,
        is_active: counter.is_active,
        changed_by: user_id,
    });
    state.ws_broadcaster().counter_updated(&counter);

    Ok(Json(counter))
}

/// Set the officer name shown for a counter; an empty name clears it
pub async fn set_officer(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(counter_id): Path<u32>,
    Json(body): Json<SetOfficerBody>,
) -> Result<Json<Counter>, ApiError> {
    let counter = state
        .queue()
        .set_officer_name(counter_id, &body.name)
        .ok_or_else(|| counter_not_found(counter_id))?;

    state.audit().try_emit(AuditEvent::OfficerNameChanged {
        counter_id,
        officer_name: counter.officer_name.clone(),
        changed_by: user_id,
    });
    state.ws_broadcaster().counter_updated(&counter);

    Ok(Json(counter))
}

fn find_counter(state: &AppState, counter_id: u32) -> Result<Counter, ApiError> {
    state
        .queue()
        .counter(counter_id)
        .ok_or_else(|| counter_not_found(counter_id))
}

fn counter_not_found(counter_id: u32) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        format!("Counter not found: {}", counter_id),
    )
}
