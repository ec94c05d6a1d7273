//! Queue views and the administrative reset.

use axum::{
    extract::{Query, State},
    Json,
};
use queue_buddy_core::{AuditEvent, ServiceType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::handlers::ApiError;
use super::middleware::AuthUser;
use super::tickets::{parse_service_type, TicketResponse};
use crate::state::AppState;

/// Optional `service_type` query filter
#[derive(Debug, Deserialize)]
pub struct ServiceTypeParams {
    pub service_type: Option<String>,
}

impl ServiceTypeParams {
    fn parse(&self) -> Result<Option<ServiceType>, ApiError> {
        self.service_type
            .as_deref()
            .map(parse_service_type)
            .transpose()
    }
}

#[derive(Debug, Serialize)]
pub struct WaitingCountResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceType>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub dropped_tickets: usize,
}

/// Waiting tickets, oldest first, with their queue positions
pub async fn waiting(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ServiceTypeParams>,
) -> Result<Json<Vec<TicketResponse>>, ApiError> {
    let service_type = params.parse()?;
    let snapshot = state.queue().snapshot();
    let tickets = snapshot
        .waiting_tickets(service_type)
        .into_iter()
        .map(|ticket| {
            let position = snapshot.queue_position(&ticket.id);
            TicketResponse::from(ticket).with_position(position)
        })
        .collect();
    Ok(Json(tickets))
}

/// Tickets currently at a counter
pub async fn serving(State(state): State<Arc<AppState>>) -> Json<Vec<TicketResponse>> {
    Json(
        state
            .queue()
            .current_serving()
            .into_iter()
            .map(TicketResponse::from)
            .collect(),
    )
}

pub async fn waiting_count(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ServiceTypeParams>,
) -> Result<Json<WaitingCountResponse>, ApiError> {
    let service_type = params.parse()?;
    Ok(Json(WaitingCountResponse {
        service_type,
        count: state.queue().waiting_count(service_type),
    }))
}

/// Drop every ticket and restore the configured counters
pub async fn reset(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Json<ResetResponse> {
    let dropped_tickets = state.queue().reset_queue();

    state.audit().try_emit(AuditEvent::QueueReset {
        reset_by: user_id,
        dropped_tickets,
    });
    state.ws_broadcaster().queue_reset();

    Json(ResetResponse { dropped_tickets })
}
