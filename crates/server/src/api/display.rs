//! Public display board.

use axum::{extract::State, Json};
use chrono::{DateTime, FixedOffset};
use queue_buddy_core::ServiceType;
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Number of upcoming tickets shown per service.
const UPCOMING_LIMIT: usize = 5;

#[derive(Debug, Serialize)]
pub struct DisplayResponse {
    pub branch: String,
    /// Branch local time
    pub now: DateTime<FixedOffset>,
    pub counters: Vec<DisplayCounter>,
    pub queues: Vec<DisplayQueue>,
}

/// An active counter and the ticket it is serving.
#[derive(Debug, Serialize)]
pub struct DisplayCounter {
    pub id: u32,
    pub name: String,
    pub service_type: ServiceType,
    pub officer_name: Option<String>,
    pub now_serving: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DisplayQueue {
    pub service_type: ServiceType,
    pub name: &'static str,
    pub waiting: usize,
    /// Display codes of the next tickets to be called.
    pub upcoming: Vec<String>,
}

pub async fn get_display(State(state): State<Arc<AppState>>) -> Json<DisplayResponse> {
    let queue = state.queue();
    let snapshot = queue.snapshot();

    let counters = snapshot
        .counters
        .iter()
        .filter(|counter| counter.is_active)
        .map(|counter| DisplayCounter {
            id: counter.id,
            name: counter.name.clone(),
            service_type: counter.service_type,
            officer_name: counter.officer_name.clone(),
            now_serving: counter
                .current_ticket_id
                .as_deref()
                .and_then(|id| snapshot.ticket(id))
                .map(|ticket| ticket.display_code.clone()),
        })
        .collect();

    let queues = ServiceType::ALL
        .into_iter()
        .map(|service_type| {
            let waiting = snapshot.waiting_tickets(Some(service_type));
            DisplayQueue {
                service_type,
                name: service_type.info().name,
                waiting: waiting.len(),
                upcoming: waiting
                    .into_iter()
                    .take(UPCOMING_LIMIT)
                    .map(|ticket| ticket.display_code)
                    .collect(),
            }
        })
        .collect();

    Json(DisplayResponse {
        branch: state.config().branch.name.clone(),
        now: queue.now(),
        counters,
        queues,
    })
}
