//! Service catalog handlers.

use axum::{extract::State, Json};
use queue_buddy_core::{ServiceInfo, SERVICE_CATALOG};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Catalog entry with the live queue length.
#[derive(Debug, Serialize)]
pub struct ServiceResponse {
    #[serde(flatten)]
    pub info: ServiceInfo,
    pub waiting: usize,
    /// Rough wait for a ticket drawn now, in minutes.
    pub estimated_wait_minutes: u32,
}

pub async fn list_services(State(state): State<Arc<AppState>>) -> Json<Vec<ServiceResponse>> {
    let queue = state.queue();
    let services = SERVICE_CATALOG
        .iter()
        .map(|info| {
            let waiting = queue.waiting_count(Some(info.id));
            ServiceResponse {
                info: info.clone(),
                waiting,
                estimated_wait_minutes: waiting as u32 * info.estimated_minutes,
            }
        })
        .collect();
    Json(services)
}
