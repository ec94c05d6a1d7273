//! Daily statistics.

use axum::{extract::State, Json};
use queue_buddy_core::QueueStats;
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: QueueStats,
    pub total_issued: u32,
    /// Customers still in line right now.
    pub waiting: usize,
}

pub async fn today(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let queue = state.queue();
    let stats = queue.today_stats();
    Json(StatsResponse {
        total_issued: stats.total_issued(),
        waiting: queue.waiting_count(None),
        stats,
    })
}
