// src/handlers/sync.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

use crate::{error::AppError, state::AppState, sync::SyncEvent};

#[derive(Debug, Serialize)]
pub struct SyncStatusView {
    pub online: bool,
    pub syncing: bool,
    pub durable_buffer: bool,
    pub pending_users: usize,
    pub pending_results: usize,
    pub last_event: Option<SyncEvent>,
}

pub async fn sync_status(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(SyncStatusView {
        online: state.connectivity.is_online(),
        syncing: state.coordinator.is_syncing(),
        durable_buffer: state.buffer.is_durable(),
        pending_users: state.buffer.list_users().await?.len(),
        pending_results: state.buffer.list_results().await?.len(),
        last_event: state.sync_status.latest().await,
    }))
}

/// Runs a sync attempt now, regardless of the connectivity status.
pub async fn trigger_sync(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.coordinator.sync_now().await)
}
