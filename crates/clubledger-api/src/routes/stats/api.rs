//! Statistics API endpoints

use axum::extract::State;
use axum::Json;
use clubledger_client::BackendPaymentStats;
use clubledger_core::StatsSnapshot;

use crate::AppState;

/// Statistics derived from the current snapshot
pub async fn api_stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.store.stats().await)
}

/// The backend's own payment counters, `null` when they could not be loaded
pub async fn api_server_stats(State(state): State<AppState>) -> Json<Option<BackendPaymentStats>> {
    Json(state.store.snapshot().await.backend_stats.clone())
}
