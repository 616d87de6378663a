//! Refunds API endpoint

use axum::extract::State;
use axum::Json;
use clubledger_core::{RefundOutcome, RefundRequest};

use crate::{ApiResult, AppState};

/// Submit a refund against a payment or as a ledger expense.
///
/// The client supplies `requestId` and reuses it on resubmission. A body
/// without one answers 400; an id that is running or already applied
/// answers 409.
pub async fn api_create_refund(
    State(state): State<AppState>,
    Json(request): Json<RefundRequest>,
) -> ApiResult<Json<RefundOutcome>> {
    let outcome = state.refunds.submit(&state.store, &request).await?;
    Ok(Json(outcome))
}
