//! Payments API endpoints

use axum::extract::{Path, Query, State};
use axum::Json;
use clubledger_client::{Payment, PaymentStatus};
use clubledger_core::{PaymentFilter, RecordFilter};
use std::collections::HashMap;

use crate::routes::{parse_param, text_param};
use crate::{ApiResult, AppState};

/// Get payments filtered by `status`, `type` and `q` (JSON API)
pub async fn api_payments(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Vec<Payment>>> {
    let filter = PaymentFilter {
        status: parse_param::<PaymentStatus>("status", params.get("status").map(String::as_str))?,
        payment_type: text_param(params.get("type")),
        search: text_param(params.get("q")),
    };
    let snapshot = state.store.snapshot().await;
    Ok(Json(filter.apply(&snapshot.payments)))
}

/// Payments the backend reports as failed
pub async fn api_declined_payments(State(state): State<AppState>) -> Json<Vec<Payment>> {
    Json(state.store.snapshot().await.declined_payments.clone())
}

/// Send a declined payment back to pending
pub async fn api_retry_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Payment>> {
    let payment = state.refunds.retry_payment(&state.store, &id).await?;
    Ok(Json(payment))
}
