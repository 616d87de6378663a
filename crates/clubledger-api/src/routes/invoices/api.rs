//! Invoices API endpoints
//!
//! Submitted totals are ignored; they are recomputed from the items with the
//! configured tax rate.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clubledger_client::{Invoice, InvoiceStatus};
use clubledger_core::{InvoiceComposer, InvoiceFilter, RecordFilter};
use std::collections::HashMap;

use crate::routes::{parse_param, text_param};
use crate::{ApiResult, AppState};

/// Get invoices filtered by `status` and `q` (JSON API)
pub async fn api_invoices(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Vec<Invoice>>> {
    let filter = InvoiceFilter {
        status: parse_param::<InvoiceStatus>("status", params.get("status").map(String::as_str))?,
        search: text_param(params.get("q")),
    };
    let snapshot = state.store.snapshot().await;
    Ok(Json(filter.apply(&snapshot.invoices)))
}

pub async fn api_create_invoice(
    State(state): State<AppState>,
    Json(draft): Json<Invoice>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let composer = InvoiceComposer::from_draft(draft, state.tax_rate());
    let created = composer.submit(&state.store).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn api_update_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<Invoice>,
) -> ApiResult<Json<Invoice>> {
    let mut draft = Invoice { id, ..draft };
    if draft.invoice_number.trim().is_empty() {
        if let Some(existing) = state.store.snapshot().await.invoice(&draft.id) {
            draft.invoice_number = existing.invoice_number.clone();
        }
    }
    let updated = InvoiceComposer::from_invoice(&draft, state.tax_rate())
        .submit(&state.store)
        .await?;
    Ok(Json(updated))
}
