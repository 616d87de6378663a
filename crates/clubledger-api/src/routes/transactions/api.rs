//! Transactions API endpoints
//!
//! Endpoints:
//! - api_transactions: filtered, paginated ledger (JSON)
//! - api_create_transaction: record a new entry
//! - api_update_transaction: replace an entry by id

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use clubledger_client::{Category, Transaction, TransactionStatus, TransactionType};
use clubledger_core::{RecordFilter, TransactionEditor, TransactionFilter};
use serde::Serialize;
use std::collections::HashMap;

use crate::routes::time::resolve_range;
use crate::routes::{parse_param, text_param};
use crate::{ApiResult, AppState};

const DEFAULT_LIMIT: usize = 50;

/// Transactions list response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub transactions: Vec<Transaction>,
    pub total_count: usize,
    pub offset: usize,
    pub limit: usize,
    /// Human-readable date window applied
    pub range: String,
}

/// Build a ledger filter from `q`, `type`, `category`, `status`, `range`, `from`, `to`
fn filter_from_params(state: &AppState, params: &HashMap<String, String>) -> ApiResult<TransactionFilter> {
    let get = |key: &str| params.get(key).map(String::as_str);
    let date_range = resolve_range(
        get("range"),
        get("from"),
        get("to"),
        state.config.finance.default_range,
        Utc::now().date_naive(),
    )?;

    Ok(TransactionFilter {
        search: text_param(params.get("q")),
        transaction_type: parse_param::<TransactionType>("type", get("type"))?,
        category: text_param(params.get("category")).map(|c| Category::from(c.as_str())),
        status: parse_param::<TransactionStatus>("status", get("status"))?,
        date_range,
    })
}

/// Get transactions, newest first (JSON API)
pub async fn api_transactions(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<TransactionsResponse>> {
    let filter = filter_from_params(&state, &params)?;
    let limit = params.get("limit").and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_LIMIT);
    let offset = params.get("offset").and_then(|s| s.parse().ok()).unwrap_or(0);

    let snapshot = state.store.snapshot().await;
    let matching = filter.apply(&snapshot.transactions);
    let total_count = matching.len();

    Ok(Json(TransactionsResponse {
        transactions: matching.into_iter().skip(offset).take(limit).collect(),
        total_count,
        offset,
        limit,
        range: filter.date_range.description(),
    }))
}

/// Record a new ledger entry
pub async fn api_create_transaction(
    State(state): State<AppState>,
    Json(draft): Json<Transaction>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    let created = TransactionEditor::from_draft(draft).submit(&state.store).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Replace a ledger entry
pub async fn api_update_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<Transaction>,
) -> ApiResult<Json<Transaction>> {
    let updated = TransactionEditor::edit(id, draft).submit(&state.store).await?;
    Ok(Json(updated))
}
