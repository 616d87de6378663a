//! JSON API server for the club finance admin
//!
//! Routes are organized into modules:
//! - routes::transactions: ledger list, create and edit
//! - routes::payments: payments, declined payments, retry
//! - routes::refunds: refund submission
//! - routes::invoices: invoice list, create and edit
//! - routes::stats: derived and backend-reported statistics

pub mod error;
pub mod routes;

use anyhow::Context;
use axum::{
    extract::State,
    http::Uri,
    routing::{get, post, put},
    Json, Router,
};
use clubledger_config::Config;
use clubledger_core::{RecordStore, RefundProcessor};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub use error::{ApiError, ApiResult};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub refunds: Arc<RefundProcessor>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, store: Arc<RecordStore>) -> Self {
        Self {
            store,
            refunds: Arc::new(RefundProcessor::new()),
            config,
        }
    }

    /// Invoice tax rate in percent
    pub fn tax_rate(&self) -> Decimal {
        Decimal::from(self.config.finance.tax_rate_percent)
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::invoices::{api_create_invoice, api_invoices, api_update_invoice};
    use routes::payments::{api_declined_payments, api_payments, api_retry_payment};
    use routes::refunds::api_create_refund;
    use routes::stats::{api_server_stats, api_stats};
    use routes::transactions::{api_create_transaction, api_transactions, api_update_transaction};

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/finance/stats", get(api_stats))
        .route("/api/finance/server-stats", get(api_server_stats))
        .route("/api/finance/transactions", get(api_transactions).post(api_create_transaction))
        .route("/api/finance/transactions/:id", put(api_update_transaction))
        .route("/api/finance/payments", get(api_payments))
        .route("/api/finance/payments/declined", get(api_declined_payments))
        .route("/api/finance/payments/:id/retry", post(api_retry_payment))
        .route("/api/finance/refunds", post(api_create_refund))
        .route("/api/finance/invoices", get(api_invoices).post(api_create_invoice))
        .route("/api/finance/invoices/:id", put(api_update_invoice))
        .route("/api/finance/reload", post(api_reload))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound { resource: uri.path().to_string() }
}

/// Reload summary
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadResponse {
    pub success: bool,
    pub transactions: usize,
    pub payments: usize,
    pub declined_payments: usize,
    pub invoices: usize,
}

/// Re-fetch every collection from the backend
async fn api_reload(State(state): State<AppState>) -> ApiResult<Json<ReloadResponse>> {
    let snapshot = state.store.refresh().await?;
    Ok(Json(ReloadResponse {
        success: true,
        transactions: snapshot.transactions.len(),
        payments: snapshot.payments.len(),
        declined_payments: snapshot.declined_payments.len(),
        invoices: snapshot.invoices.len(),
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}

/// Start the HTTP server
///
/// Binds to the configured address and serves until Ctrl-C.
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind_address();
    let router = create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    log::info!("Finance API listening on http://{}", addr);
    log::info!("  - /api/finance/stats (dashboard figures)");
    log::info!("  - /api/finance/transactions, /payments, /invoices (records)");
    log::info!("  - /api/finance/refunds (refund workflow)");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    log::info!("Server stopped gracefully");
    Ok(())
}
