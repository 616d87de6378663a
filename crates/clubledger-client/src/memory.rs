//! In-memory [`FinanceBackend`] serving records from a JSON fixture.
//!
//! Behaves like the backend of record for everything the engine relies on:
//! it assigns ids, enforces the refundable remainder on refunds, honours
//! idempotency keys and answers the payment stats endpoint.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::error::{ClientError, ClientResult};
use crate::models::{BackendPaymentStats, Invoice, Payment, PaymentRefund, Transaction};
use crate::types::PaymentStatus;
use crate::FinanceBackend;

/// Fixture file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
}

#[derive(Debug, Default)]
struct State {
    fixture: Fixture,
    processed_refunds: HashSet<String>,
    failing: HashSet<String>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
    session_expired: AtomicBool,
    requests: AtomicUsize,
    refund_requests: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            state: Mutex::new(State { fixture, ..State::default() }),
            ..Self::default()
        }
    }

    /// Load a fixture from a JSON file
    pub async fn from_fixture_file(path: impl AsRef<Path>) -> ClientResult<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let fixture: Fixture = serde_json::from_str(&content)?;
        log::info!(
            "Loaded fixture {}: {} transactions, {} payments, {} invoices",
            path.as_ref().display(),
            fixture.transactions.len(),
            fixture.payments.len(),
            fixture.invoices.len()
        );
        Ok(Self::new(fixture))
    }

    /// Make every request to `endpoint` (e.g. "/invoices") fail with a 500
    pub async fn fail_endpoint(&self, endpoint: &str) {
        self.state.lock().await.failing.insert(endpoint.to_string());
    }

    /// Answer every request with 401 from now on
    pub fn expire_session(&self) {
        self.session_expired.store(true, Ordering::SeqCst);
    }

    /// Total number of requests received
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of refund requests received
    pub fn refund_request_count(&self) -> usize {
        self.refund_requests.load(Ordering::SeqCst)
    }

    /// Copy of the current server-side records
    pub async fn fixture(&self) -> Fixture {
        self.state.lock().await.fixture.clone()
    }

    fn check(&self, state: &State, endpoint: &str) -> ClientResult<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.session_expired.load(Ordering::SeqCst) {
            return Err(ClientError::Unauthorized);
        }
        if state.failing.contains(endpoint) {
            return Err(ClientError::Backend {
                status: 500,
                message: format!("{} is unavailable", endpoint),
            });
        }
        Ok(())
    }
}

fn rejected(message: impl Into<String>) -> ClientError {
    ClientError::Backend { status: 400, message: message.into() }
}

#[async_trait]
impl FinanceBackend for InMemoryBackend {
    async fn list_transactions(&self) -> ClientResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        self.check(&state, "/financial-transactions")?;
        Ok(state.fixture.transactions.clone())
    }

    async fn create_transaction(&self, transaction: &Transaction) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        self.check(&state, "/financial-transactions")?;
        let mut transaction = transaction.clone();
        if transaction.id.is_empty() {
            transaction.id = state.next_id("txn");
        }
        state.fixture.transactions.push(transaction);
        Ok(())
    }

    async fn update_transaction(&self, id: &str, transaction: &Transaction) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        self.check(&state, "/financial-transactions")?;
        let existing = state
            .fixture
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ClientError::NotFound { resource: format!("/financial-transactions/{}", id) })?;
        *existing = Transaction { id: id.to_string(), ..transaction.clone() };
        Ok(())
    }

    async fn list_payments(&self, status: Option<PaymentStatus>) -> ClientResult<Vec<Payment>> {
        let state = self.state.lock().await;
        self.check(&state, "/payments")?;
        Ok(state
            .fixture
            .payments
            .iter()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect())
    }

    async fn payment_stats(&self) -> ClientResult<BackendPaymentStats> {
        let state = self.state.lock().await;
        self.check(&state, "/payments/stats")?;

        let today = Utc::now().date_naive();
        let payments = &state.fixture.payments;
        let completed = payments.iter().filter(|p| p.status == PaymentStatus::Completed);
        let completed_today: Vec<&Payment> = completed
            .clone()
            .filter(|p| p.payment_date_naive() == Some(today))
            .collect();

        Ok(BackendPaymentStats {
            total_revenue: completed.map(|p| p.amount).sum(),
            today_revenue: completed_today.iter().map(|p| p.amount).sum(),
            total_payments: payments.len() as u64,
            today_payments: completed_today.len() as u64,
            pending_payments: payments.iter().filter(|p| p.status == PaymentStatus::Pending).count() as u64,
            failed_payments: payments.iter().filter(|p| p.status == PaymentStatus::Failed).count() as u64,
            extra: serde_json::Map::new(),
        })
    }

    async fn refund_payment(&self, id: &str, refund: &PaymentRefund) -> ClientResult<()> {
        self.refund_requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        self.check(&state, "/payments")?;

        if state.processed_refunds.contains(&refund.request_id) {
            log::debug!("Refund {} already applied", refund.request_id);
            return Ok(());
        }

        let payment = state
            .fixture
            .payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ClientError::NotFound { resource: format!("/payments/{}", id) })?;

        if refund.amount <= Decimal::ZERO {
            return Err(rejected("Refund amount must be positive"));
        }
        if !payment.status.is_refundable() {
            return Err(rejected(format!("Payment with status {} cannot be refunded", payment.status)));
        }
        if refund.amount > payment.refundable_remainder() {
            return Err(rejected(format!(
                "Refund amount {} exceeds remaining amount {}",
                refund.amount,
                payment.refundable_remainder()
            )));
        }

        let refunded = payment.refund_amount + refund.amount;
        payment.status = payment.status_for_refunded(refunded);
        payment.refund_amount = refunded;
        state.processed_refunds.insert(refund.request_id.clone());
        Ok(())
    }

    async fn update_payment_status(&self, id: &str, status: PaymentStatus) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        self.check(&state, "/payments")?;
        let payment = state
            .fixture
            .payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ClientError::NotFound { resource: format!("/payments/{}", id) })?;
        payment.status = status;
        Ok(())
    }

    async fn list_invoices(&self) -> ClientResult<Vec<Invoice>> {
        let state = self.state.lock().await;
        self.check(&state, "/invoices")?;
        Ok(state.fixture.invoices.clone())
    }

    async fn create_invoice(&self, invoice: &Invoice) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        self.check(&state, "/invoices")?;
        if state.fixture.invoices.iter().any(|i| i.invoice_number == invoice.invoice_number) {
            return Err(rejected(format!("Invoice number {} already exists", invoice.invoice_number)));
        }
        let mut invoice = invoice.clone();
        if invoice.id.is_empty() {
            invoice.id = state.next_id("inv");
        }
        state.fixture.invoices.push(invoice);
        Ok(())
    }

    async fn update_invoice(&self, id: &str, invoice: &Invoice) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        self.check(&state, "/invoices")?;
        let existing = state
            .fixture
            .invoices
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| ClientError::NotFound { resource: format!("/invoices/{}", id) })?;
        *existing = Invoice { id: id.to_string(), ..invoice.clone() };
        Ok(())
    }
}
