//! Snapshot store over the backend of record

use chrono::{DateTime, Utc};
use clubledger_client::{
    BackendPaymentStats, BackendRef, ClientError, ClientResult, Invoice, Payment, PaymentStatus,
    Transaction,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::stats::{compute_stats, StatsSnapshot};

/// Immutable view of the fetched collections
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSnapshot {
    pub transactions: Vec<Transaction>,
    pub payments: Vec<Payment>,
    pub invoices: Vec<Invoice>,
    /// Payments the backend reports as failed
    pub declined_payments: Vec<Payment>,
    pub backend_stats: Option<BackendPaymentStats>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl RecordSnapshot {
    pub fn payment(&self, id: &str) -> Option<&Payment> {
        self.payments
            .iter()
            .chain(self.declined_payments.iter())
            .find(|p| p.id == id)
    }

    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn invoice(&self, id: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|i| i.id == id)
    }

    pub fn stats(&self) -> StatsSnapshot {
        compute_stats(&self.transactions, &self.payments, &self.invoices)
            .with_backend_stats(self.backend_stats.clone())
    }
}

/// Clears the loading flag when a refresh finishes or is dropped
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Outcome of one fetch during a refresh
struct Fetched<T> {
    value: T,
    unauthorized: bool,
}

/// Degrade a failed fetch to `fallback`, remembering a lost session
fn settle<T>(what: &str, result: ClientResult<T>, fallback: T) -> Fetched<T> {
    match result {
        Ok(value) => Fetched { value, unauthorized: false },
        Err(ClientError::Unauthorized) => Fetched { value: fallback, unauthorized: true },
        Err(e) => {
            log::warn!("Failed to load {}: {}; showing none", what, e);
            Fetched { value: fallback, unauthorized: false }
        }
    }
}

/// Holds the latest snapshot and refreshes it on demand
pub struct RecordStore {
    backend: BackendRef,
    snapshot: RwLock<Arc<RecordSnapshot>>,
    loading: AtomicBool,
}

impl RecordStore {
    pub fn new(backend: BackendRef) -> Self {
        Self {
            backend,
            snapshot: RwLock::new(Arc::new(RecordSnapshot::default())),
            loading: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &BackendRef {
        &self.backend
    }

    /// Whether a refresh is in flight
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> Arc<RecordSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Statistics over the current snapshot
    pub async fn stats(&self) -> StatsSnapshot {
        self.snapshot().await.stats()
    }

    async fn publish(&self, snapshot: RecordSnapshot) -> Arc<RecordSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.snapshot.write().await = snapshot.clone();
        snapshot
    }

    /// Edit the latest snapshot under the write lock so concurrent partial
    /// refreshes never write back a collection another one just replaced
    async fn patch(&self, edit: impl FnOnce(&mut RecordSnapshot)) -> Arc<RecordSnapshot> {
        let mut current = self.snapshot.write().await;
        let mut next = (**current).clone();
        edit(&mut next);
        next.loaded_at = Some(Utc::now());
        let next = Arc::new(next);
        *current = next.clone();
        next
    }

    /// Drop every record after the session was rejected
    async fn expire(&self) -> CoreError {
        log::warn!("Backend session expired; clearing loaded records");
        self.publish(RecordSnapshot::default()).await;
        CoreError::Unauthorized
    }

    /// Fetch all collections concurrently and swap in a new snapshot.
    ///
    /// A collection whose fetch fails is shown as empty; a rejected session
    /// clears everything and is reported as [`CoreError::Unauthorized`].
    pub async fn refresh(&self) -> CoreResult<Arc<RecordSnapshot>> {
        let _loading = LoadingGuard::start(&self.loading);
        let backend = &self.backend;

        let (transactions, payments, declined, stats, invoices) = tokio::join!(
            backend.list_transactions(),
            backend.list_payments(None),
            backend.list_payments(Some(PaymentStatus::Failed)),
            backend.payment_stats(),
            backend.list_invoices(),
        );

        let transactions = settle("transactions", transactions, Vec::new());
        let payments = settle("payments", payments, Vec::new());
        let declined = settle("declined payments", declined, Vec::new());
        let stats = settle("payment stats", stats.map(Some), None);
        let invoices = settle("invoices", invoices, Vec::new());

        if transactions.unauthorized
            || payments.unauthorized
            || declined.unauthorized
            || stats.unauthorized
            || invoices.unauthorized
        {
            return Err(self.expire().await);
        }

        let snapshot = RecordSnapshot {
            transactions: transactions.value,
            payments: payments.value,
            invoices: invoices.value,
            declined_payments: declined.value,
            backend_stats: stats.value,
            loaded_at: Some(Utc::now()),
        };
        log::info!(
            "Loaded {} transactions, {} payments ({} declined), {} invoices",
            snapshot.transactions.len(),
            snapshot.payments.len(),
            snapshot.declined_payments.len(),
            snapshot.invoices.len()
        );

        Ok(self.publish(snapshot).await)
    }

    /// Re-fetch the ledger only
    pub async fn refresh_transactions(&self) -> CoreResult<Arc<RecordSnapshot>> {
        let _loading = LoadingGuard::start(&self.loading);
        let fetched = settle("transactions", self.backend.list_transactions().await, Vec::new());
        if fetched.unauthorized {
            return Err(self.expire().await);
        }

        Ok(self.patch(|snapshot| snapshot.transactions = fetched.value).await)
    }

    /// Re-fetch payments, declined payments and the backend stats
    pub async fn refresh_payments(&self) -> CoreResult<Arc<RecordSnapshot>> {
        let _loading = LoadingGuard::start(&self.loading);
        let backend = &self.backend;
        let (payments, declined, stats) = tokio::join!(
            backend.list_payments(None),
            backend.list_payments(Some(PaymentStatus::Failed)),
            backend.payment_stats(),
        );

        let payments = settle("payments", payments, Vec::new());
        let declined = settle("declined payments", declined, Vec::new());
        let stats = settle("payment stats", stats.map(Some), None);
        if payments.unauthorized || declined.unauthorized || stats.unauthorized {
            return Err(self.expire().await);
        }

        Ok(self
            .patch(|snapshot| {
                snapshot.payments = payments.value;
                snapshot.declined_payments = declined.value;
                snapshot.backend_stats = stats.value;
            })
            .await)
    }

    /// Re-fetch invoices only
    pub async fn refresh_invoices(&self) -> CoreResult<Arc<RecordSnapshot>> {
        let _loading = LoadingGuard::start(&self.loading);
        let fetched = settle("invoices", self.backend.list_invoices().await, Vec::new());
        if fetched.unauthorized {
            return Err(self.expire().await);
        }

        Ok(self.patch(|snapshot| snapshot.invoices = fetched.value).await)
    }
}
