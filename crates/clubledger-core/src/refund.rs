//! Refund workflow
//!
//! A refund either goes against a processed payment, in which case the
//! backend applies it and owns the refundable remainder, or is booked as a
//! free-standing ledger expense under Refunds. Both paths are validated
//! locally first, carry a client-generated idempotency key and are followed
//! by a full store refresh. Nothing here is ever retried automatically.

use chrono::Utc;
use clubledger_client::{
    Category, Payment, PaymentRefund, PaymentStatus, RefundMethod, RefundReason, Transaction,
    TransactionStatus, TransactionType,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::error::{CoreError, CoreResult, DefaultErrorLogger, ErrorContext, ErrorLogger};
use crate::store::RecordStore;

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Refund as entered by an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    /// Idempotency key chosen by the client; a resubmission must reuse it
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub target_payment_id: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Share of the payment being returned; informational only
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub refund_percentage: Option<Decimal>,
    pub reason_category: RefundReason,
    #[serde(default)]
    pub reason_text: String,
    #[serde(default)]
    pub refund_method: RefundMethod,
    #[serde(default)]
    pub processed_by: String,
    #[serde(default)]
    pub approved_by: String,
    #[serde(default)]
    pub notes: String,
}

impl RefundRequest {
    pub fn new(amount: Decimal, reason_category: RefundReason, reason_text: impl Into<String>) -> Self {
        Self {
            request_id: new_request_id(),
            target_payment_id: None,
            amount,
            refund_percentage: None,
            reason_category,
            reason_text: reason_text.into(),
            refund_method: RefundMethod::default(),
            processed_by: String::new(),
            approved_by: String::new(),
            notes: String::new(),
        }
    }

    pub fn for_payment(mut self, payment_id: impl Into<String>) -> Self {
        self.target_payment_id = Some(payment_id.into());
        self
    }

    pub fn with_percentage(mut self, percentage: Decimal) -> Self {
        self.refund_percentage = Some(percentage);
        self
    }

    pub fn with_method(mut self, method: RefundMethod) -> Self {
        self.refund_method = method;
        self
    }

    pub fn processed_by(mut self, name: impl Into<String>) -> Self {
        self.processed_by = name.into();
        self
    }

    pub fn approved_by(mut self, name: impl Into<String>) -> Self {
        self.approved_by = name.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Field checks that do not depend on a payment
    pub fn validate(&self) -> CoreResult<()> {
        if self.request_id.trim().is_empty() {
            return Err(CoreError::validation("requestId", "must not be empty"));
        }
        if self.amount <= Decimal::ZERO {
            return Err(CoreError::validation("amount", "must be greater than zero"));
        }
        if self.reason_text.trim().is_empty() {
            return Err(CoreError::validation("reasonText", "a reason is required"));
        }
        if let Some(percentage) = self.refund_percentage {
            if percentage < Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
                return Err(CoreError::validation("refundPercentage", "must be between 0 and 100"));
            }
        }
        Ok(())
    }

    /// Check the request against the payment it targets
    pub fn validate_against(&self, payment: &Payment) -> CoreResult<()> {
        if let Some(target) = self.target_payment_id.as_deref() {
            if target != payment.id {
                return Err(CoreError::validation(
                    "targetPaymentId",
                    format!("does not match payment {}", payment.id),
                ));
            }
        }
        if !payment.status.is_refundable() {
            return Err(CoreError::InvalidTransition {
                from: payment.status,
                to: PaymentStatus::Refunded,
            });
        }
        let remaining = payment.refundable_remainder();
        if self.amount > remaining {
            return Err(CoreError::RefundExceedsRemainder {
                requested: self.amount,
                remaining,
            });
        }
        Ok(())
    }

    /// Reason text sent to the backend
    pub fn backend_reason(&self) -> String {
        format!("{}: {}", self.reason_category.label(), self.reason_text.trim())
    }

    /// Notes for a free-standing ledger refund
    pub fn ledger_notes(&self) -> String {
        let mut lines = vec![
            format!("Reason: {}", self.reason_category.label()),
            format!("Details: {}", self.reason_text.trim()),
            format!("Method: {}", self.refund_method.label()),
        ];
        if let Some(percentage) = self.refund_percentage {
            lines.push(format!("Percentage: {}%", percentage.normalize()));
        }
        if !self.processed_by.trim().is_empty() {
            lines.push(format!("Processed by: {}", self.processed_by.trim()));
        }
        if !self.approved_by.trim().is_empty() {
            lines.push(format!("Approved by: {}", self.approved_by.trim()));
        }
        if !self.notes.trim().is_empty() {
            lines.push(format!("Notes: {}", self.notes.trim()));
        }
        lines.join("\n")
    }

    /// Ledger expense recording a refund that has no payment behind it
    pub fn ledger_entry(&self, date: &str) -> Transaction {
        Transaction {
            id: String::new(),
            transaction_type: TransactionType::Expense,
            category: Category::Refunds,
            amount: self.amount,
            description: format!("Refund: {}", self.reason_text.trim()),
            payer: None,
            payee: None,
            payment_method: self.refund_method.ledger_method(),
            reference: Some(self.request_id.clone()),
            date: date.to_string(),
            status: TransactionStatus::Completed,
            notes: self.ledger_notes(),
        }
    }
}

/// What a successful refund did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RefundOutcome {
    #[serde(rename_all = "camelCase")]
    PaymentRefunded {
        request_id: String,
        payment_id: String,
        #[serde(with = "rust_decimal::serde::float")]
        amount: Decimal,
        /// As reported by the backend after the refresh
        status: PaymentStatus,
        #[serde(with = "rust_decimal::serde::float")]
        refund_amount: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    LedgerEntryCreated {
        request_id: String,
        transaction: Transaction,
    },
}

/// How many applied request ids are remembered
const APPLIED_WINDOW: usize = 1024;

/// Request ids being submitted, plus the most recently applied ones
#[derive(Debug, Default)]
struct RequestLog {
    in_flight: HashSet<String>,
    applied: VecDeque<String>,
}

impl RequestLog {
    fn is_known(&self, request_id: &str) -> bool {
        self.in_flight.contains(request_id) || self.applied.iter().any(|id| id == request_id)
    }

    fn mark_applied(&mut self, request_id: &str) {
        self.applied.push_back(request_id.to_string());
        while self.applied.len() > APPLIED_WINDOW {
            self.applied.pop_front();
        }
    }
}

/// Removes a request id from the in-flight set when dropped
struct InFlight<'a> {
    log: &'a Mutex<RequestLog>,
    request_id: String,
}

impl InFlight<'_> {
    /// Remember the request once the backend has accepted it
    fn applied(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.mark_applied(&self.request_id);
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.in_flight.remove(&self.request_id);
        }
    }
}

/// Executes refunds and payment retries against the backend
#[derive(Default)]
pub struct RefundProcessor {
    requests: Mutex<RequestLog>,
    logger: DefaultErrorLogger,
}

impl RefundProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refunds currently being submitted
    pub fn in_flight_count(&self) -> usize {
        self.requests.lock().map(|log| log.in_flight.len()).unwrap_or(0)
    }

    fn begin(&self, request_id: &str) -> CoreResult<InFlight<'_>> {
        let mut log = self.requests.lock().map_err(|_| CoreError::InternalError {
            message: "refund guard poisoned".to_string(),
        })?;
        if log.is_known(request_id) {
            return Err(CoreError::DuplicateSubmission {
                request_id: request_id.to_string(),
            });
        }
        log.in_flight.insert(request_id.to_string());
        Ok(InFlight {
            log: &self.requests,
            request_id: request_id.to_string(),
        })
    }

    fn reject(&self, error: CoreError, context: ErrorContext) -> CoreError {
        self.logger.log_error(&error, &context);
        error
    }

    /// Validate and execute a refund, then refresh the store.
    ///
    /// With a payment the amount must fit the refundable remainder; nothing
    /// reaches the backend when it does not.
    pub async fn request_refund(
        &self,
        store: &RecordStore,
        payment: Option<&Payment>,
        request: &RefundRequest,
    ) -> CoreResult<RefundOutcome> {
        let context = ErrorContext::new("refund").with_request_id(request.request_id.clone());

        request.validate().map_err(|e| self.reject(e, context.clone()))?;
        if let Some(payment) = payment {
            request
                .validate_against(payment)
                .map_err(|e| self.reject(e, context.clone()))?;
        }

        let guard = self
            .begin(&request.request_id)
            .map_err(|e| self.reject(e, context.clone()))?;

        match payment {
            Some(payment) => {
                let body = PaymentRefund {
                    amount: request.amount,
                    reason: request.backend_reason(),
                    request_id: request.request_id.clone(),
                };
                store
                    .backend()
                    .refund_payment(&payment.id, &body)
                    .await
                    .map_err(|e| self.reject(e.into(), context.clone()))?;
                guard.applied();
                log::info!(
                    "Refunded {} on payment {} (request {})",
                    request.amount, payment.id, request.request_id
                );

                let refreshed = match store.refresh().await {
                    Ok(snapshot) => snapshot.payment(&payment.id).map(|p| (p.status, p.refund_amount)),
                    Err(e) => {
                        log::warn!("Refund {} applied but reload failed: {}", request.request_id, e);
                        None
                    }
                };
                let (status, refund_amount) = refreshed.unwrap_or_else(|| {
                    let refunded = payment.refund_amount + request.amount;
                    (payment.status_for_refunded(refunded), refunded)
                });

                Ok(RefundOutcome::PaymentRefunded {
                    request_id: request.request_id.clone(),
                    payment_id: payment.id.clone(),
                    amount: request.amount,
                    status,
                    refund_amount,
                })
            }
            None => {
                let entry = request.ledger_entry(&Utc::now().date_naive().to_string());
                store
                    .backend()
                    .create_transaction(&entry)
                    .await
                    .map_err(|e| self.reject(e.into(), context.clone()))?;
                guard.applied();
                log::info!(
                    "Recorded refund of {} as a ledger expense (request {})",
                    request.amount, request.request_id
                );

                if let Err(e) = store.refresh().await {
                    log::warn!("Refund {} recorded but reload failed: {}", request.request_id, e);
                }
                Ok(RefundOutcome::LedgerEntryCreated {
                    request_id: request.request_id.clone(),
                    transaction: entry,
                })
            }
        }
    }

    /// Resolve `target_payment_id` against the current snapshot, then refund
    pub async fn submit(&self, store: &RecordStore, request: &RefundRequest) -> CoreResult<RefundOutcome> {
        request.validate()?;
        match request.target_payment_id.as_deref() {
            Some(payment_id) => {
                let snapshot = store.snapshot().await;
                let payment = snapshot.payment(payment_id).ok_or_else(|| CoreError::NotFound {
                    resource: format!("payment {}", payment_id),
                })?;
                self.request_refund(store, Some(payment), request).await
            }
            None => self.request_refund(store, None, request).await,
        }
    }

    /// Put a declined payment back to pending so it is processed again
    pub async fn retry_payment(&self, store: &RecordStore, payment_id: &str) -> CoreResult<Payment> {
        let context = ErrorContext::new("retry payment");
        let snapshot = store.snapshot().await;
        let payment = snapshot.payment(payment_id).ok_or_else(|| {
            self.reject(
                CoreError::NotFound { resource: format!("payment {}", payment_id) },
                context.clone(),
            )
        })?;

        if !payment.status.can_transition_to(PaymentStatus::Pending) {
            return Err(self.reject(
                CoreError::InvalidTransition {
                    from: payment.status,
                    to: PaymentStatus::Pending,
                },
                context,
            ));
        }

        store
            .backend()
            .update_payment_status(payment_id, PaymentStatus::Pending)
            .await
            .map_err(|e| self.reject(e.into(), context.clone()))?;
        log::info!("Payment {} queued for retry", payment_id);

        let snapshot = store.refresh_payments().await?;
        Ok(snapshot
            .payment(payment_id)
            .cloned()
            .unwrap_or_else(|| Payment {
                status: PaymentStatus::Pending,
                ..payment.clone()
            }))
    }
}
