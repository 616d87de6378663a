//! REST client for the club finance backend
//!
//! Defines the finance records exchanged with the backend of record, the
//! [`FinanceBackend`] trait the engine talks to, an HTTP implementation on
//! top of reqwest and an in-memory implementation used for offline fixtures.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub mod error;
pub mod types;
pub mod models;
pub mod http;
pub mod memory;

pub use error::{ClientError, ClientResult};
pub use http::HttpBackend;
pub use memory::InMemoryBackend;

pub use types::{
    Category, InvoiceStatus, PaymentMethod, PaymentStatus, RefundMethod, RefundReason,
    TransactionStatus, TransactionType,
};
pub use models::{
    parse_record_date, BackendPaymentStats, Invoice, InvoiceItem, Payment, PaymentRefund,
    Transaction,
};

/// Backend reference type
pub type BackendRef = Arc<dyn FinanceBackend>;

/// Operations the finance engine needs from the backend of record.
///
/// Implementations never retry on their own; every call maps to exactly one
/// request so money-moving operations cannot be replayed silently.
#[async_trait]
pub trait FinanceBackend: Send + Sync {
    /// `GET /financial-transactions`
    async fn list_transactions(&self) -> ClientResult<Vec<Transaction>>;

    /// `POST /financial-transactions`
    async fn create_transaction(&self, transaction: &Transaction) -> ClientResult<()>;

    /// `PUT /financial-transactions/:id`
    async fn update_transaction(&self, id: &str, transaction: &Transaction) -> ClientResult<()>;

    /// `GET /payments[?status=]`
    async fn list_payments(&self, status: Option<PaymentStatus>) -> ClientResult<Vec<Payment>>;

    /// `GET /payments/stats`
    async fn payment_stats(&self) -> ClientResult<BackendPaymentStats>;

    /// `POST /payments/:id/refund`; the backend enforces the refundable remainder
    async fn refund_payment(&self, id: &str, refund: &PaymentRefund) -> ClientResult<()>;

    /// `PUT /payments/:id` with a new status
    async fn update_payment_status(&self, id: &str, status: PaymentStatus) -> ClientResult<()>;

    /// `GET /invoices`
    async fn list_invoices(&self) -> ClientResult<Vec<Invoice>>;

    /// `POST /invoices`
    async fn create_invoice(&self, invoice: &Invoice) -> ClientResult<()>;

    /// `PUT /invoices/:id`
    async fn update_invoice(&self, id: &str, invoice: &Invoice) -> ClientResult<()>;
}

/// Decode a list response that is either a bare array or an object wrapping
/// the array under `key` (or `data`)
pub fn decode_collection<T: DeserializeOwned>(value: serde_json::Value, key: &str) -> ClientResult<Vec<T>> {
    match value {
        serde_json::Value::Array(_) => Ok(serde_json::from_value(value)?),
        serde_json::Value::Object(mut map) => {
            let inner = map
                .remove(key)
                .or_else(|| map.remove("data"))
                .ok_or_else(|| ClientError::Decode {
                    message: format!("expected an array or an object with '{}'", key),
                })?;
            Ok(serde_json::from_value(inner)?)
        }
        other => Err(ClientError::Decode {
            message: format!("expected an array or an object, got {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_bare_array() {
        let values: Vec<u32> = decode_collection(json!([1, 2, 3]), "transactions").unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_wrapped_array() {
        let values: Vec<u32> = decode_collection(json!({"transactions": [4], "total": 1}), "transactions").unwrap();
        assert_eq!(values, vec![4]);

        let values: Vec<u32> = decode_collection(json!({"data": [5]}), "payments").unwrap();
        assert_eq!(values, vec![5]);
    }

    #[test]
    fn test_decode_rejects_other_shapes() {
        let err = decode_collection::<u32>(json!({"items": []}), "invoices").unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
        assert!(decode_collection::<u32>(json!("nope"), "invoices").is_err());
    }
}
