//! Finance records as exchanged with the backend

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    Category, InvoiceStatus, PaymentMethod, PaymentStatus, TransactionStatus, TransactionType,
};

/// Parse the calendar date at the start of an ISO-8601 date or datetime string
pub fn parse_record_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let head = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Backend identifier; empty until the backend assigns one
    #[serde(alias = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: Category,
    /// Always positive; the sign is implied by `transaction_type`
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payee: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// ISO-8601 date or datetime
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default)]
    pub notes: String,
}

impl Transaction {
    /// Get the transaction date as NaiveDate
    pub fn date_naive(&self) -> Option<NaiveDate> {
        parse_record_date(&self.date)
    }

    pub fn is_income(&self) -> bool {
        self.transaction_type == TransactionType::Income
    }

    pub fn is_expense(&self) -> bool {
        self.transaction_type == TransactionType::Expense
    }

    /// Amount with the sign implied by the entry type
    pub fn signed_amount(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }

    /// Refunded entries and entries booked under Refunds
    pub fn counts_as_refund(&self) -> bool {
        self.status == TransactionStatus::Refunded || self.category == Category::Refunds
    }
}

/// Externally processed payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub payer_name: String,
    #[serde(default)]
    pub payer_email: String,
    #[serde(default)]
    pub payer_phone: String,
    /// Free-form purpose, e.g. "Registration" or "Tournament"
    #[serde(default)]
    pub payment_type: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub refund_amount: Decimal,
    pub status: PaymentStatus,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub payment_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_last_four: Option<String>,
}

impl Payment {
    /// Amount that can still be refunded
    pub fn refundable_remainder(&self) -> Decimal {
        (self.amount - self.refund_amount).max(Decimal::ZERO)
    }

    pub fn payment_date_naive(&self) -> Option<NaiveDate> {
        parse_record_date(&self.payment_date)
    }

    /// Status the payment ends in once `refund_amount` totals `refunded`
    pub fn status_for_refunded(&self, refunded: Decimal) -> PaymentStatus {
        if refunded >= self.amount {
            PaymentStatus::Refunded
        } else if refunded > Decimal::ZERO {
            PaymentStatus::PartiallyRefunded
        } else {
            self.status
        }
    }

    /// Check `0 <= refundAmount <= amount` and that the status agrees with it
    pub fn is_consistent(&self) -> bool {
        if self.refund_amount < Decimal::ZERO || self.refund_amount > self.amount {
            return false;
        }
        let fully = self.refund_amount == self.amount && self.amount > Decimal::ZERO;
        let partially = self.refund_amount > Decimal::ZERO && self.refund_amount < self.amount;
        (self.status == PaymentStatus::Refunded) == fully
            && (self.status == PaymentStatus::PartiallyRefunded) == partially
    }
}

/// Invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    /// quantity × unit price
    #[serde(default, with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

impl InvoiceItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            amount: quantity * unit_price,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

/// Billing document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(alias = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Generated when empty
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub payment_terms: String,
    #[serde(default)]
    pub notes: String,
}

impl Invoice {
    pub fn due_date_naive(&self) -> Option<NaiveDate> {
        parse_record_date(&self.due_date)
    }
}

/// Body of `POST /payments/:id/refund`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRefund {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub reason: String,
    /// Client-generated idempotency key
    pub request_id: String,
}

/// Aggregate snapshot served by `GET /payments/stats`.
///
/// The backend owns these counters; they are displayed as-is and never
/// merged into the locally derived statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendPaymentStats {
    #[serde(default, with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub today_revenue: Decimal,
    #[serde(default)]
    pub total_payments: u64,
    #[serde(default)]
    pub today_payments: u64,
    #[serde(default)]
    pub pending_payments: u64,
    #[serde(default)]
    pub failed_payments: u64,
    /// Anything else the backend reports
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn payment(amount: &str, refunded: &str, status: PaymentStatus) -> Payment {
        Payment {
            id: "p1".to_string(),
            payer_name: "Jo Smith".to_string(),
            payer_email: "jo@example.com".to_string(),
            payer_phone: String::new(),
            payment_type: "Registration".to_string(),
            payment_method: PaymentMethod::Card,
            amount: Decimal::from_str(amount).unwrap(),
            refund_amount: Decimal::from_str(refunded).unwrap(),
            status,
            transaction_id: "ext-1".to_string(),
            payment_date: "2024-05-01T10:00:00.000Z".to_string(),
            card_last_four: Some("4242".to_string()),
        }
    }

    #[test]
    fn test_parse_record_date() {
        assert_eq!(parse_record_date("2024-06-15"), NaiveDate::from_ymd_opt(2024, 6, 15));
        assert_eq!(
            parse_record_date("2024-06-15T23:10:00.000Z"),
            NaiveDate::from_ymd_opt(2024, 6, 15)
        );
        assert_eq!(parse_record_date("15/06/2024"), None);
        assert_eq!(parse_record_date(""), None);
    }

    #[test]
    fn test_transaction_from_backend_json() {
        let json = serde_json::json!({
            "_id": "65ab",
            "type": "expense",
            "category": "equipment",
            "amount": 40,
            "description": "Cones",
            "payee": "Sports Shop",
            "paymentMethod": "card",
            "date": "2024-06-15T00:00:00.000Z",
            "status": "completed"
        });
        let tx: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(tx.id, "65ab");
        assert_eq!(tx.category, Category::Equipment);
        assert_eq!(tx.amount, Decimal::from(40));
        assert_eq!(tx.signed_amount(), Decimal::from(-40));
        assert!(tx.payer.is_none());
        assert_eq!(tx.date_naive(), NaiveDate::from_ymd_opt(2024, 6, 15));
    }

    #[test]
    fn test_transaction_serializes_camel_case_numbers() {
        let tx = Transaction {
            id: String::new(),
            transaction_type: TransactionType::Income,
            category: Category::Registration,
            amount: Decimal::from_str("100.50").unwrap(),
            description: "Spring registration".to_string(),
            payer: Some("Jo".to_string()),
            payee: None,
            payment_method: PaymentMethod::Cash,
            reference: None,
            date: "2024-03-01".to_string(),
            status: TransactionStatus::Completed,
            notes: String::new(),
        };
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["type"], "income");
        assert_eq!(value["paymentMethod"], "cash");
        assert_eq!(value["amount"], serde_json::json!(100.5));
        assert!(value.get("id").is_none());
        assert!(value.get("payee").is_none());
    }

    #[test]
    fn test_payment_amount_from_string() {
        let json = serde_json::json!({
            "id": "p9",
            "amount": "200.00",
            "status": "completed"
        });
        let payment: Payment = serde_json::from_value(json).unwrap();
        assert_eq!(payment.amount, Decimal::from(200));
        assert_eq!(payment.refund_amount, Decimal::ZERO);
        assert!(payment.is_consistent());
    }

    #[test]
    fn test_refundable_remainder() {
        assert_eq!(payment("200", "0", PaymentStatus::Completed).refundable_remainder(), Decimal::from(200));
        assert_eq!(
            payment("200", "50", PaymentStatus::PartiallyRefunded).refundable_remainder(),
            Decimal::from(150)
        );
        assert_eq!(payment("200", "200", PaymentStatus::Refunded).refundable_remainder(), Decimal::ZERO);
    }

    #[test]
    fn test_status_for_refunded() {
        let p = payment("200", "0", PaymentStatus::Completed);
        assert_eq!(p.status_for_refunded(Decimal::from(200)), PaymentStatus::Refunded);
        assert_eq!(p.status_for_refunded(Decimal::from(1)), PaymentStatus::PartiallyRefunded);
        assert_eq!(p.status_for_refunded(Decimal::ZERO), PaymentStatus::Completed);
    }

    #[test]
    fn test_payment_consistency() {
        assert!(payment("200", "0", PaymentStatus::Completed).is_consistent());
        assert!(payment("200", "50", PaymentStatus::PartiallyRefunded).is_consistent());
        assert!(payment("200", "200", PaymentStatus::Refunded).is_consistent());
        assert!(!payment("200", "250", PaymentStatus::Refunded).is_consistent());
        assert!(!payment("200", "200", PaymentStatus::PartiallyRefunded).is_consistent());
        assert!(!payment("200", "50", PaymentStatus::Completed).is_consistent());
    }

    #[test]
    fn test_backend_stats_keeps_unknown_fields() {
        let json = serde_json::json!({
            "totalRevenue": 1250.5,
            "todayPayments": 3,
            "monthlyRevenue": 800
        });
        let stats: BackendPaymentStats = serde_json::from_value(json).unwrap();
        assert_eq!(stats.total_revenue, Decimal::from_str("1250.5").unwrap());
        assert_eq!(stats.today_payments, 3);
        assert_eq!(stats.extra["monthlyRevenue"], serde_json::json!(800));
    }
}
