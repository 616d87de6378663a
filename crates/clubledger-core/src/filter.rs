//! Predicate filtering over fetched collections

use chrono::{Datelike, NaiveDate};
use clubledger_client::{
    Category, Invoice, InvoiceStatus, Payment, PaymentStatus, Transaction, TransactionStatus,
    TransactionType,
};
use clubledger_config::TimeRange;
use serde::{Deserialize, Serialize};

// ==================== Date Ranges ====================

/// Inclusive date window; an open bound matches everything on that side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Unbounded range
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Resolve a preset relative to `today`.
    ///
    /// `Custom` resolves to an unbounded range; callers supply the bounds
    /// with [`DateRange::between`].
    pub fn for_range(range: TimeRange, today: NaiveDate) -> Self {
        match range {
            TimeRange::Month => {
                let start = today.with_day(1).unwrap_or(today);
                Self::between(start, last_day_of_month(today.year(), today.month()).unwrap_or(today))
            }
            TimeRange::Quarter => {
                let first_month = (today.month0() / 3) * 3 + 1;
                let last_month = first_month + 2;
                match (
                    NaiveDate::from_ymd_opt(today.year(), first_month, 1),
                    last_day_of_month(today.year(), last_month),
                ) {
                    (Some(start), Some(end)) => Self::between(start, end),
                    _ => Self::all(),
                }
            }
            TimeRange::Year => match (
                NaiveDate::from_ymd_opt(today.year(), 1, 1),
                NaiveDate::from_ymd_opt(today.year(), 12, 31),
            ) {
                (Some(start), Some(end)) => Self::between(start, end),
                _ => Self::all(),
            },
            TimeRange::All | TimeRange::Custom => Self::all(),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Check if a date is within the range
    pub fn contains(&self, date: NaiveDate) -> bool {
        match (self.start, self.end) {
            (None, None) => true,
            (Some(s), None) => date >= s,
            (None, Some(e)) => date <= e,
            (Some(s), Some(e)) => date >= s && date <= e,
        }
    }

    /// Match a possibly unparsable record date.
    ///
    /// Records without a usable date only pass an unbounded range.
    pub fn matches(&self, date: Option<NaiveDate>) -> bool {
        match date {
            Some(date) => self.contains(date),
            None => self.is_unbounded(),
        }
    }

    /// Get a human-readable description of the range
    pub fn description(&self) -> String {
        match (self.start, self.end) {
            (None, None) => "All Time".to_string(),
            (Some(s), None) => format!("Since {}", s),
            (None, Some(e)) => format!("Until {}", e),
            (Some(s), Some(e)) => format!("{} to {}", s, e),
        }
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt())
}

// ==================== Record Filters ====================

/// Predicate over one kind of record
pub trait RecordFilter<T: Clone> {
    fn matches(&self, item: &T) -> bool;

    /// Matching records in collection order
    fn apply(&self, items: &[T]) -> Vec<T> {
        items.iter().filter(|item| self.matches(item)).cloned().collect()
    }
}

fn contains_text(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Lowercased, trimmed search text; `None` when there is nothing to search for
fn search_needle(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// Conjunction of ledger predicates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    /// Case-insensitive substring of description, payer, payee or reference
    pub search: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub category: Option<Category>,
    pub status: Option<TransactionStatus>,
    #[serde(default)]
    pub date_range: DateRange,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }
}

impl RecordFilter<Transaction> for TransactionFilter {
    fn matches(&self, tx: &Transaction) -> bool {
        if let Some(needle) = search_needle(&self.search) {
            let hit = contains_text(&tx.description, &needle)
                || tx.payer.as_deref().map_or(false, |p| contains_text(p, &needle))
                || tx.payee.as_deref().map_or(false, |p| contains_text(p, &needle))
                || tx.reference.as_deref().map_or(false, |r| contains_text(r, &needle));
            if !hit {
                return false;
            }
        }

        self.transaction_type.map_or(true, |t| tx.transaction_type == t)
            && self.category.as_ref().map_or(true, |c| &tx.category == c)
            && self.status.map_or(true, |s| tx.status == s)
            && self.date_range.matches(tx.date_naive())
    }

    /// Matching transactions, newest first; equal dates keep collection order
    fn apply(&self, items: &[Transaction]) -> Vec<Transaction> {
        let mut result: Vec<Transaction> =
            items.iter().filter(|tx| self.matches(tx)).cloned().collect();
        result.sort_by(|a, b| b.date_naive().cmp(&a.date_naive()));
        result
    }
}

/// Payment list predicates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    /// Case-insensitive exact payment type
    pub payment_type: Option<String>,
    /// Substring of payer name, payer email or transaction id
    pub search: Option<String>,
}

impl RecordFilter<Payment> for PaymentFilter {
    fn matches(&self, payment: &Payment) -> bool {
        if let Some(needle) = search_needle(&self.search) {
            let hit = contains_text(&payment.payer_name, &needle)
                || contains_text(&payment.payer_email, &needle)
                || contains_text(&payment.transaction_id, &needle);
            if !hit {
                return false;
            }
        }

        self.status.map_or(true, |s| payment.status == s)
            && self
                .payment_type
                .as_deref()
                .map_or(true, |t| payment.payment_type.eq_ignore_ascii_case(t.trim()))
    }
}

/// Invoice list predicates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    /// Substring of invoice number, customer name or customer email
    pub search: Option<String>,
}

impl RecordFilter<Invoice> for InvoiceFilter {
    fn matches(&self, invoice: &Invoice) -> bool {
        if let Some(needle) = search_needle(&self.search) {
            let hit = contains_text(&invoice.invoice_number, &needle)
                || contains_text(&invoice.customer_name, &needle)
                || contains_text(&invoice.customer_email, &needle);
            if !hit {
                return false;
            }
        }

        self.status.map_or(true, |s| invoice.status == s)
    }
}
