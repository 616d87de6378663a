//! Derived finance statistics
//!
//! Every figure is recomputed from a snapshot on request. Income, expenses,
//! net income and margin come from ledger transactions only; payment metrics
//! are reported in their own section and the backend's `/payments/stats`
//! snapshot is carried alongside without being merged into either.

use clubledger_client::{
    BackendPaymentStats, Invoice, InvoiceStatus, Payment, PaymentStatus, Transaction,
    TransactionStatus, TransactionType,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Share of `part` in `total` as a percentage with one decimal; 0 when `total` is 0
pub fn percentage(part: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    (part / total * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

fn count_percentage(part: usize, total: usize) -> Decimal {
    percentage(Decimal::from(part), Decimal::from(total))
}

/// Ledger figures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_expenses: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_income: Decimal,
    /// Net income over income, in percent
    #[serde(with = "rust_decimal::serde::float")]
    pub profit_margin: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub pending_income: Decimal,
    /// Refunded entries plus entries booked under Refunds
    #[serde(with = "rust_decimal::serde::float")]
    pub refunded_amount: Decimal,
    pub transaction_count: usize,
    pub completed_count: usize,
    pub pending_count: usize,
}

/// Payment processing figures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub total_payments: usize,
    pub completed_count: usize,
    pub pending_count: usize,
    pub failed_count: usize,
    pub refunded_count: usize,
    pub partially_refunded_count: usize,
    /// Sum over completed payments
    #[serde(with = "rust_decimal::serde::float")]
    pub total_payment_amount: Decimal,
    /// Sum of refund amounts over all payments
    #[serde(with = "rust_decimal::serde::float")]
    pub total_refunded_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub success_rate: Decimal,
    /// Fully and partially refunded payments over all payments
    #[serde(with = "rust_decimal::serde::float")]
    pub refund_rate: Decimal,
}

/// Invoice figures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    pub total_invoices: usize,
    /// Sum of totals over sent and overdue invoices
    #[serde(with = "rust_decimal::serde::float")]
    pub outstanding_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub paid_amount: Decimal,
    pub draft_count: usize,
    pub sent_count: usize,
    pub paid_count: usize,
    pub overdue_count: usize,
    pub cancelled_count: usize,
}

/// One bucket of a breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownBucket {
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
}

/// Grouped amounts; bucket amounts sum exactly to `total`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub buckets: Vec<BreakdownBucket>,
}

impl Breakdown {
    /// Group `(label, amount)` pairs; buckets are ordered by amount, largest first
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Decimal)>,
    {
        let mut groups: BTreeMap<String, (Decimal, usize)> = BTreeMap::new();
        for (label, amount) in entries {
            let entry = groups.entry(label).or_insert((Decimal::ZERO, 0));
            entry.0 += amount;
            entry.1 += 1;
        }

        let total: Decimal = groups.values().map(|(amount, _)| *amount).sum();
        let mut buckets: Vec<BreakdownBucket> = groups
            .into_iter()
            .map(|(category, (amount, count))| BreakdownBucket {
                category,
                amount,
                count,
                percentage: percentage(amount, total),
            })
            .collect();
        // BTreeMap order already breaks ties by name
        buckets.sort_by(|a, b| b.amount.cmp(&a.amount));

        Self { total, buckets }
    }

    pub fn bucket(&self, category: &str) -> Option<&BreakdownBucket> {
        self.buckets.iter().find(|b| b.category == category)
    }
}

/// Everything the dashboard shows, derived from one snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub transactions: TransactionSummary,
    pub payments: PaymentSummary,
    pub invoices: InvoiceSummary,
    pub expense_breakdown: Breakdown,
    pub income_breakdown: Breakdown,
    pub payment_type_breakdown: Breakdown,
    /// Backend-reported payment counters, shown verbatim
    pub backend: Option<BackendPaymentStats>,
}

impl StatsSnapshot {
    pub fn with_backend_stats(mut self, backend: Option<BackendPaymentStats>) -> Self {
        self.backend = backend;
        self
    }
}

fn is_completed(tx: &Transaction, kind: TransactionType) -> bool {
    tx.transaction_type == kind && tx.status == TransactionStatus::Completed
}

/// Ledger figures from transactions
pub fn summarize_transactions(transactions: &[Transaction]) -> TransactionSummary {
    let total_income: Decimal = transactions
        .iter()
        .filter(|t| is_completed(t, TransactionType::Income))
        .map(|t| t.amount)
        .sum();
    let total_expenses: Decimal = transactions
        .iter()
        .filter(|t| is_completed(t, TransactionType::Expense))
        .map(|t| t.amount)
        .sum();
    let net_income = total_income - total_expenses;

    TransactionSummary {
        total_income,
        total_expenses,
        net_income,
        profit_margin: percentage(net_income, total_income),
        pending_income: transactions
            .iter()
            .filter(|t| t.is_income() && t.status == TransactionStatus::Pending)
            .map(|t| t.amount)
            .sum(),
        refunded_amount: transactions
            .iter()
            .filter(|t| t.counts_as_refund())
            .map(|t| t.amount)
            .sum(),
        transaction_count: transactions.len(),
        completed_count: transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Completed)
            .count(),
        pending_count: transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Pending)
            .count(),
    }
}

/// Payment processing figures
pub fn summarize_payments(payments: &[Payment]) -> PaymentSummary {
    let count = |status: PaymentStatus| payments.iter().filter(|p| p.status == status).count();

    let total_payments = payments.len();
    let completed_count = count(PaymentStatus::Completed);
    let refunded_count = count(PaymentStatus::Refunded);
    let partially_refunded_count = count(PaymentStatus::PartiallyRefunded);

    PaymentSummary {
        total_payments,
        completed_count,
        pending_count: count(PaymentStatus::Pending),
        failed_count: count(PaymentStatus::Failed),
        refunded_count,
        partially_refunded_count,
        total_payment_amount: payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .map(|p| p.amount)
            .sum(),
        total_refunded_amount: payments.iter().map(|p| p.refund_amount).sum(),
        success_rate: count_percentage(completed_count, total_payments),
        refund_rate: count_percentage(refunded_count + partially_refunded_count, total_payments),
    }
}

/// Invoice figures
pub fn summarize_invoices(invoices: &[Invoice]) -> InvoiceSummary {
    let count = |status: InvoiceStatus| invoices.iter().filter(|i| i.status == status).count();

    InvoiceSummary {
        total_invoices: invoices.len(),
        outstanding_amount: invoices
            .iter()
            .filter(|i| i.status.is_outstanding())
            .map(|i| i.total)
            .sum(),
        paid_amount: invoices
            .iter()
            .filter(|i| i.status == InvoiceStatus::Paid)
            .map(|i| i.total)
            .sum(),
        draft_count: count(InvoiceStatus::Draft),
        sent_count: count(InvoiceStatus::Sent),
        paid_count: count(InvoiceStatus::Paid),
        overdue_count: count(InvoiceStatus::Overdue),
        cancelled_count: count(InvoiceStatus::Cancelled),
    }
}

fn category_breakdown(transactions: &[Transaction], kind: TransactionType) -> Breakdown {
    Breakdown::from_entries(
        transactions
            .iter()
            .filter(|t| is_completed(t, kind))
            .map(|t| (t.category.label().to_string(), t.amount)),
    )
}

fn payment_type_breakdown(payments: &[Payment]) -> Breakdown {
    Breakdown::from_entries(
        payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .map(|p| {
                let label = p.payment_type.trim();
                let label = if label.is_empty() { "Other" } else { label };
                (label.to_string(), p.amount)
            }),
    )
}

/// Compute all statistics from the given collections
pub fn compute_stats(transactions: &[Transaction], payments: &[Payment], invoices: &[Invoice]) -> StatsSnapshot {
    StatsSnapshot {
        transactions: summarize_transactions(transactions),
        payments: summarize_payments(payments),
        invoices: summarize_invoices(invoices),
        expense_breakdown: category_breakdown(transactions, TransactionType::Expense),
        income_breakdown: category_breakdown(transactions, TransactionType::Income),
        payment_type_breakdown: payment_type_breakdown(payments),
        backend: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubledger_client::{Category, PaymentMethod};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn tx(kind: TransactionType, category: Category, amount: &str, status: TransactionStatus) -> Transaction {
        Transaction {
            id: String::new(),
            transaction_type: kind,
            category,
            amount: dec(amount),
            description: "entry".to_string(),
            payer: None,
            payee: None,
            payment_method: PaymentMethod::Cash,
            reference: None,
            date: "2024-06-01".to_string(),
            status,
            notes: String::new(),
        }
    }

    fn payment(amount: &str, refunded: &str, status: PaymentStatus, payment_type: &str) -> Payment {
        Payment {
            id: "p".to_string(),
            payer_name: String::new(),
            payer_email: String::new(),
            payer_phone: String::new(),
            payment_type: payment_type.to_string(),
            payment_method: PaymentMethod::Card,
            amount: dec(amount),
            refund_amount: dec(refunded),
            status,
            transaction_id: String::new(),
            payment_date: String::new(),
            card_last_four: None,
        }
    }

    #[test]
    fn test_income_and_expense_scenario() {
        let transactions = vec![
            tx(TransactionType::Income, Category::Registration, "100", TransactionStatus::Completed),
            tx(TransactionType::Expense, Category::Equipment, "40", TransactionStatus::Completed),
        ];
        let summary = summarize_transactions(&transactions);
        assert_eq!(summary.total_income, dec("100"));
        assert_eq!(summary.total_expenses, dec("40"));
        assert_eq!(summary.net_income, dec("60"));
        assert_eq!(summary.profit_margin, dec("60.0"));
    }

    #[test]
    fn test_profit_margin_zero_without_income() {
        let transactions = vec![tx(TransactionType::Expense, Category::Travel, "75", TransactionStatus::Completed)];
        let summary = summarize_transactions(&transactions);
        assert_eq!(summary.total_income, Decimal::ZERO);
        assert_eq!(summary.net_income, dec("-75"));
        assert_eq!(summary.profit_margin, Decimal::ZERO);

        assert_eq!(summarize_transactions(&[]).profit_margin, Decimal::ZERO);
    }

    #[test]
    fn test_margin_rounds_to_one_decimal() {
        let transactions = vec![
            tx(TransactionType::Income, Category::Donations, "300", TransactionStatus::Completed),
            tx(TransactionType::Expense, Category::Utilities, "100", TransactionStatus::Completed),
        ];
        assert_eq!(summarize_transactions(&transactions).profit_margin, dec("66.7"));
    }

    #[test]
    fn test_only_completed_entries_count_toward_totals() {
        let transactions = vec![
            tx(TransactionType::Income, Category::Registration, "100", TransactionStatus::Completed),
            tx(TransactionType::Income, Category::Registration, "50", TransactionStatus::Pending),
            tx(TransactionType::Income, Category::Registration, "20", TransactionStatus::Refunded),
            tx(TransactionType::Expense, Category::Refunds, "15", TransactionStatus::Completed),
            tx(TransactionType::Expense, Category::Equipment, "5", TransactionStatus::Failed),
        ];
        let summary = summarize_transactions(&transactions);
        assert_eq!(summary.total_income, dec("100"));
        assert_eq!(summary.total_expenses, dec("15"));
        assert_eq!(summary.pending_income, dec("50"));
        assert_eq!(summary.refunded_amount, dec("35"));
        assert_eq!(summary.transaction_count, 5);
        assert_eq!(summary.completed_count, 2);
        assert_eq!(summary.pending_count, 1);
    }

    #[test]
    fn test_expense_breakdown_sums_to_total() {
        let transactions = vec![
            tx(TransactionType::Expense, Category::Equipment, "10.10", TransactionStatus::Completed),
            tx(TransactionType::Expense, Category::Equipment, "20.20", TransactionStatus::Completed),
            tx(TransactionType::Expense, Category::Travel, "0.03", TransactionStatus::Completed),
            tx(TransactionType::Expense, Category::Uniforms, "33.33", TransactionStatus::Completed),
            tx(TransactionType::Expense, Category::Custom("Catering".to_string()), "1.01", TransactionStatus::Completed),
            tx(TransactionType::Expense, Category::Travel, "99", TransactionStatus::Pending),
            tx(TransactionType::Income, Category::Registration, "500", TransactionStatus::Completed),
        ];
        let stats = compute_stats(&transactions, &[], &[]);
        let breakdown = &stats.expense_breakdown;

        let sum: Decimal = breakdown.buckets.iter().map(|b| b.amount).sum();
        assert_eq!(sum, stats.transactions.total_expenses);
        assert_eq!(breakdown.total, stats.transactions.total_expenses);

        assert_eq!(breakdown.buckets[0].category, "Uniforms");
        let equipment = breakdown.bucket("Equipment").unwrap();
        assert_eq!(equipment.amount, dec("30.30"));
        assert_eq!(equipment.count, 2);
        assert_eq!(breakdown.bucket("Travel").unwrap().count, 1);
        assert!(breakdown.bucket("Catering").is_some());
    }

    #[test]
    fn test_breakdown_ties_ordered_by_name() {
        let breakdown = Breakdown::from_entries(vec![
            ("Travel".to_string(), dec("10")),
            ("Equipment".to_string(), dec("10")),
            ("Insurance".to_string(), dec("30")),
        ]);
        let names: Vec<&str> = breakdown.buckets.iter().map(|b| b.category.as_str()).collect();
        assert_eq!(names, vec!["Insurance", "Equipment", "Travel"]);
        assert_eq!(breakdown.buckets[0].percentage, dec("60.0"));
        assert_eq!(breakdown.buckets[1].percentage, dec("20.0"));
    }

    #[test]
    fn test_empty_breakdown() {
        let breakdown = Breakdown::from_entries(Vec::new());
        assert_eq!(breakdown.total, Decimal::ZERO);
        assert!(breakdown.buckets.is_empty());
    }

    #[test]
    fn test_payment_rates() {
        let payments = vec![
            payment("100", "0", PaymentStatus::Completed, "Registration"),
            payment("50", "0", PaymentStatus::Completed, "Tournament"),
            payment("200", "200", PaymentStatus::Refunded, "Registration"),
            payment("80", "30", PaymentStatus::PartiallyRefunded, "Camp"),
            payment("20", "0", PaymentStatus::Failed, "Camp"),
            payment("10", "0", PaymentStatus::Pending, ""),
        ];
        let summary = summarize_payments(&payments);
        assert_eq!(summary.total_payments, 6);
        assert_eq!(summary.total_payment_amount, dec("150"));
        assert_eq!(summary.total_refunded_amount, dec("230"));
        assert_eq!(summary.success_rate, dec("33.3"));
        assert_eq!(summary.refund_rate, dec("33.3"));
        assert_eq!(summary.failed_count, 1);

        assert_eq!(summarize_payments(&[]).success_rate, Decimal::ZERO);
    }

    #[test]
    fn test_payment_type_breakdown_uses_completed_payments() {
        let payments = vec![
            payment("100", "0", PaymentStatus::Completed, "Registration"),
            payment("25", "0", PaymentStatus::Completed, " "),
            payment("60", "0", PaymentStatus::Failed, "Registration"),
        ];
        let stats = compute_stats(&[], &payments, &[]);
        let breakdown = &stats.payment_type_breakdown;
        assert_eq!(breakdown.total, stats.payments.total_payment_amount);
        assert_eq!(breakdown.bucket("Registration").unwrap().amount, dec("100"));
        assert_eq!(breakdown.bucket("Other").unwrap().amount, dec("25"));
    }

    #[test]
    fn test_invoice_summary() {
        let invoice = |total: &str, status: InvoiceStatus| Invoice {
            id: String::new(),
            invoice_number: "INV-1".to_string(),
            customer_name: "Club".to_string(),
            customer_email: String::new(),
            items: vec![],
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: dec(total),
            due_date: String::new(),
            status,
            payment_terms: String::new(),
            notes: String::new(),
        };
        let invoices = vec![
            invoice("110", InvoiceStatus::Sent),
            invoice("55", InvoiceStatus::Overdue),
            invoice("27.5", InvoiceStatus::Paid),
            invoice("1000", InvoiceStatus::Draft),
        ];
        let summary = summarize_invoices(&invoices);
        assert_eq!(summary.outstanding_amount, dec("165"));
        assert_eq!(summary.paid_amount, dec("27.5"));
        assert_eq!(summary.draft_count, 1);
        assert_eq!(summary.overdue_count, 1);
    }

    #[test]
    fn test_backend_stats_are_kept_apart() {
        let payments = vec![payment("100", "0", PaymentStatus::Completed, "Registration")];
        let backend = BackendPaymentStats {
            total_revenue: dec("999"),
            ..BackendPaymentStats::default()
        };
        let stats = compute_stats(&[], &payments, &[]).with_backend_stats(Some(backend));
        assert_eq!(stats.payments.total_payment_amount, dec("100"));
        assert_eq!(stats.transactions.total_income, Decimal::ZERO);
        assert_eq!(stats.backend.unwrap().total_revenue, dec("999"));
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let transactions = vec![tx(TransactionType::Income, Category::Registration, "100", TransactionStatus::Completed)];
        let value = serde_json::to_value(compute_stats(&transactions, &[], &[])).unwrap();
        assert_eq!(value["transactions"]["totalIncome"], serde_json::json!(100.0));
        assert_eq!(value["transactions"]["profitMargin"], serde_json::json!(100.0));
        assert!(value["backend"].is_null());
    }
}
