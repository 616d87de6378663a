//! Builders for new and edited ledger entries and invoices

use chrono::{Duration, Utc};
use clubledger_client::{
    parse_record_date, Category, Invoice, InvoiceItem, InvoiceStatus, PaymentMethod, Transaction,
    TransactionStatus, TransactionType,
};
use clubledger_utils::generate_invoice_number;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{CoreError, CoreResult};
use crate::store::RecordStore;

const DEFAULT_PAYMENT_TERMS: &str = "Net 30";
const DEFAULT_DUE_DAYS: i64 = 30;

fn today() -> String {
    Utc::now().date_naive().to_string()
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ==================== Transactions ====================

/// Field-validated builder for a ledger entry
#[derive(Debug, Clone)]
pub struct TransactionEditor {
    /// Set when editing an existing entry
    id: Option<String>,
    draft: Transaction,
}

impl TransactionEditor {
    /// Start a new entry dated today, under the first category of its type
    pub fn new(transaction_type: TransactionType) -> Self {
        let category = Category::vocabulary(transaction_type)
            .first()
            .cloned()
            .unwrap_or_else(|| Category::Custom(String::new()));
        Self {
            id: None,
            draft: Transaction {
                id: String::new(),
                transaction_type,
                category,
                amount: Decimal::ZERO,
                description: String::new(),
                payer: None,
                payee: None,
                payment_method: PaymentMethod::default(),
                reference: None,
                date: today(),
                status: TransactionStatus::Completed,
                notes: String::new(),
            },
        }
    }

    /// Create from a complete draft
    pub fn from_draft(draft: Transaction) -> Self {
        Self { id: None, draft }
    }

    /// Edit an existing entry; the submitted record replaces it
    pub fn edit(id: impl Into<String>, draft: Transaction) -> Self {
        Self {
            id: Some(id.into()),
            draft,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.id.is_some()
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.draft.amount = amount;
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.draft.category = category;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.draft.description = description.into();
        self
    }

    pub fn payer(mut self, payer: impl Into<String>) -> Self {
        self.draft.payer = Some(payer.into());
        self
    }

    pub fn payee(mut self, payee: impl Into<String>) -> Self {
        self.draft.payee = Some(payee.into());
        self
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.draft.payment_method = method;
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.draft.reference = Some(reference.into());
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.draft.date = date.into();
        self
    }

    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.draft.status = status;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.draft.notes = notes.into();
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        let draft = &self.draft;
        if draft.amount <= Decimal::ZERO {
            return Err(CoreError::validation("amount", "must be greater than zero"));
        }
        if draft.description.trim().is_empty() {
            return Err(CoreError::validation("description", "is required"));
        }
        if !draft.category.allowed_for(draft.transaction_type) {
            return Err(CoreError::validation(
                "category",
                format!("{} is not a {} category", draft.category, draft.transaction_type),
            ));
        }
        if parse_record_date(&draft.date).is_none() {
            return Err(CoreError::validation("date", format!("'{}' is not a date", draft.date)));
        }
        Ok(())
    }

    /// Validated record ready to send
    pub fn build(&self) -> CoreResult<Transaction> {
        self.validate()?;
        let mut transaction = self.draft.clone();
        transaction.id = self.id.clone().unwrap_or_default();
        transaction.description = transaction.description.trim().to_string();
        transaction.payer = optional(transaction.payer);
        transaction.payee = optional(transaction.payee);
        transaction.reference = optional(transaction.reference);
        Ok(transaction)
    }

    /// POST or PUT the entry, then re-fetch the ledger
    pub async fn submit(&self, store: &RecordStore) -> CoreResult<Transaction> {
        let transaction = self.build().map_err(|e| {
            log::debug!("Transaction rejected: {}", e);
            e
        })?;

        match self.id.as_deref() {
            Some(id) => {
                store.backend().update_transaction(id, &transaction).await?;
                log::info!("Updated transaction {}", id);
            }
            None => {
                store.backend().create_transaction(&transaction).await?;
                log::info!(
                    "Recorded {} of {} under {}",
                    transaction.transaction_type, transaction.amount, transaction.category
                );
            }
        }

        store.refresh_transactions().await?;
        Ok(transaction)
    }
}

// ==================== Invoices ====================

/// Builds an invoice whose totals always follow its items
#[derive(Debug, Clone)]
pub struct InvoiceComposer {
    id: Option<String>,
    invoice: Invoice,
    tax_rate_percent: Decimal,
}

impl InvoiceComposer {
    /// New draft invoice with a generated number, due in 30 days
    pub fn new(tax_rate_percent: Decimal) -> Self {
        let due = Utc::now().date_naive() + Duration::days(DEFAULT_DUE_DAYS);
        Self {
            id: None,
            invoice: Invoice {
                id: String::new(),
                invoice_number: generate_invoice_number(),
                customer_name: String::new(),
                customer_email: String::new(),
                items: Vec::new(),
                subtotal: Decimal::ZERO,
                tax: Decimal::ZERO,
                total: Decimal::ZERO,
                due_date: due.to_string(),
                status: InvoiceStatus::Draft,
                payment_terms: DEFAULT_PAYMENT_TERMS.to_string(),
                notes: String::new(),
            },
            tax_rate_percent,
        }
    }

    /// Load an existing invoice for editing; stored totals are recomputed
    pub fn from_invoice(existing: &Invoice, tax_rate_percent: Decimal) -> Self {
        let mut composer = Self {
            id: Some(existing.id.clone()).filter(|id| !id.is_empty()),
            invoice: existing.clone(),
            tax_rate_percent,
        };
        composer.recompute();
        composer
    }

    /// Compose a new invoice from submitted fields; totals are recomputed
    pub fn from_draft(mut draft: Invoice, tax_rate_percent: Decimal) -> Self {
        if draft.invoice_number.trim().is_empty() {
            draft.invoice_number = generate_invoice_number();
        }
        draft.id = String::new();
        let mut composer = Self {
            id: None,
            invoice: draft,
            tax_rate_percent,
        };
        composer.recompute();
        composer
    }

    pub fn customer(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.invoice.customer_name = name.into();
        self.invoice.customer_email = email.into();
        self
    }

    pub fn due_date(mut self, due_date: impl Into<String>) -> Self {
        self.invoice.due_date = due_date.into();
        self
    }

    pub fn payment_terms(mut self, terms: impl Into<String>) -> Self {
        self.invoice.payment_terms = terms.into();
        self
    }

    pub fn status(mut self, status: InvoiceStatus) -> Self {
        self.invoice.status = status;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.invoice.notes = notes.into();
        self
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice.invoice_number
    }

    pub fn items(&self) -> &[InvoiceItem] {
        &self.invoice.items
    }

    pub fn subtotal(&self) -> Decimal {
        self.invoice.subtotal
    }

    pub fn tax(&self) -> Decimal {
        self.invoice.tax
    }

    pub fn total(&self) -> Decimal {
        self.invoice.total
    }

    fn check_line(quantity: Decimal, unit_price: Decimal) -> CoreResult<()> {
        if quantity < Decimal::ZERO {
            return Err(CoreError::validation("quantity", "must not be negative"));
        }
        if unit_price < Decimal::ZERO {
            return Err(CoreError::validation("unitPrice", "must not be negative"));
        }
        Ok(())
    }

    fn item_mut(&mut self, index: usize) -> CoreResult<&mut InvoiceItem> {
        self.invoice
            .items
            .get_mut(index)
            .ok_or_else(|| CoreError::validation("items", format!("no item at position {}", index)))
    }

    pub fn add_item(
        &mut self,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> CoreResult<&mut Self> {
        Self::check_line(quantity, unit_price)?;
        self.invoice.items.push(InvoiceItem::new(description, quantity, unit_price));
        self.recompute();
        Ok(self)
    }

    pub fn set_quantity(&mut self, index: usize, quantity: Decimal) -> CoreResult<()> {
        Self::check_line(quantity, Decimal::ZERO)?;
        self.item_mut(index)?.quantity = quantity;
        self.recompute();
        Ok(())
    }

    pub fn set_unit_price(&mut self, index: usize, unit_price: Decimal) -> CoreResult<()> {
        Self::check_line(Decimal::ZERO, unit_price)?;
        self.item_mut(index)?.unit_price = unit_price;
        self.recompute();
        Ok(())
    }

    pub fn set_description(&mut self, index: usize, description: impl Into<String>) -> CoreResult<()> {
        self.item_mut(index)?.description = description.into();
        Ok(())
    }

    pub fn remove_item(&mut self, index: usize) -> CoreResult<InvoiceItem> {
        if index >= self.invoice.items.len() {
            return Err(CoreError::validation("items", format!("no item at position {}", index)));
        }
        let removed = self.invoice.items.remove(index);
        self.recompute();
        Ok(removed)
    }

    /// Line amounts, subtotal, tax and total from the items
    fn recompute(&mut self) {
        for item in &mut self.invoice.items {
            item.amount = item.line_total();
        }
        let subtotal: Decimal = self.invoice.items.iter().map(|i| i.amount).sum();
        let tax = (subtotal * self.tax_rate_percent / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        self.invoice.subtotal = subtotal;
        self.invoice.tax = tax;
        self.invoice.total = subtotal + tax;
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.invoice.customer_name.trim().is_empty() {
            return Err(CoreError::validation("customerName", "is required"));
        }
        if self.invoice.items.is_empty() {
            return Err(CoreError::validation("items", "at least one item is required"));
        }
        for item in &self.invoice.items {
            Self::check_line(item.quantity, item.unit_price)?;
        }
        if !self.invoice.due_date.is_empty() && parse_record_date(&self.invoice.due_date).is_none() {
            return Err(CoreError::validation(
                "dueDate",
                format!("'{}' is not a date", self.invoice.due_date),
            ));
        }
        Ok(())
    }

    pub fn build(&self) -> CoreResult<Invoice> {
        self.validate()?;
        let mut invoice = self.invoice.clone();
        invoice.id = self.id.clone().unwrap_or_default();
        invoice.customer_name = invoice.customer_name.trim().to_string();
        Ok(invoice)
    }

    /// POST or PUT the invoice, then re-fetch invoices
    pub async fn submit(&self, store: &RecordStore) -> CoreResult<Invoice> {
        let invoice = self.build().map_err(|e| {
            log::debug!("Invoice rejected: {}", e);
            e
        })?;

        match self.id.as_deref() {
            Some(id) => {
                store.backend().update_invoice(id, &invoice).await?;
                log::info!("Updated invoice {}", invoice.invoice_number);
            }
            None => {
                store.backend().create_invoice(&invoice).await?;
                log::info!("Created invoice {} for {}", invoice.invoice_number, invoice.total);
            }
        }

        store.refresh_invoices().await?;
        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture;
    use clubledger_client::InMemoryBackend;
    use std::str::FromStr;
    use std::sync::Arc;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_transaction_requires_amount_and_description() {
        let editor = TransactionEditor::new(TransactionType::Income).description("Dues");
        assert!(matches!(editor.validate(), Err(CoreError::ValidationError { ref field, .. }) if field == "amount"));

        let editor = TransactionEditor::new(TransactionType::Income).amount(dec("10"));
        assert!(matches!(editor.validate(), Err(CoreError::ValidationError { ref field, .. }) if field == "description"));

        let editor = TransactionEditor::new(TransactionType::Income).amount(dec("-3")).description("x");
        assert!(editor.validate().is_err());
    }

    #[test]
    fn test_transaction_category_must_match_type() {
        let editor = TransactionEditor::new(TransactionType::Income)
            .amount(dec("10"))
            .description("Cones")
            .category(Category::Equipment);
        assert!(editor.validate().is_err());

        let editor = editor.category(Category::Custom("Grants".to_string()));
        assert!(editor.validate().is_ok());
    }

    #[test]
    fn test_transaction_build_trims_optional_fields() {
        let tx = TransactionEditor::new(TransactionType::Expense)
            .amount(dec("40"))
            .description("  Cones ")
            .category(Category::Equipment)
            .payee("   ")
            .reference("RCPT-9")
            .date("2024-06-15")
            .build()
            .unwrap();
        assert_eq!(tx.description, "Cones");
        assert!(tx.payee.is_none());
        assert_eq!(tx.reference.as_deref(), Some("RCPT-9"));
        assert!(tx.id.is_empty());
    }

    #[test]
    fn test_invoice_totals_scenario() {
        let mut composer = InvoiceComposer::new(dec("10")).customer("Harbor United", "ops@harbor.example");
        composer.add_item("Training bibs", dec("2"), dec("10")).unwrap();
        composer.add_item("Whistle", dec("1"), dec("5")).unwrap();

        assert_eq!(composer.items()[0].amount, dec("20"));
        assert_eq!(composer.subtotal(), dec("25"));
        assert_eq!(composer.tax(), dec("2.5"));
        assert_eq!(composer.total(), dec("27.5"));
        assert!(composer.invoice_number().starts_with("INV-"));
    }

    #[test]
    fn test_invoice_recompute_is_idempotent() {
        let mut composer = InvoiceComposer::new(dec("10")).customer("Club", "");
        composer.add_item("A", dec("3"), dec("3.33")).unwrap();
        composer.add_item("B", dec("1"), dec("0.07")).unwrap();
        let first = composer.build().unwrap();
        composer.recompute();
        let second = composer.build().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.tax, dec("1.01"));
    }

    #[test]
    fn test_item_edits_recompute_totals() {
        let mut composer = InvoiceComposer::new(dec("10")).customer("Club", "");
        composer.add_item("Kit", dec("2"), dec("10")).unwrap();
        composer.add_item("Ball", dec("1"), dec("5")).unwrap();

        composer.set_quantity(0, dec("3")).unwrap();
        assert_eq!(composer.items()[0].amount, dec("30"));
        assert_eq!(composer.total(), dec("38.5"));

        composer.set_unit_price(1, dec("15")).unwrap();
        assert_eq!(composer.subtotal(), dec("45"));

        let removed = composer.remove_item(0).unwrap();
        assert_eq!(removed.description, "Kit");
        assert_eq!(composer.subtotal(), dec("15"));
        assert_eq!(composer.total(), dec("16.5"));

        assert!(composer.set_quantity(0, dec("-1")).is_err());
        assert!(composer.remove_item(5).is_err());
    }

    #[test]
    fn test_invoice_requires_customer_and_items() {
        let composer = InvoiceComposer::new(dec("10"));
        assert!(composer.clone().customer("Club", "").validate().is_err());

        let mut composer = composer;
        composer.add_item("Kit", dec("1"), dec("1")).unwrap();
        assert!(composer.validate().is_err());
    }

    #[test]
    fn test_loaded_invoice_totals_are_recomputed() {
        let mut stored = fixture().invoices.remove(0);
        stored.subtotal = dec("999");
        stored.total = dec("999");
        let composer = InvoiceComposer::from_invoice(&stored, dec("10"));
        assert_eq!(composer.subtotal(), dec("20"));
        assert_eq!(composer.tax(), dec("2"));
        assert_eq!(composer.total(), dec("22"));
    }

    #[tokio::test]
    async fn test_submit_transaction_refetches_ledger() {
        let backend = Arc::new(InMemoryBackend::new(fixture()));
        let store = RecordStore::new(backend.clone());
        store.refresh().await.unwrap();

        TransactionEditor::new(TransactionType::Income)
            .amount(dec("75"))
            .description("Summer sponsorship")
            .category(Category::Sponsorship)
            .submit(&store)
            .await
            .unwrap();
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.transactions.len(), 3);
        assert_eq!(snapshot.stats().transactions.total_income, dec("175"));

        let mut edited = snapshot.transaction("t2").cloned().unwrap();
        edited.amount = dec("45");
        TransactionEditor::edit("t2", edited).submit(&store).await.unwrap();
        let stats = store.stats().await;
        assert_eq!(stats.transactions.total_expenses, dec("45"));
    }

    #[tokio::test]
    async fn test_submit_invoice_and_edit() {
        let backend = Arc::new(InMemoryBackend::new(fixture()));
        let store = RecordStore::new(backend.clone());
        store.refresh().await.unwrap();

        let mut composer = InvoiceComposer::new(dec("10"))
            .customer("Northside FC", "")
            .status(InvoiceStatus::Sent);
        composer.add_item("Pitch hire", dec("4"), dec("25")).unwrap();
        let created = composer.submit(&store).await.unwrap();
        assert_eq!(created.total, dec("110"));
        assert_eq!(store.snapshot().await.invoices.len(), 2);

        let existing = store.snapshot().await.invoice("i1").cloned().unwrap();
        let mut composer = InvoiceComposer::from_invoice(&existing, dec("10")).status(InvoiceStatus::Paid);
        composer.remove_item(0).unwrap();
        assert!(composer.submit(&store).await.is_err());

        composer.add_item("Kit", dec("1"), dec("50")).unwrap();
        composer.submit(&store).await.unwrap();
        let stats = store.stats().await;
        assert_eq!(stats.invoices.paid_amount, dec("55"));
        assert_eq!(stats.invoices.outstanding_amount, dec("110"));
    }
}
