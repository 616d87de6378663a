//! Closed vocabularies shared by the finance records

use serde::{Deserialize, Serialize};

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" | "expenses" => Ok(TransactionType::Expense),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ledger entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
    Refunded,
    Cancelled,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Completed
    }
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "completed" => Ok(TransactionStatus::Completed),
            "pending" => Ok(TransactionStatus::Pending),
            "failed" => Ok(TransactionStatus::Failed),
            "refunded" => Ok(TransactionStatus::Refunded),
            "cancelled" | "canceled" => Ok(TransactionStatus::Cancelled),
            _ => Err(format!("Invalid transaction status: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ledger category tag.
///
/// Income and expense entries draw from separate vocabularies. Tags the
/// backend sends that are not part of either vocabulary are kept verbatim
/// in [`Category::Custom`] so a single unknown tag never drops a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    // income
    Registration,
    MembershipFees,
    TournamentFees,
    Sponsorship,
    Donations,
    Merchandise,
    Fundraising,
    OtherIncome,
    // expense
    Equipment,
    FacilityRental,
    Salaries,
    Travel,
    Uniforms,
    Insurance,
    Utilities,
    Maintenance,
    Marketing,
    Refunds,
    OtherExpense,
    Custom(String),
}

static INCOME_CATEGORIES: [Category; 8] = [
    Category::Registration,
    Category::MembershipFees,
    Category::TournamentFees,
    Category::Sponsorship,
    Category::Donations,
    Category::Merchandise,
    Category::Fundraising,
    Category::OtherIncome,
];

static EXPENSE_CATEGORIES: [Category; 11] = [
    Category::Equipment,
    Category::FacilityRental,
    Category::Salaries,
    Category::Travel,
    Category::Uniforms,
    Category::Insurance,
    Category::Utilities,
    Category::Maintenance,
    Category::Marketing,
    Category::Refunds,
    Category::OtherExpense,
];

impl Category {
    /// Display label, also used on the wire
    pub fn label(&self) -> &str {
        match self {
            Category::Registration => "Registration",
            Category::MembershipFees => "Membership Fees",
            Category::TournamentFees => "Tournament Fees",
            Category::Sponsorship => "Sponsorship",
            Category::Donations => "Donations",
            Category::Merchandise => "Merchandise",
            Category::Fundraising => "Fundraising",
            Category::OtherIncome => "Other Income",
            Category::Equipment => "Equipment",
            Category::FacilityRental => "Facility Rental",
            Category::Salaries => "Salaries",
            Category::Travel => "Travel",
            Category::Uniforms => "Uniforms",
            Category::Insurance => "Insurance",
            Category::Utilities => "Utilities",
            Category::Maintenance => "Maintenance",
            Category::Marketing => "Marketing",
            Category::Refunds => "Refunds",
            Category::OtherExpense => "Other Expense",
            Category::Custom(tag) => tag.as_str(),
        }
    }

    /// Vocabulary the category belongs to; `None` for custom tags
    pub fn kind(&self) -> Option<TransactionType> {
        if INCOME_CATEGORIES.contains(self) {
            Some(TransactionType::Income)
        } else if EXPENSE_CATEGORIES.contains(self) {
            Some(TransactionType::Expense)
        } else {
            None
        }
    }

    /// Whether the category may be used for an entry of the given type
    pub fn allowed_for(&self, transaction_type: TransactionType) -> bool {
        self.kind().map_or(true, |kind| kind == transaction_type)
    }

    pub fn vocabulary(transaction_type: TransactionType) -> &'static [Category] {
        match transaction_type {
            TransactionType::Income => &INCOME_CATEGORIES,
            TransactionType::Expense => &EXPENSE_CATEGORIES,
        }
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "registration" => Category::Registration,
            "membership fees" | "membership" => Category::MembershipFees,
            "tournament fees" | "tournament" => Category::TournamentFees,
            "sponsorship" => Category::Sponsorship,
            "donations" | "donation" => Category::Donations,
            "merchandise" => Category::Merchandise,
            "fundraising" => Category::Fundraising,
            "other income" => Category::OtherIncome,
            "equipment" => Category::Equipment,
            "facility rental" | "facilities" => Category::FacilityRental,
            "salaries" | "coaching salaries" => Category::Salaries,
            "travel" => Category::Travel,
            "uniforms" => Category::Uniforms,
            "insurance" => Category::Insurance,
            "utilities" => Category::Utilities,
            "maintenance" => Category::Maintenance,
            "marketing" => Category::Marketing,
            "refunds" | "refund" => Category::Refunds,
            "other expense" => Category::OtherExpense,
            _ => Category::Custom(s.trim().to_string()),
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Category::from(s.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Custom(tag) => tag,
            other => other.label().to_string(),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// How money moved
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Check,
    PayPal,
    Online,
    Other(String),
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl PaymentMethod {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Check => "check",
            PaymentMethod::PayPal => "paypal",
            PaymentMethod::Online => "online",
            PaymentMethod::Other(method) => method.as_str(),
        }
    }
}

impl From<&str> for PaymentMethod {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "cash" => PaymentMethod::Cash,
            "card" | "credit_card" | "debit_card" => PaymentMethod::Card,
            "bank_transfer" | "bank" | "transfer" => PaymentMethod::BankTransfer,
            "check" | "cheque" => PaymentMethod::Check,
            "paypal" => PaymentMethod::PayPal,
            "online" => PaymentMethod::Online,
            _ => PaymentMethod::Other(s.trim().to_string()),
        }
    }
}

impl From<String> for PaymentMethod {
    fn from(s: String) -> Self {
        PaymentMethod::from(s.as_str())
    }
}

impl From<PaymentMethod> for String {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Other(method) => method,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Externally processed payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
    Pending,
    Failed,
    Cancelled,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "completed",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::PartiallyRefunded => "partially_refunded",
        }
    }

    /// Refund state machine.
    ///
    /// `completed -> {refunded, partially_refunded}` and
    /// `partially_refunded -> {partially_refunded, refunded}`; a failed
    /// payment may only be reset to pending (retry).
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Completed, Refunded)
                | (Completed, PartiallyRefunded)
                | (PartiallyRefunded, PartiallyRefunded)
                | (PartiallyRefunded, Refunded)
                | (Failed, Pending)
        )
    }

    /// Whether any refund can be taken from a payment in this status
    pub fn is_refundable(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::PartiallyRefunded)
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "completed" => Ok(PaymentStatus::Completed),
            "pending" => Ok(PaymentStatus::Pending),
            "failed" => Ok(PaymentStatus::Failed),
            "cancelled" | "canceled" => Ok(PaymentStatus::Cancelled),
            "refunded" => Ok(PaymentStatus::Refunded),
            "partially_refunded" => Ok(PaymentStatus::PartiallyRefunded),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Invoice lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Draft
    }
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Sent or overdue invoices still expect money
    pub fn is_outstanding(&self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Overdue)
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" | "canceled" => Ok(InvoiceStatus::Cancelled),
            _ => Err(format!("Invalid invoice status: {}", s)),
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why money is being returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    CustomerRequest,
    DuplicatePayment,
    EventCancelled,
    ServiceNotProvided,
    Overcharge,
    MedicalWithdrawal,
    Other,
}

impl RefundReason {
    pub fn label(&self) -> &'static str {
        match self {
            RefundReason::CustomerRequest => "Customer request",
            RefundReason::DuplicatePayment => "Duplicate payment",
            RefundReason::EventCancelled => "Event cancelled",
            RefundReason::ServiceNotProvided => "Service not provided",
            RefundReason::Overcharge => "Overcharge",
            RefundReason::MedicalWithdrawal => "Medical withdrawal",
            RefundReason::Other => "Other",
        }
    }
}

impl std::fmt::Display for RefundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// How a refund is paid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundMethod {
    OriginalPayment,
    Cash,
    BankTransfer,
    Check,
    AccountCredit,
}

impl Default for RefundMethod {
    fn default() -> Self {
        RefundMethod::OriginalPayment
    }
}

impl RefundMethod {
    pub fn label(&self) -> &'static str {
        match self {
            RefundMethod::OriginalPayment => "Original payment method",
            RefundMethod::Cash => "Cash",
            RefundMethod::BankTransfer => "Bank transfer",
            RefundMethod::Check => "Check",
            RefundMethod::AccountCredit => "Account credit",
        }
    }

    /// Payment method recorded on the ledger entry for a free-standing refund
    pub fn ledger_method(&self) -> PaymentMethod {
        match self {
            RefundMethod::OriginalPayment => PaymentMethod::Other("original_payment".to_string()),
            RefundMethod::Cash => PaymentMethod::Cash,
            RefundMethod::BankTransfer => PaymentMethod::BankTransfer,
            RefundMethod::Check => PaymentMethod::Check,
            RefundMethod::AccountCredit => PaymentMethod::Other("account_credit".to_string()),
        }
    }
}

impl std::fmt::Display for RefundMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
