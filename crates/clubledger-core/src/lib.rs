//! Finance engine: snapshot store, filters, statistics and the refund workflow

pub mod error;
pub mod filter;
pub mod stats;
pub mod store;
pub mod refund;
pub mod editor;

#[cfg(test)]
mod testing;

pub use error::{CoreError, CoreResult, ErrorCode, ErrorDetails, ErrorSeverity};
pub use filter::{DateRange, InvoiceFilter, PaymentFilter, RecordFilter, TransactionFilter};
pub use stats::{
    compute_stats, Breakdown, BreakdownBucket, InvoiceSummary, PaymentSummary, StatsSnapshot,
    TransactionSummary,
};
pub use store::{RecordSnapshot, RecordStore};
pub use refund::{RefundOutcome, RefundProcessor, RefundRequest};
pub use editor::{InvoiceComposer, TransactionEditor};
