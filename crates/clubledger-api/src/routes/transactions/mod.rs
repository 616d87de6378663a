//! Ledger routes - list with filters, create, edit

pub mod api;

pub use api::{api_create_transaction, api_transactions, api_update_transaction};
