//! Invoice routes - list, create, edit

pub mod api;

pub use api::{api_create_invoice, api_invoices, api_update_invoice};
