//! Payment routes - list, declined payments, retry

pub mod api;

pub use api::{api_declined_payments, api_payments, api_retry_payment};
