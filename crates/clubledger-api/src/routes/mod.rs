//! Route modules for the finance API
//!
//! - transactions: ledger list, create and edit
//! - payments: payment list, declined payments, retry
//! - refunds: refund submission
//! - invoices: invoice list, create and edit
//! - stats: derived statistics and the backend's payment stats
//! - time: date range query parameters

pub mod transactions;
pub mod payments;
pub mod refunds;
pub mod invoices;
pub mod stats;
pub mod time;

/// Parse an optional enum query parameter
pub(crate) fn parse_param<T>(name: &str, value: Option<&str>) -> crate::ApiResult<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|e| crate::ApiError::bad_request(format!("Invalid {}: {}", name, e))),
    }
}

/// Non-empty trimmed text parameter
pub(crate) fn text_param(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
