//! Date range parameters shared by list endpoints

use chrono::NaiveDate;
use clubledger_client::parse_record_date;
use clubledger_config::TimeRange;
use clubledger_core::DateRange;

use crate::error::{ApiError, ApiResult};

fn parse_bound(name: &str, value: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => parse_record_date(v)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid {} date: {}", name, v))),
    }
}

/// Resolve `range`, `from` and `to` query parameters.
///
/// Explicit bounds win over a preset; without either the configured
/// default preset applies.
pub fn resolve_range(
    range: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    default: TimeRange,
    today: NaiveDate,
) -> ApiResult<DateRange> {
    let start = parse_bound("from", from)?;
    let end = parse_bound("to", to)?;
    if start.is_some() || end.is_some() {
        return Ok(DateRange { start, end });
    }

    let range = match range.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => r.parse::<TimeRange>().map_err(|e| ApiError::bad_request(e))?,
        None => default,
    };
    Ok(DateRange::for_range(range, today))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_explicit_bounds_win() {
        let range = resolve_range(Some("month"), Some("2024-01-01"), None, TimeRange::All, date(2024, 6, 1)).unwrap();
        assert_eq!(range.start, Some(date(2024, 1, 1)));
        assert_eq!(range.end, None);
    }

    #[test]
    fn test_preset_and_default() {
        let range = resolve_range(Some("year"), None, None, TimeRange::All, date(2024, 6, 1)).unwrap();
        assert_eq!(range, DateRange::between(date(2024, 1, 1), date(2024, 12, 31)));

        let range = resolve_range(None, None, Some(""), TimeRange::All, date(2024, 6, 1)).unwrap();
        assert!(range.is_unbounded());
    }

    #[test]
    fn test_invalid_values() {
        assert!(resolve_range(Some("decade"), None, None, TimeRange::All, date(2024, 6, 1)).is_err());
        assert!(resolve_range(None, Some("01/02/2024"), None, TimeRange::All, date(2024, 6, 1)).is_err());
    }
}
