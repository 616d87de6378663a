//! Utility functions and helpers

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};

/// Format an integer string with thousands separators
pub fn format_number<T: ToString>(n: T) -> String {
    let s = n.to_string();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };

    let mut result = String::new();
    let mut count = 0;
    for c in digits.chars().rev() {
        if count == 3 {
            result.push(',');
            count = 0;
        }
        result.push(c);
        count += 1;
    }
    let grouped: String = result.chars().rev().collect();
    format!("{}{}", sign, grouped)
}

/// Format a money amount with thousands separators and fixed decimal places
pub fn format_amount(amount: Decimal, decimal_places: u32) -> String {
    let rounded = amount.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", decimal_places as usize, rounded);
    match text.split_once('.') {
        Some((whole, fraction)) => format!("{}.{}", format_number(whole), fraction),
        None => format_number(text),
    }
}

/// Generate an invoice number from the current timestamp
pub fn generate_invoice_number() -> String {
    format!("INV-{}", Utc::now().timestamp_millis())
}
