//! Price parsing and cent rounding.
//!
//! Prices travel as JSON numbers (and, from older scripts, as strings like
//! `"$1,299.00"`). Aggregates are rounded to cents so a total survives a
//! JSON round trip unchanged.

use serde_json::Value;

/// Round a decimal amount to cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Coerce a raw price into a non-negative finite amount.
///
/// Anything unparseable, negative or non-finite becomes `0.0`.
pub fn parse_price(raw: Option<&Value>) -> f64 {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_price_str(s),
        _ => None,
    };

    match parsed {
        Some(p) if p.is_finite() && p > 0.0 => p,
        _ => 0.0,
    }
}

fn parse_price_str(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '.' && c != '-')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok()
}

/// Line total for a unit price and quantity.
pub fn line_total(price: f64, quantity: u32) -> f64 {
    round_cents(price * f64::from(quantity))
}
