//! Filter engine: brand and price matching over a record set.
//!
//! Price-string normalization lives here and nowhere else. A record with an
//! unknown price never matches a price-bounded query; it is excluded rather
//! than treated as costing zero.

use crate::models::{FilterCriteria, Shoe, PRICE_UNKNOWN};

/// Parse a price string: keep digits and decimal separators, treat a comma as
/// the decimal point when present ("169,95 €" → 169.95, "1.234,56" → 1234.56).
/// Sentinel, empty, "N/A" and unparseable text all yield `None` — no price,
/// not an error.
pub fn parse_price(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == PRICE_UNKNOWN || s.eq_ignore_ascii_case("n/a") {
        return None;
    }

    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains(',') {
        // comma-decimal locale: dots are thousands separators
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };

    let value: f64 = normalized.parse().ok()?;
    (value > 0.0).then_some(value)
}

/// Return the subset of `shoes` matching `criteria`, preserving input order.
pub fn filter_shoes(shoes: &[Shoe], criteria: &FilterCriteria) -> Vec<Shoe> {
    shoes
        .iter()
        .filter(|shoe| matches(shoe, criteria))
        .cloned()
        .collect()
}

fn matches(shoe: &Shoe, criteria: &FilterCriteria) -> bool {
    if let Some(brand) = &criteria.brand {
        if !shoe
            .name
            .to_lowercase()
            .contains(&brand.trim().to_lowercase())
        {
            return false;
        }
    }

    if criteria.has_price_bound() {
        let Some(price) = parse_price(&shoe.price_text) else {
            return false;
        };
        if let Some(min) = criteria.min_price {
            if price < min {
                return false;
            }
        }
        if let Some(max) = criteria.max_price {
            if price > max {
                return false;
            }
        }
    }

    true
}
