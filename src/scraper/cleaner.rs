use crate::error::{Error, Result};
use crate::models::{RawShoePage, Shoe, PRICE_UNKNOWN};

/// Currency marker the source site prints next to real prices. Some products
/// ship a bare number in the price slot (a stock counter leaking into the
/// layout); those must not be mistaken for prices.
const CURRENCY_MARKER: char = '€';

// ── Raw page → Shoe ───────────────────────────────────────────────────────────

/// Turn one raw release page into a catalog record. Fails when no usable
/// name was extracted; such pages are skipped, never stored blank.
pub fn clean_shoe(raw: RawShoePage) -> Result<Shoe> {
    let name = raw.name.as_deref().map(tidy).unwrap_or_default();
    if name.is_empty() {
        return Err(Error::Extraction("no usable product name".into()));
    }

    let price_text = match raw.price.as_deref().map(str::trim) {
        Some(p) if p.contains(CURRENCY_MARKER) => p.to_string(),
        _ => PRICE_UNKNOWN.to_string(),
    };

    Ok(Shoe {
        name,
        image_url: raw.image.map(|i| i.trim().to_string()).unwrap_or_default(),
        release_text: raw.release.as_deref().map(tidy).unwrap_or_default(),
        price_text,
    })
}

fn tidy(s: &str) -> String {
    s.trim().replace('"', "'")
}
