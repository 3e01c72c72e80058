use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker stored in place of a genuinely absent price.
///
/// Distinct from a parse failure: the extractor writes this when the source
/// page shows no currency-marked price at all.
pub const PRICE_UNKNOWN: &str = "-";

// ── Shoe record ───────────────────────────────────────────────────────────────

/// One release extracted from the catalog site. All fields are raw page text;
/// typing/validation happens at query time in the filter engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shoe {
    pub name: String,
    pub image_url: String,
    pub release_text: String,
    pub price_text: String,
}

impl Shoe {
    pub fn has_price(&self) -> bool {
        self.price_text != PRICE_UNKNOWN && !self.price_text.trim().is_empty()
    }
}

// ── Catalog snapshot ──────────────────────────────────────────────────────────

/// One complete, internally-consistent record set plus its fetch timestamp.
/// Records are replaced wholesale on refresh, never mutated in place.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub shoes: Vec<Shoe>,
    pub fetched_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    pub fn new(shoes: Vec<Shoe>) -> Self {
        Self {
            shoes,
            fetched_at: Utc::now(),
        }
    }

    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.fetched_at
    }
}

// ── Filter criteria ───────────────────────────────────────────────────────────

/// Query parameters for the filter engine. A `None` bound means unconstrained
/// on that side, not zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub brand: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl FilterCriteria {
    pub fn by_brand(brand: impl Into<String>) -> Self {
        Self {
            brand: Some(brand.into()),
            ..Self::default()
        }
    }

    pub fn by_price(min_price: Option<f64>, max_price: Option<f64>) -> Self {
        Self {
            min_price,
            max_price,
            ..Self::default()
        }
    }

    pub fn has_price_bound(&self) -> bool {
        self.min_price.is_some() || self.max_price.is_some()
    }
}

// ── Raw release page ──────────────────────────────────────────────────────────

/// Field texts pulled from one release page before cleaning. Everything is
/// optional here; the cleaner decides what survives.
#[derive(Debug, Clone, Default)]
pub struct RawShoePage {
    pub name: Option<String>,
    pub image: Option<String>,
    pub release: Option<String>,
    pub price: Option<String>,
}
