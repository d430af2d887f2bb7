use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Valuation input / output
// ---------------------------------------------------------------------------

/// Listing fields a valuation is computed from. Everything except `price` is
/// optional; `price` is an `Option` so a missing price surfaces as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyValuationInput {
    pub price: Option<f64>,
    pub monthly_rent: Option<f64>,
    pub monthly_expenses: Option<f64>,
    pub area_square_meters: Option<f64>,
    /// Only used for expense-ratio keyword matching.
    pub description: Option<String>,
    /// Only used for the area price lookup.
    pub address: Option<String>,
}

impl PropertyValuationInput {
    #[cfg(test)]
    pub fn with_price(price: f64) -> Self {
        Self {
            price: Some(price),
            ..Self::default()
        }
    }

    /// Address with surrounding whitespace removed, `None` when blank.
    pub fn address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValuationResult {
    pub price: f64,
    pub monthly_rent: f64,
    pub monthly_expenses: f64,
    /// Annual net rental income over price, in percent, 2 decimal places.
    pub roi_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_square_meter: Option<f64>,
    /// Signed deviation of `price_per_square_meter` from the area average.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_difference_percent: Option<i64>,
    /// Effective monthly rent yield in percent. Back-computed when rent was supplied.
    pub rent_yield_percent: f64,
    /// Effective expense ratio in percent. Back-computed when expenses were supplied.
    pub expense_ratio_percent: f64,
    pub rent_estimated: bool,
    pub expenses_estimated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<AreaPriceStat>,
}

// ---------------------------------------------------------------------------
// Area statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaPriceStat {
    pub area_name: String,
    pub average_price_per_square_meter: f64,
    /// Provenance label, e.g. `ine+pordata` or `fallback`.
    pub data_source: String,
    pub trend_percentage: f64,
    pub last_updated: DateTime<Utc>,
}

/// An `AreaPriceStat` together with its cache window.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAreaStat {
    pub stat: AreaPriceStat,
    pub cached_at: DateTime<Utc>,
    pub cache_valid_until: DateTime<Utc>,
}

impl CachedAreaStat {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.cache_valid_until
    }
}

// ---------------------------------------------------------------------------
// Listing extraction (paste-to-analyze)
// ---------------------------------------------------------------------------

/// Structured fields pulled out of free-form listing text by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedListing {
    pub address: Option<String>,
    pub price: Option<f64>,
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
    pub square_meters: Option<f64>,
    pub description: Option<String>,
}

/// Response shape of `POST /analyze-content`, matching the persisted
/// property record fields.
#[derive(Debug, Clone, Serialize)]
pub struct ListingAnalysis {
    pub address: String,
    pub price: f64,
    pub monthly_rent: f64,
    pub estimated_expenses: f64,
    pub roi: f64,
    pub details: ListingDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingDetails {
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
    pub square_meters: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_meter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference_percent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_name: Option<String>,
    pub rent_yield_percentage: String,
    pub expense_percentage: String,
}
