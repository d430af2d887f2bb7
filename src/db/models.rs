use chrono::DateTime;

use crate::types::{AreaPriceStat, CachedAreaStat};

/// Row of the `area_statistics` table. Timestamps are unix epoch milliseconds.
#[derive(Debug, sqlx::FromRow)]
pub struct AreaStatRow {
    pub area_name: String,
    pub average_price_per_meter: f64,
    pub data_source: String,
    pub trend_percentage: f64,
    pub last_updated: i64,
    pub cached_at: i64,
    pub cache_valid_until: i64,
}

impl AreaStatRow {
    /// `None` if a stored timestamp is out of range.
    pub fn into_cached(self) -> Option<CachedAreaStat> {
        Some(CachedAreaStat {
            stat: AreaPriceStat {
                area_name: self.area_name,
                average_price_per_square_meter: self.average_price_per_meter,
                data_source: self.data_source,
                trend_percentage: self.trend_percentage,
                last_updated: DateTime::from_timestamp_millis(self.last_updated)?,
            },
            cached_at: DateTime::from_timestamp_millis(self.cached_at)?,
            cache_valid_until: DateTime::from_timestamp_millis(self.cache_valid_until)?,
        })
    }
}
