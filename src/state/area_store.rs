use async_trait::async_trait;
use dashmap::DashMap;

use crate::area::AreaStatCache;
use crate::error::Result;
use crate::types::CachedAreaStat;

// ---------------------------------------------------------------------------
// MemoryStatCache
// ---------------------------------------------------------------------------

/// Process-local area statistics cache. Entries live until overwritten or the
/// process exits; expiry is decided by the reader from `cache_valid_until`.
#[derive(Default)]
pub struct MemoryStatCache {
    /// area_name → cached stat
    entries: DashMap<String, CachedAreaStat>,
}

impl MemoryStatCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl AreaStatCache for MemoryStatCache {
    async fn get(&self, area_name: &str) -> Result<Option<CachedAreaStat>> {
        Ok(self.entries.get(area_name).map(|e| e.value().clone()))
    }

    async fn upsert(&self, entry: &CachedAreaStat) -> Result<()> {
        self.entries.insert(entry.stat.area_name.clone(), entry.clone());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AreaPriceStat;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(area: &str, price: f64) -> CachedAreaStat {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        CachedAreaStat {
            stat: AreaPriceStat {
                area_name: area.to_string(),
                average_price_per_square_meter: price,
                data_source: "ine".to_string(),
                trend_percentage: 5.0,
                last_updated: t0,
            },
            cached_at: t0,
            cache_valid_until: t0 + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn unknown_area_is_a_miss() {
        let cache = MemoryStatCache::new();
        assert!(cache.get("Porto").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_is_last_writer_wins() {
        let cache = MemoryStatCache::new();
        cache.upsert(&entry("Porto", 2000.0)).await.unwrap();
        cache.upsert(&entry("Porto", 2100.0)).await.unwrap();

        assert_eq!(cache.len(), 1);
        let got = cache.get("Porto").await.unwrap().unwrap();
        assert_eq!(got.stat.average_price_per_square_meter, 2100.0);
    }

    #[tokio::test]
    async fn concurrent_upserts_keep_one_row_per_area() {
        let cache = std::sync::Arc::new(MemoryStatCache::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.upsert(&entry("Braga", 1000.0 + i as f64)).await.unwrap();
                cache.get("Braga").await.unwrap().is_some()
            }));
        }
        for h in handles {
            assert!(h.await.unwrap());
        }
        assert_eq!(cache.len(), 1);
    }
}
