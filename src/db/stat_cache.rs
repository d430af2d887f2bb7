use async_trait::async_trait;
use tracing::warn;

use crate::area::AreaStatCache;
use crate::db::models::AreaStatRow;
use crate::error::Result;
use crate::types::CachedAreaStat;

/// Area statistics cache persisted in the `area_statistics` SQLite table.
pub struct SqliteStatCache {
    pool: sqlx::SqlitePool,
}

impl SqliteStatCache {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AreaStatCache for SqliteStatCache {
    async fn get(&self, area_name: &str) -> Result<Option<CachedAreaStat>> {
        let row = sqlx::query_as::<_, AreaStatRow>(
            r#"
            SELECT area_name, average_price_per_meter, data_source, trend_percentage,
                   last_updated, cached_at, cache_valid_until
            FROM area_statistics
            WHERE area_name = ?
            "#,
        )
        .bind(area_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|r| {
            let cached = r.into_cached();
            if cached.is_none() {
                warn!("[CACHE] ignoring row for \"{area_name}\" with out-of-range timestamps");
            }
            cached
        }))
    }

    async fn upsert(&self, entry: &CachedAreaStat) -> Result<()> {
        let stat = &entry.stat;
        sqlx::query(
            r#"
            INSERT INTO area_statistics (
                area_name, average_price_per_meter, data_source, trend_percentage,
                last_updated, cached_at, cache_valid_until
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(area_name) DO UPDATE SET
                average_price_per_meter = excluded.average_price_per_meter,
                data_source = excluded.data_source,
                trend_percentage = excluded.trend_percentage,
                last_updated = excluded.last_updated,
                cached_at = excluded.cached_at,
                cache_valid_until = excluded.cache_valid_until
            "#,
        )
        .bind(&stat.area_name)
        .bind(stat.average_price_per_square_meter)
        .bind(&stat.data_source)
        .bind(stat.trend_percentage)
        .bind(stat.last_updated.timestamp_millis())
        .bind(entry.cached_at.timestamp_millis())
        .bind(entry.cache_valid_until.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AreaPriceStat;
    use chrono::{Duration, TimeZone, Utc};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> sqlx::SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn entry(area: &str, price: f64, source: &str) -> CachedAreaStat {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 15).unwrap();
        CachedAreaStat {
            stat: AreaPriceStat {
                area_name: area.to_string(),
                average_price_per_square_meter: price,
                data_source: source.to_string(),
                trend_percentage: 4.5,
                last_updated: t0,
            },
            cached_at: t0,
            cache_valid_until: t0 + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn round_trips_an_entry() {
        let cache = SqliteStatCache::new(test_pool().await);
        let stored = entry("Lagos, Faro", 2345.67, "ine+pordata");
        cache.upsert(&stored).await.unwrap();

        let loaded = cache.get("Lagos, Faro").await.unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert!(cache.get("Faro").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_area() {
        let cache = SqliteStatCache::new(test_pool().await);
        cache.upsert(&entry("Porto", 2000.0, "ine")).await.unwrap();
        cache.upsert(&entry("Porto", 2200.0, "pordata")).await.unwrap();

        let loaded = cache.get("Porto").await.unwrap().unwrap();
        assert_eq!(loaded.stat.average_price_per_square_meter, 2200.0);
        assert_eq!(loaded.stat.data_source, "pordata");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM area_statistics")
            .fetch_one(&cache.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
