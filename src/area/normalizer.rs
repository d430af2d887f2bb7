use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::area::cache::AreaStatCache;
use crate::area::clock::{truncate_to_millis, Clock, SystemClock};
use crate::area::locality::{AddressLocalityResolver, Locality, LocalityResolver};
use crate::area::sources::{combine_quotes, SourceQuote, WeightedSource};
use crate::config::{
    CACHE_TTL_DAYS, FALLBACK_CACHE_TTL_MINUTES, FALLBACK_PRICE_PER_M2, FALLBACK_SOURCE_LABEL,
    FALLBACK_TREND_PERCENT, REGIONAL_PREMIUMS,
};
use crate::error::{AppError, Result};
use crate::state::LookupStats;
use crate::types::{AreaPriceStat, CachedAreaStat};

/// Resolves an address to its locality's average price per m².
///
/// Lookup order: fresh cache entry → every configured source, queried
/// concurrently and combined by weight → national fallback constants.
/// Source-derived stats are cached for `CACHE_TTL_DAYS`; fallbacks only for
/// `FALLBACK_CACHE_TTL_MINUTES`.
pub struct AreaPriceNormalizer {
    resolver: Arc<dyn LocalityResolver>,
    sources: Vec<WeightedSource>,
    cache: Arc<dyn AreaStatCache>,
    clock: Arc<dyn Clock>,
    source_timeout: Duration,
    stats: Arc<LookupStats>,
}

impl AreaPriceNormalizer {
    /// `sources` are in priority order: the first one to report a trend supplies it.
    pub fn new(
        sources: Vec<WeightedSource>,
        cache: Arc<dyn AreaStatCache>,
        source_timeout: Duration,
    ) -> Self {
        Self {
            resolver: Arc::new(AddressLocalityResolver),
            sources,
            cache,
            clock: Arc::new(SystemClock),
            source_timeout,
            stats: Arc::new(LookupStats::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn stats(&self) -> &LookupStats {
        &self.stats
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.source.id().to_string()).collect()
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache.backend()
    }

    /// Never fails: every source or cache problem is logged and absorbed,
    /// degrading to the national average at worst.
    pub async fn get_area_stats(&self, address: &str) -> AreaPriceStat {
        let locality = self.resolver.resolve(address);
        let area_name = locality.area_name();
        let now = truncate_to_millis(self.clock.now());

        match self.cache.get(&area_name).await {
            Ok(Some(entry)) if entry.is_fresh(now) => {
                self.stats.record_cache_hit();
                debug!("[CACHE] hit for \"{area_name}\" (valid until {})", entry.cache_valid_until);
                return entry.stat;
            }
            Ok(Some(entry)) => {
                debug!("[CACHE] \"{area_name}\" expired at {}, refreshing", entry.cache_valid_until);
            }
            Ok(None) => debug!("[CACHE] miss for \"{area_name}\""),
            Err(e) => warn!("[CACHE] read failed for \"{area_name}\", treating as miss: {e}"),
        }
        self.stats.record_cache_miss();

        let (stat, ttl) = match self.fetch_from_sources(&locality, &area_name, now).await {
            Some(stat) => {
                info!(
                    event = "AREA_REFRESH",
                    area = %stat.area_name,
                    source = %stat.data_source,
                    price_per_m2 = stat.average_price_per_square_meter,
                    "[AREA] {} | {:.0}/m² | trend {:.1}% | source: {}",
                    stat.area_name, stat.average_price_per_square_meter, stat.trend_percentage, stat.data_source,
                );
                (stat, chrono::Duration::days(CACHE_TTL_DAYS))
            }
            None => {
                self.stats.record_fallback();
                warn!(
                    "[AREA] all price sources failed for \"{area_name}\", using national average {FALLBACK_PRICE_PER_M2}/m²"
                );
                (
                    fallback_stat(area_name.clone(), now),
                    chrono::Duration::minutes(FALLBACK_CACHE_TTL_MINUTES),
                )
            }
        };

        let entry = CachedAreaStat {
            stat: stat.clone(),
            cached_at: now,
            cache_valid_until: now + ttl,
        };
        if let Err(e) = self.cache.upsert(&entry).await {
            warn!("[CACHE] write failed for \"{area_name}\": {e}");
        }
        stat
    }

    async fn fetch_from_sources(
        &self,
        locality: &Locality,
        area_name: &str,
        now: DateTime<Utc>,
    ) -> Option<AreaPriceStat> {
        let lookups = self.sources.iter().map(|ws| async move {
            let outcome = self.query_source(ws, locality).await;
            (ws, outcome)
        });
        let results = join_all(lookups).await;

        let mut answered: Vec<(f64, SourceQuote)> = Vec::new();
        let mut labels: Vec<&str> = Vec::new();
        let mut trend: Option<f64> = None;

        for (ws, outcome) in results {
            let id = ws.source.id();
            match outcome {
                Ok(quote) => {
                    debug!("[SOURCE] {id} → {:.0}/m² for \"{area_name}\"", quote.price_per_m2);
                    trend = trend.or(quote.trend_percent);
                    labels.push(id);
                    answered.push((ws.weight, quote));
                }
                Err(e) => {
                    self.stats.record_source_failure();
                    warn!("[SOURCE] {id} failed for \"{area_name}\": {e}");
                }
            }
        }

        let average = combine_quotes(&answered)?;
        let premium = regional_premium(&locality.region);
        if premium != 1.0 {
            debug!("[AREA] regional premium x{premium} for \"{}\"", locality.region);
        }

        Some(AreaPriceStat {
            area_name: area_name.to_string(),
            average_price_per_square_meter: average * premium,
            data_source: labels.join("+"),
            trend_percentage: trend.unwrap_or(FALLBACK_TREND_PERCENT),
            last_updated: now,
        })
    }

    /// One source call, bounded by the source timeout. A timeout is a failure.
    async fn query_source(&self, ws: &WeightedSource, locality: &Locality) -> Result<SourceQuote> {
        let id = ws.source.id();
        match tokio::time::timeout(self.source_timeout, ws.source.fetch(locality)).await {
            Ok(Ok(quote)) => quote.validated(id),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AppError::SourceUnavailable {
                source_id: id.to_string(),
                message: format!("timed out after {:?}", self.source_timeout),
            }),
        }
    }
}

/// Multiplier for regions known to trade above the national average.
pub fn regional_premium(region: &str) -> f64 {
    let region = region.to_lowercase();
    REGIONAL_PREMIUMS
        .iter()
        .find(|(marker, _)| region.contains(marker))
        .map(|(_, factor)| *factor)
        .unwrap_or(1.0)
}

fn fallback_stat(area_name: String, now: DateTime<Utc>) -> AreaPriceStat {
    AreaPriceStat {
        area_name,
        average_price_per_square_meter: FALLBACK_PRICE_PER_M2,
        data_source: FALLBACK_SOURCE_LABEL.to_string(),
        trend_percentage: FALLBACK_TREND_PERCENT,
        last_updated: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::clock::ManualClock;
    use crate::area::testing::{normalizer, ScriptedSource};
    use crate::state::MemoryStatCache;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn both_sources_are_weighted() {
        let primary = ScriptedSource::ok("ine", 2000.0, Some(4.2));
        let secondary = ScriptedSource::ok("pordata", 1000.0, None);
        let n = normalizer(vec![(primary, 0.7), (secondary, 0.3)], Arc::new(ManualClock::new(t0())));

        let stat = n.get_area_stats("Braga").await;
        assert!((stat.average_price_per_square_meter - 1700.0).abs() < 1e-9);
        assert_eq!(stat.data_source, "ine+pordata");
        assert_eq!(stat.trend_percentage, 4.2);
        assert_eq!(stat.area_name, "Braga");
        assert_eq!(stat.last_updated, t0());
    }

    #[tokio::test]
    async fn lone_secondary_answer_uses_default_trend() {
        let primary = ScriptedSource::failing("ine");
        let secondary = ScriptedSource::ok("pordata", 1200.0, None);
        let n = normalizer(vec![(primary, 0.7), (secondary, 0.3)], Arc::new(ManualClock::new(t0())));

        let stat = n.get_area_stats("Coimbra").await;
        assert!((stat.average_price_per_square_meter - 1200.0).abs() < 1e-9);
        assert_eq!(stat.data_source, "pordata");
        assert_eq!(stat.trend_percentage, FALLBACK_TREND_PERCENT);
        assert_eq!(n.stats().source_failures(), 1);
    }

    #[tokio::test]
    async fn regional_premium_applies_to_source_figures() {
        let n = normalizer(
            vec![(ScriptedSource::ok("ine", 1000.0, None), 0.7)],
            Arc::new(ManualClock::new(t0())),
        );
        let stat = n.get_area_stats("Rua Augusta 10, Lisboa, Portugal").await;
        assert!((stat.average_price_per_square_meter - 1400.0).abs() < 1e-9);

        let stat = n.get_area_stats("Lagos, Faro, Algarve").await;
        assert!((stat.average_price_per_square_meter - 1300.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failing_sources_degrade_to_fallback() {
        let primary = ScriptedSource::failing("ine");
        let secondary = ScriptedSource::failing("pordata");
        let clock = Arc::new(ManualClock::new(t0()));
        let n = normalizer(vec![(primary.clone(), 0.7), (secondary, 0.3)], clock.clone());

        let stat = n.get_area_stats("Rua Augusta 10, Lisboa").await;
        assert_eq!(stat.average_price_per_square_meter, FALLBACK_PRICE_PER_M2);
        assert_eq!(stat.data_source, "fallback");
        assert_eq!(stat.trend_percentage, FALLBACK_TREND_PERCENT);
        assert_eq!(n.stats().fallbacks(), 1);

        // the fallback is cached briefly, then the sources are asked again
        let cached = n.get_area_stats("Rua Augusta 10, Lisboa").await;
        assert_eq!(cached, stat);
        assert_eq!(primary.calls(), 1);
        assert_eq!(n.stats().cache_hits(), 1);

        clock.advance(chrono::Duration::minutes(FALLBACK_CACHE_TTL_MINUTES));
        let retried = n.get_area_stats("Rua Augusta 10, Lisboa").await;
        assert_eq!(primary.calls(), 2);
        assert_eq!(retried.data_source, "fallback");
        assert_eq!(n.stats().fallbacks(), 2);
    }

    #[tokio::test]
    async fn fallback_entry_is_replaced_once_sources_recover() {
        let cache = Arc::new(MemoryStatCache::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let down = AreaPriceNormalizer::new(
            vec![WeightedSource::new(ScriptedSource::failing("ine"), 0.7)],
            cache.clone(),
            Duration::from_secs(1),
        )
        .with_clock(clock.clone());
        assert_eq!(down.get_area_stats("Braga").await.data_source, "fallback");

        let up = AreaPriceNormalizer::new(
            vec![WeightedSource::new(ScriptedSource::ok("ine", 1800.0, None), 0.7)],
            cache,
            Duration::from_secs(1),
        )
        .with_clock(clock.clone());
        assert_eq!(up.get_area_stats("Braga").await.data_source, "fallback");

        clock.advance(chrono::Duration::minutes(FALLBACK_CACHE_TTL_MINUTES + 1));
        let stat = up.get_area_stats("Braga").await;
        assert_eq!(stat.data_source, "ine");
        assert!((stat.average_price_per_square_meter - 1800.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn slow_source_times_out() {
        let slow = ScriptedSource::ok("ine", 2000.0, None).with_delay(Duration::from_secs(5));
        let cache = Arc::new(MemoryStatCache::new());
        let n = AreaPriceNormalizer::new(
            vec![WeightedSource::new(slow, 0.7)],
            cache,
            Duration::from_millis(50),
        );
        let stat = n.get_area_stats("Porto").await;
        assert_eq!(stat.data_source, "fallback");
        assert_eq!(n.stats().source_failures(), 1);
    }

    #[tokio::test]
    async fn cached_stat_is_reused_within_ttl_and_refreshed_after() {
        let source = ScriptedSource::ok("ine", 2000.0, Some(3.0));
        let clock = Arc::new(ManualClock::new(t0()));
        let n = normalizer(vec![(source.clone(), 0.7)], clock.clone());

        let first = n.get_area_stats("Braga").await;
        assert_eq!(source.calls(), 1);

        clock.advance(chrono::Duration::days(6));
        let reused = n.get_area_stats("Braga").await;
        assert_eq!(reused, first);
        assert_eq!(source.calls(), 1);
        assert_eq!(n.stats().cache_hits(), 1);

        clock.advance(chrono::Duration::days(2));
        let refreshed = n.get_area_stats("Braga").await;
        assert_eq!(source.calls(), 2);
        assert_eq!(refreshed.last_updated, t0() + chrono::Duration::days(8));
    }

    #[test]
    fn premium_markers() {
        assert_eq!(regional_premium("Cascais, Lisboa"), 1.4);
        assert_eq!(regional_premium("Vila Nova de Gaia, PORTO"), 1.2);
        assert_eq!(regional_premium("Albufeira, Algarve"), 1.3);
        assert_eq!(regional_premium("Braga"), 1.0);
        assert_eq!(regional_premium(""), 1.0);
    }
}
