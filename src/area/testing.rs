//! Test doubles for the area lookup seams.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::area::clock::Clock;
use crate::area::locality::Locality;
use crate::area::normalizer::AreaPriceNormalizer;
use crate::area::sources::{PriceSource, SourceQuote, WeightedSource};
use crate::error::{AppError, Result};
use crate::state::MemoryStatCache;

/// Source that answers with a fixed quote (or a connection error) and counts calls.
pub struct ScriptedSource {
    id: &'static str,
    quote: Option<SourceQuote>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn ok(id: &'static str, price_per_m2: f64, trend_percent: Option<f64>) -> Arc<Self> {
        Arc::new(Self {
            id,
            quote: Some(SourceQuote { price_per_m2, trend_percent }),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            quote: None,
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            id: self.id,
            quote: self.quote,
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    fn id(&self) -> &str {
        self.id
    }

    async fn fetch(&self, _locality: &Locality) -> Result<SourceQuote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.quote.ok_or_else(|| AppError::SourceUnavailable {
            source_id: self.id.to_string(),
            message: "connection refused".to_string(),
        })
    }
}

/// Normalizer over an in-memory cache with the given sources and clock.
pub fn normalizer(
    sources: Vec<(Arc<ScriptedSource>, f64)>,
    clock: Arc<dyn Clock>,
) -> AreaPriceNormalizer {
    let sources = sources
        .into_iter()
        .map(|(s, w)| WeightedSource::new(s, w))
        .collect();
    AreaPriceNormalizer::new(sources, Arc::new(MemoryStatCache::new()), Duration::from_secs(1))
        .with_clock(clock)
}
