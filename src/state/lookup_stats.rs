//! Counters for area lookups. Updated by the normalizer, read by /health.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct LookupStats {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    /// Individual source failures, including timeouts.
    source_failures: AtomicU64,
    /// Lookups where every source failed and the national average was served.
    fallbacks: AtomicU64,
}

impl LookupStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_source_failure(&self) {
        self.source_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn source_failures(&self) -> u64 {
        self.source_failures.load(Ordering::Relaxed)
    }

    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }
}
