use std::sync::Arc;

use async_trait::async_trait;

use crate::area::locality::Locality;
use crate::error::{AppError, Result};

/// One price-per-m² reading from a statistical source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceQuote {
    pub price_per_m2: f64,
    /// Year-over-year price change in percent, when the source reports it.
    pub trend_percent: Option<f64>,
}

impl SourceQuote {
    /// Reject readings that cannot serve as an area average.
    pub fn validated(self, source_id: &str) -> Result<Self> {
        if self.price_per_m2.is_finite() && self.price_per_m2 > 0.0 {
            Ok(Self {
                trend_percent: self.trend_percent.filter(|t| t.is_finite()),
                ..self
            })
        } else {
            Err(AppError::SourceUnavailable {
                source_id: source_id.to_string(),
                message: format!("unusable price per m²: {}", self.price_per_m2),
            })
        }
    }
}

/// An external statistical source of locality price data.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Short identifier used in logs and in the composed data-source label.
    fn id(&self) -> &str;

    async fn fetch(&self, locality: &Locality) -> Result<SourceQuote>;
}

/// A source together with its share in the combined average.
#[derive(Clone)]
pub struct WeightedSource {
    pub source: Arc<dyn PriceSource>,
    pub weight: f64,
}

impl WeightedSource {
    pub fn new(source: Arc<dyn PriceSource>, weight: f64) -> Self {
        Self { source, weight }
    }
}

/// Fixed figures, used when real sources are switched off by configuration.
#[derive(Debug, Clone)]
pub struct StaticPriceSource {
    id: String,
    quote: SourceQuote,
}

impl StaticPriceSource {
    pub fn new(id: impl Into<String>, price_per_m2: f64, trend_percent: Option<f64>) -> Self {
        Self {
            id: id.into(),
            quote: SourceQuote { price_per_m2, trend_percent },
        }
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self, _locality: &Locality) -> Result<SourceQuote> {
        self.quote.validated(&self.id)
    }
}

/// Weighted average of the quotes that came back. Weights are renormalised over
/// the answering sources, so a lone answer is used as-is. `None` when nothing
/// usable is left.
pub fn combine_quotes(quotes: &[(f64, SourceQuote)]) -> Option<f64> {
    let total_weight: f64 = quotes.iter().map(|(w, _)| *w).filter(|w| *w > 0.0).sum();
    if !(total_weight > 0.0) {
        return None;
    }
    let weighted: f64 = quotes
        .iter()
        .filter(|(w, _)| *w > 0.0)
        .map(|(w, q)| w * q.price_per_m2)
        .sum();
    let average = weighted / total_weight;
    (average.is_finite() && average > 0.0).then_some(average)
}
