use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::area::locality::Locality;
use crate::area::sources::{PriceSource, SourceQuote, StaticPriceSource, WeightedSource};
use crate::config::{
    Config, FALLBACK_PRICE_PER_M2, FALLBACK_TREND_PERCENT, PRIMARY_SOURCE_WEIGHT,
    SECONDARY_SOURCE_WEIGHT,
};
use crate::error::{AppError, Result};

/// Price source backed by a JSON HTTP endpoint.
///
/// `url_template` has `{municipality}` substituted (URL-encoded). The price and
/// optional trend are read from the response with JSON pointers, accepting
/// either numbers or numeric strings.
pub struct HttpPriceSource {
    id: String,
    client: reqwest::Client,
    url_template: String,
    price_pointer: String,
    trend_pointer: Option<String>,
}

impl HttpPriceSource {
    pub fn new(
        id: impl Into<String>,
        url_template: impl Into<String>,
        price_pointer: impl Into<String>,
        trend_pointer: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            id: id.into(),
            client,
            url_template: url_template.into(),
            price_pointer: price_pointer.into(),
            trend_pointer,
        })
    }

    fn url_for(&self, locality: &Locality) -> String {
        self.url_template
            .replace("{municipality}", &urlencoding::encode(&locality.municipality))
            .replace("{district}", &urlencoding::encode(&locality.district))
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self, locality: &Locality) -> Result<SourceQuote> {
        let url = self.url_for(locality);
        debug!("[SOURCE] {} GET {url}", self.id);

        let resp: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_quote(&self.id, &resp, &self.price_pointer, self.trend_pointer.as_deref())
    }
}

/// Pull a quote out of a source response.
pub fn parse_quote(
    source_id: &str,
    resp: &serde_json::Value,
    price_pointer: &str,
    trend_pointer: Option<&str>,
) -> Result<SourceQuote> {
    let price = resp
        .pointer(price_pointer)
        .and_then(json_number)
        .ok_or_else(|| AppError::SourceUnavailable {
            source_id: source_id.to_string(),
            message: format!("response has no numeric value at {price_pointer}"),
        })?;

    let trend = trend_pointer.and_then(|p| resp.pointer(p)).and_then(json_number);

    SourceQuote {
        price_per_m2: price,
        trend_percent: trend,
    }
    .validated(source_id)
}

/// A JSON number, or a string holding one.
pub fn json_number(v: &serde_json::Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|n: &f64| n.is_finite())
}

/// Build the price sources for this configuration, in priority order.
///
/// With `mock_sources` set, a single static source serves the national
/// figures and no network calls are made.
pub fn configured_sources(cfg: &Config) -> Result<Vec<WeightedSource>> {
    if cfg.mock_sources {
        let source = StaticPriceSource::new("static", FALLBACK_PRICE_PER_M2, Some(FALLBACK_TREND_PERCENT));
        return Ok(vec![WeightedSource::new(Arc::new(source), 1.0)]);
    }

    let timeout = Duration::from_secs(cfg.source_timeout_secs);
    let primary = HttpPriceSource::new(
        "ine",
        cfg.primary_source_url.clone(),
        cfg.primary_price_pointer.clone(),
        cfg.primary_trend_pointer.clone(),
        timeout,
    )?;
    let secondary = HttpPriceSource::new(
        "pordata",
        cfg.secondary_source_url.clone(),
        cfg.secondary_price_pointer.clone(),
        cfg.secondary_trend_pointer.clone(),
        timeout,
    )?;

    Ok(vec![
        WeightedSource::new(Arc::new(primary), PRIMARY_SOURCE_WEIGHT),
        WeightedSource::new(Arc::new(secondary), SECONDARY_SOURCE_WEIGHT),
    ])
}
