//! Listing field extraction for the paste-to-analyze flow.
//!
//! A language model turns free-form listing text into structured fields.
//! This sits in front of the valuation and is never called by it.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::fetcher::json_number;
use crate::types::ExtractedListing;

const EXTRACTION_TIMEOUT_SECS: u64 = 60;

const SYSTEM_PROMPT: &str = "You extract structured data from real estate listings. \
Use the main living or usable area and ignore land or lot size. Report area in square meters \
(1 sq ft = 0.092903 m²). Report price in euros (1 USD = 0.92 EUR). \
Use null for anything not found. Reply with a single JSON object and nothing else; \
numeric values must be JSON numbers.";

#[async_trait]
pub trait ListingExtractor: Send + Sync {
    async fn extract(&self, content: &str) -> Result<ExtractedListing>;
}

/// Chat-completions client for an OpenAI-compatible endpoint.
pub struct OpenAiExtractor {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiExtractor {
    /// `None` when no API key is configured.
    pub fn from_config(cfg: &Config) -> Result<Option<Self>> {
        let Some(api_key) = cfg.openai_api_key.clone() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(EXTRACTION_TIMEOUT_SECS))
            .build()?;
        Ok(Some(Self {
            client,
            api_url: cfg.openai_api_url.clone(),
            api_key,
            model: cfg.openai_model.clone(),
        }))
    }

    fn request_body(&self, content: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "temperature": 0.1,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!(
                        "Return a JSON object with exactly these keys: \
                         address (string), price (number), bedrooms (number or null), \
                         bathrooms (number or null), square_meters (number), \
                         description (short summary of key features).\n\nListing:\n{content}"
                    ),
                },
            ],
        })
    }
}

#[async_trait]
impl ListingExtractor for OpenAiExtractor {
    async fn extract(&self, content: &str) -> Result<ExtractedListing> {
        info!("[EXTRACT] sending {} chars to {}", content.len(), self.model);

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(content))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Extraction(format!("model API returned {status}: {body}")));
        }

        let resp: serde_json::Value = resp.json().await?;
        let message = resp
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| AppError::Extraction("model response has no message content".to_string()))?;

        debug!("[EXTRACT] raw model output: {message}");
        parse_extracted_listing(message)
    }
}

/// Parse model output into listing fields. Markdown code fences are tolerated;
/// numbers may arrive as numeric strings.
pub fn parse_extracted_listing(raw: &str) -> Result<ExtractedListing> {
    let cleaned = strip_code_fences(raw);
    let v: serde_json::Value = serde_json::from_str(cleaned)
        .map_err(|e| AppError::Extraction(format!("model output is not valid JSON: {e}")))?;
    if !v.is_object() {
        return Err(AppError::Extraction("model output is not a JSON object".to_string()));
    }

    let text = |key: &str| {
        v.get(key)
            .and_then(|x| x.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let count = |key: &str| {
        v.get(key).and_then(|x| match x {
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
    };

    Ok(ExtractedListing {
        address: text("address"),
        price: v.get("price").and_then(json_number),
        bedrooms: count("bedrooms"),
        bathrooms: count("bathrooms"),
        square_meters: v.get("square_meters").and_then(json_number),
        description: text("description"),
    })
}

fn strip_code_fences(raw: &str) -> &str {
    let s = raw.trim();
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    s.strip_suffix("```").unwrap_or(s).trim()
}
