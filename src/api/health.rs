//! GET /health: liveness plus area lookup counters.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::routes::ApiState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache_backend: &'static str,
    pub price_sources: Vec<String>,
    pub extraction_enabled: bool,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub source_failures: u64,
    pub fallbacks: u64,
}

pub async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let normalizer = state.valuator.normalizer();
    let stats = normalizer.stats();
    Json(HealthResponse {
        status: "ok",
        cache_backend: normalizer.cache_backend(),
        price_sources: normalizer.source_ids(),
        extraction_enabled: state.extractor.is_some(),
        cache_hits: stats.cache_hits(),
        cache_misses: stats.cache_misses(),
        source_failures: stats.source_failures(),
        fallbacks: stats.fallbacks(),
    })
}
