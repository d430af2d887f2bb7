use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::api::health::get_health;
use crate::error::AppError;
use crate::extraction::ListingExtractor;
use crate::types::{
    AreaPriceStat, ExtractedListing, ListingAnalysis, ListingDetails, PropertyValuationInput,
    PropertyValuationResult,
};
use crate::valuation::{round_currency, Valuator};

#[derive(Clone)]
pub struct ApiState {
    pub valuator: Arc<Valuator>,
    /// Absent when no model API key is configured.
    pub extractor: Option<Arc<dyn ListingExtractor>>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/analyze-content", post(analyze_content))
        .route("/valuations", post(create_valuation))
        .route("/area-stats", get(get_area_stats))
        .route("/health", get(get_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct AnalyzeContentRequest {
    pub content: String,
}

#[derive(Deserialize)]
pub struct AreaStatsQuery {
    pub address: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Paste-to-analyze: extract listing fields from free text, then value them.
async fn analyze_content(
    State(state): State<ApiState>,
    Json(req): Json<AnalyzeContentRequest>,
) -> Result<Json<ListingAnalysis>, AppError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::InvalidInput("content must not be empty".to_string()));
    }
    let extractor = state
        .extractor
        .as_ref()
        .ok_or_else(|| AppError::NotConfigured("listing extraction needs OPENAI_API_KEY".to_string()))?;

    let preview: String = content.chars().take(100).collect();
    info!("[API] analyze-content: \"{preview}\"");

    let listing = extractor.extract(content).await?;
    let input = valuation_input_from_listing(&listing);
    let valuation = state.valuator.compute_valuation(&input).await?;

    Ok(Json(listing_analysis(listing, valuation)))
}

/// Manual entry: the caller supplies the fields directly.
async fn create_valuation(
    State(state): State<ApiState>,
    Json(input): Json<PropertyValuationInput>,
) -> Result<Json<PropertyValuationResult>, AppError> {
    let result = state.valuator.compute_valuation(&input).await?;
    Ok(Json(result))
}

async fn get_area_stats(
    State(state): State<ApiState>,
    Query(params): Query<AreaStatsQuery>,
) -> Result<Json<AreaPriceStat>, AppError> {
    let address = params
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::InvalidInput("address is required".to_string()))?;

    Ok(Json(state.valuator.normalizer().get_area_stats(address).await))
}

// ---------------------------------------------------------------------------
// Listing → valuation mapping
// ---------------------------------------------------------------------------

/// Extracted price and area are rounded to whole units; a missing price
/// becomes 0 and is rejected by the valuation.
fn valuation_input_from_listing(listing: &ExtractedListing) -> PropertyValuationInput {
    PropertyValuationInput {
        price: Some(listing.price.map(round_currency).unwrap_or(0.0)),
        monthly_rent: None,
        monthly_expenses: None,
        area_square_meters: listing.square_meters.map(round_currency).filter(|m2| *m2 > 0.0),
        description: listing.description.clone(),
        address: listing.address.clone(),
    }
}

fn listing_analysis(listing: ExtractedListing, v: PropertyValuationResult) -> ListingAnalysis {
    let details = ListingDetails {
        bedrooms: listing.bedrooms,
        bathrooms: listing.bathrooms,
        square_meters: listing.square_meters.map(|m2| m2.to_string()),
        description: listing
            .description
            .unwrap_or_else(|| "No description available".to_string()),
        price_per_meter: v.price_per_square_meter,
        area_average: v.area.as_ref().map(|a| a.average_price_per_square_meter),
        difference_percent: v.area_difference_percent,
        area_name: v.area.as_ref().map(|a| a.area_name.clone()),
        rent_yield_percentage: format!("{:.1}%", v.rent_yield_percent),
        expense_percentage: format!("{:.1}%", v.expense_ratio_percent),
    };

    ListingAnalysis {
        address: listing.address.unwrap_or_else(|| "Address not found".to_string()),
        price: v.price,
        monthly_rent: v.monthly_rent,
        estimated_expenses: v.monthly_expenses,
        roi: v.roi_percent,
        details,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
