use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{PanelResponse, Restaurant},
    routes::AppState,
    services::{panels, providers::yelp::RestaurantQuery},
};

const DEFAULT_LIMIT: u32 = 20;
const DEFAULT_RADIUS_MILES: f64 = 10.0;

#[derive(Debug, Default, Deserialize)]
pub struct RestaurantParams {
    /// City or address, used when no coordinates are given
    location: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    term: Option<String>,
    radius: Option<f64>,
    limit: Option<u32>,
    api_key: Option<String>,
    #[serde(default)]
    hide_dismissed: bool,
}

/// Handler for restaurant search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RestaurantParams>,
) -> AppResult<Json<PanelResponse<Restaurant>>> {
    // A city search does not need the location memo
    let origin = match (params.lat, params.lon, params.location.as_deref()) {
        (None, None, Some(location)) if !location.trim().is_empty() => None,
        _ => match state.resolve_origin(params.lat, params.lon, false, false)? {
            Ok(origin) => Some(origin),
            Err(empty) => return Ok(Json(PanelResponse::empty(empty))),
        },
    };

    let query = RestaurantQuery {
        location: params.location,
        origin,
        term: params.term,
        radius_miles: params.radius.unwrap_or(DEFAULT_RADIUS_MILES),
        limit: params.limit.unwrap_or(DEFAULT_LIMIT),
        api_key: params.api_key,
    };

    let panel =
        panels::restaurants(&state.yelp, &state.preferences, query, params.hide_dismissed).await?;
    Ok(Json(panel))
}
