use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Local;
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::PanelResponse,
    routes::AppState,
    services::shows::{ShowsConfig, ShowsPanel},
};

#[derive(Debug, Default, Deserialize)]
pub struct ShowsParams {
    lat: Option<f64>,
    lon: Option<f64>,
    api_key: Option<String>,
    #[serde(default)]
    denied: bool,
    #[serde(default)]
    retry: bool,
    #[serde(default)]
    hide_dismissed: bool,
}

/// Handler for the shows panel
pub async fn discover(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<ShowsParams>,
) -> AppResult<Json<ShowsPanel>> {
    let origin = match state.resolve_origin(params.lat, params.lon, params.denied, params.retry)? {
        Ok(origin) => origin,
        Err(empty) => {
            return Ok(Json(ShowsPanel {
                panel: PanelResponse::empty(empty),
                spotify_connected: state.spotify.is_connected()?,
            }))
        }
    };

    tracing::info!(request_id = %request_id, "Discovering shows");

    let panel = state
        .shows
        .discover(origin, Local::now().date_naive(), params.api_key, params.hide_dismissed)
        .await?;
    Ok(Json(panel))
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> AppResult<Json<ShowsConfig>> {
    Ok(Json(state.shows.config()?))
}

pub async fn put_config(
    State(state): State<Arc<AppState>>,
    Json(config): Json<ShowsConfig>,
) -> AppResult<Json<ShowsConfig>> {
    state.shows.save_config(&config)?;
    tracing::info!(
        radius_miles = config.radius_miles,
        days_ahead = config.days_ahead,
        "Shows config saved"
    );
    Ok(Json(config))
}
