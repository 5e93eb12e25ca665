use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{PreferenceDomain, PreferenceMap, PreferenceStatus},
    routes::AppState,
};

fn parse_domain(raw: &str) -> AppResult<PreferenceDomain> {
    raw.parse().map_err(AppError::NotFound)
}

/// Handler returning every stored preference of a domain
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
) -> AppResult<Json<PreferenceMap>> {
    let domain = parse_domain(&domain)?;
    Ok(Json(state.preferences.load(domain)?))
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub status: PreferenceStatus,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub item_id: String,
    /// Status after the toggle; `None` when the toggle cleared it
    pub status: Option<PreferenceStatus>,
}

/// Handler toggling one item's status. Sending the current status clears it.
pub async fn toggle(
    State(state): State<Arc<AppState>>,
    Path((domain, item_id)): Path<(String, String)>,
    Json(request): Json<ToggleRequest>,
) -> AppResult<Json<ToggleResponse>> {
    let domain = parse_domain(&domain)?;
    let status = state.preferences.toggle(domain, &item_id, request.status)?;
    Ok(Json(ToggleResponse { item_id, status }))
}

/// Handler removing whatever status an item has
pub async fn clear(
    State(state): State<Arc<AppState>>,
    Path((domain, item_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    let domain = parse_domain(&domain)?;
    state.preferences.clear(domain, &item_id)?;
    Ok(StatusCode::NO_CONTENT)
}
