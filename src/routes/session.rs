use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    db::store::{load_json, save_json},
    error::{AppError, AppResult},
    routes::AppState,
    services::providers::tmdb::IMAGE_BASE_URL,
};

const LAST_SEARCH_KEY: &str = "lastSearchV1";

/// TMDB settings the UI needs to build image URLs and call TMDB directly
pub async fn tmdb_config(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let api_key = state.tmdb.api_key(None).ok();
    Ok(Json(json!({
        "configured": api_key.is_some(),
        "apiKey": api_key,
        "imageBaseUrl": IMAGE_BASE_URL,
    })))
}

/// The form values of the last search, per panel; `{}` before the first save
pub async fn get_last_search(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let saved: Option<Value> = load_json(state.store.as_ref(), LAST_SEARCH_KEY)?;
    Ok(Json(saved.unwrap_or_else(|| json!({}))))
}

pub async fn put_last_search(
    State(state): State<Arc<AppState>>,
    Json(search): Json<Value>,
) -> AppResult<Json<Value>> {
    if !search.is_object() {
        return Err(AppError::InvalidInput("Last search must be a JSON object".to_string()));
    }
    save_json(state.store.as_ref(), LAST_SEARCH_KEY, &search)?;
    Ok(Json(search))
}
