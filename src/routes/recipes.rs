use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{PanelResponse, Recipe},
    routes::AppState,
    services::{panels, providers::RecipeQuery},
};

#[derive(Debug, Deserialize)]
pub struct RecipeParams {
    q: String,
    cuisine: Option<String>,
    diet: Option<String>,
    number: Option<u32>,
    api_key: Option<String>,
    #[serde(default)]
    hide_dismissed: bool,
}

/// Handler for recipe search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecipeParams>,
) -> AppResult<Json<PanelResponse<Recipe>>> {
    let query = RecipeQuery {
        query: params.q,
        cuisine: params.cuisine,
        diet: params.diet,
        number: params.number.unwrap_or_default(),
        api_key: params.api_key,
    };

    let panel =
        panels::recipes(&state.recipes, &state.preferences, query, params.hide_dismissed).await?;
    Ok(Json(panel))
}
