use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{Movie, PanelResponse},
    routes::AppState,
    services::{panels, providers::tmdb::MovieQuery},
};

#[derive(Debug, Default, Deserialize)]
pub struct MovieParams {
    q: Option<String>,
    page: Option<u32>,
    api_key: Option<String>,
    #[serde(default)]
    hide_dismissed: bool,
}

/// Handler for the movies panel: popular movies, or a title search with `q`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MovieParams>,
) -> AppResult<Json<PanelResponse<Movie>>> {
    let query = MovieQuery {
        query: params.q,
        page: params.page.unwrap_or(1),
        api_key: params.api_key,
    };

    let panel =
        panels::movies(&state.tmdb, &state.preferences, query, params.hide_dismissed).await?;
    Ok(Json(panel))
}
