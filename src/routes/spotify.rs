use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    routes::AppState,
    services::providers::{Artist, ArtistSource},
};

/// The client ID is public; the UI needs it to show whether Spotify is set up
pub async fn client_id(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let client_id = state.spotify.client_id().ok().map(str::to_string);
    Ok(Json(json!({
        "clientId": client_id,
        "connected": state.spotify.is_connected()?,
    })))
}

/// Starts the PKCE login by redirecting to Spotify
pub async fn login(State(state): State<Arc<AppState>>) -> AppResult<Redirect> {
    let url = state.spotify.begin_login()?;
    Ok(Redirect::to(&url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Spotify redirects back here after the user approves or denies access
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> AppResult<Json<Value>> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Spotify login was not approved");
        return Err(AppError::Unauthorized(format!("Spotify login failed: {}", error)));
    }

    let (Some(code), Some(login_state)) = (params.code, params.state) else {
        return Err(AppError::InvalidInput(
            "Spotify callback is missing the code or state".to_string(),
        ));
    };

    state.spotify.complete_login(&code, &login_state).await?;
    Ok(Json(json!({ "connected": true })))
}

#[derive(Debug, Deserialize)]
pub struct TopArtistParams {
    limit: Option<u32>,
}

pub async fn top_artists(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopArtistParams>,
) -> AppResult<Json<Vec<Artist>>> {
    let artists = state.spotify.top_artists(params.limit.unwrap_or(20)).await?;
    Ok(Json(artists))
}

/// Forgets the stored access token
pub async fn disconnect(State(state): State<Arc<AppState>>) -> AppResult<StatusCode> {
    state.spotify.disconnect()?;
    tracing::info!("Spotify disconnected");
    Ok(StatusCode::NO_CONTENT)
}
