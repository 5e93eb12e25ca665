use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Event, PanelResponse, PreferenceDomain},
    routes::AppState,
    services::{
        panels,
        providers::{
            eventbrite::{EventbriteQuery, Scope},
            EventQuery,
        },
    },
};

const EVENT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct VenueEventParams {
    lat: Option<f64>,
    lon: Option<f64>,
    radius: Option<f64>,
    keyword: Option<String>,
    /// "comedy" (default) or "music"
    segment: Option<String>,
    api_key: Option<String>,
    #[serde(default)]
    denied: bool,
    #[serde(default)]
    retry: bool,
    #[serde(default)]
    hide_dismissed: bool,
}

fn segment_domain(segment: Option<&str>) -> AppResult<(&'static str, PreferenceDomain)> {
    match segment.map(|s| s.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("comedy") => Ok(("comedy", PreferenceDomain::Comedy)),
        Some("music") => Ok(("music", PreferenceDomain::Shows)),
        Some(other) => Err(AppError::InvalidInput(format!(
            "Unknown segment '{}': use comedy or music",
            other
        ))),
    }
}

/// Handler for Ticketmaster event search near the user
pub async fn ticketmaster(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<VenueEventParams>,
) -> AppResult<Json<PanelResponse<Event>>> {
    let (classification, domain) = segment_domain(params.segment.as_deref())?;

    let origin = match state.resolve_origin(params.lat, params.lon, params.denied, params.retry)? {
        Ok(origin) => origin,
        Err(empty) => return Ok(Json(PanelResponse::empty(empty))),
    };

    tracing::info!(
        request_id = %request_id,
        classification,
        "Searching Ticketmaster events"
    );

    let query = EventQuery {
        keyword: params.keyword,
        classification: Some(classification.to_string()),
        radius_miles: params.radius.unwrap_or(state.config.default_radius_miles),
        size: EVENT_PAGE_SIZE,
        api_key: params.api_key,
        ..EventQuery::default()
    };

    let panel = panels::nearby_events(
        state.ticketmaster.as_ref(),
        &state.preferences,
        domain,
        origin,
        query,
        params.hide_dismissed,
    )
    .await?;
    Ok(Json(panel))
}

/// Handler for the comedy panel
pub async fn comedy(
    state: State<Arc<AppState>>,
    request_id: Extension<RequestId>,
    Query(mut params): Query<VenueEventParams>,
) -> AppResult<Json<PanelResponse<Event>>> {
    params.segment = Some("comedy".to_string());
    ticketmaster(state, request_id, Query(params)).await
}

#[derive(Debug, Default, Deserialize)]
pub struct EventbriteParams {
    lat: Option<f64>,
    lon: Option<f64>,
    radius: Option<f64>,
    date: Option<String>,
    scope: Option<String>,
    keyword: Option<String>,
    token: Option<String>,
    #[serde(default)]
    denied: bool,
    #[serde(default)]
    retry: bool,
    #[serde(default)]
    hide_dismissed: bool,
}

/// Handler for Eventbrite search
pub async fn eventbrite(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<EventbriteParams>,
) -> AppResult<Json<PanelResponse<Event>>> {
    let scope = Scope::parse(params.scope.as_deref())?;

    let origin = match state.resolve_origin(params.lat, params.lon, params.denied, params.retry)? {
        Ok(origin) => origin,
        Err(empty) => return Ok(Json(PanelResponse::empty(empty))),
    };

    let query = EventbriteQuery {
        origin,
        radius_miles: params.radius.unwrap_or(state.config.default_radius_miles),
        date: params.date.map(|d| d.trim().to_lowercase()).filter(|d| !d.is_empty()),
        scope,
        keyword: params.keyword,
        token: params.token,
    };

    tracing::info!(
        request_id = %request_id,
        date = ?query.date,
        scope = ?query.scope,
        "Searching Eventbrite events"
    );

    let panel = panels::eventbrite_events(
        &state.eventbrite,
        &state.eventbrite_searches,
        &state.preferences,
        query,
        params.hide_dismissed,
    )
    .await?;
    Ok(Json(panel))
}
