/// Third-party data providers
///
/// Each provider wraps one external API: it builds the request, maps HTTP
/// failures to `AppError::Upstream`, and normalizes the response into the
/// shared display models. Panels that combine providers depend on the traits
/// below so they can be exercised without the network.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::{Coordinates, Event, Provider, Recipe},
};

pub mod api_ninjas;
pub mod eventbrite;
pub mod spoonacular;
pub mod spotify;
pub mod ticketmaster;
pub mod tmdb;
pub mod yelp;

/// Parameters for a venue event search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    pub keyword: Option<String>,
    /// Provider category, e.g. "music" or "comedy"
    pub classification: Option<String>,
    pub origin: Option<Coordinates>,
    pub radius_miles: f64,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub size: u32,
    /// Key supplied by the user, used when the server has none
    pub api_key: Option<String>,
}

/// Source of dated events near a location
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// Search events. Returned events carry coordinates when the provider
    /// knows the venue position; distance is left to the caller.
    async fn search_events(&self, query: &EventQuery) -> AppResult<Vec<Event>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// A music artist the user listens to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Source of the user's listening taste
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ArtistSource: Send + Sync {
    async fn top_artists(&self, limit: u32) -> AppResult<Vec<Artist>>;

    /// Artists of tracks recommended from the given seeds
    async fn recommended_artists(&self, seeds: Vec<Artist>) -> AppResult<Vec<Artist>>;
}

/// Parameters for a recipe search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeQuery {
    pub query: String,
    pub cuisine: Option<String>,
    pub diet: Option<String>,
    pub number: u32,
    pub api_key: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecipeSource: Send + Sync {
    async fn search_recipes(&self, query: &RecipeQuery) -> AppResult<Vec<Recipe>>;

    /// Whether a key is available for this query
    fn is_configured(&self, query: &RecipeQuery) -> bool;

    fn name(&self) -> &'static str;
}

/// Turns a non-success response into `AppError::Upstream`, logging the body
pub(crate) async fn check_status(
    provider: Provider,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!(
        provider = %provider,
        status = %status,
        body = %body,
        "External API request failed"
    );
    Err(AppError::Upstream {
        provider,
        status: status.as_u16(),
    })
}

/// Reads a successful response body as JSON
pub(crate) async fn read_json(provider: Provider, response: reqwest::Response) -> AppResult<Value> {
    let response = check_status(provider, response).await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(provider = %provider, error = %e, "Failed to deserialize response");
        AppError::Parse {
            provider,
            message: e.to_string(),
        }
    })
}

/// Reads a string field that may hold a number, e.g. Ticketmaster's
/// string-encoded coordinates
pub(crate) fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn coordinates_from(
    latitude: Option<&Value>,
    longitude: Option<&Value>,
) -> Option<Coordinates> {
    Coordinates::checked(lenient_f64(latitude)?, lenient_f64(longitude)?)
}

pub(crate) fn text(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Local stand-ins for provider APIs
#[cfg(test)]
pub(crate) mod test_support {
    use axum::http::StatusCode;

    /// Serves `status` with an empty JSON object for every request and
    /// returns the base URL
    pub async fn serve_status(status: StatusCode) -> String {
        let app = axum::Router::new().fallback(move || async move { (status, "{}") });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
