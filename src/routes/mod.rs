use axum::{
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::Config,
    db::{redis::RedisCache, CachePolicy, KeyValueStore, ResponseCache},
    error::{AppError, AppResult},
    middleware::{make_span_with_request_id, request_id_middleware},
    models::{Coordinates, EmptyState},
    services::{
        geo::LocationResolver,
        providers::{
            api_ninjas::ApiNinjasProvider, eventbrite::EventbriteProvider,
            spoonacular::SpoonacularProvider, spotify::SpotifyProvider,
            ticketmaster::TicketmasterProvider, tmdb::TmdbProvider, yelp::YelpProvider,
        },
        LatestOnly, PreferenceService, RecipeSearch, ShowsService,
    },
};

pub mod events;
pub mod movies;
pub mod preferences;
pub mod recipes;
pub mod restaurants;
pub mod session;
pub mod shows;
pub mod spotify;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn KeyValueStore>,
    pub preferences: PreferenceService,
    pub ticketmaster: Arc<TicketmasterProvider>,
    pub eventbrite: EventbriteProvider,
    pub eventbrite_searches: LatestOnly,
    pub spotify: Arc<SpotifyProvider>,
    pub recipes: RecipeSearch,
    pub yelp: YelpProvider,
    pub tmdb: TmdbProvider,
    pub shows: ShowsService,
}

impl AppState {
    /// Builds every provider from the configuration. Response caches live in
    /// Redis when a cache is given, otherwise in-process backed by `store`.
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        redis: Option<RedisCache>,
    ) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("decision-maker/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let policy = CachePolicy::new(config.cache_ttl_secs, config.cache_capacity);
        let cache = |namespace: &'static str| match &redis {
            Some(redis) => ResponseCache::redis(namespace, policy, redis.clone()),
            None => ResponseCache::local(namespace, policy, store.clone()),
        };

        let preferences = PreferenceService::new(store.clone());

        let ticketmaster = Arc::new(TicketmasterProvider::new(
            http_client.clone(),
            config.ticketmaster_api_key.clone(),
            config.ticketmaster_api_url.clone(),
            cache("ticketmaster"),
        ));
        let eventbrite = EventbriteProvider::new(
            http_client.clone(),
            config.eventbrite_token.clone(),
            config.eventbrite_api_url.clone(),
            cache("eventbrite"),
            store.clone(),
        );
        let spotify = Arc::new(SpotifyProvider::new(
            http_client.clone(),
            config.spotify_client_id.clone(),
            config.spotify_redirect_uri.clone(),
            config.spotify_api_url.clone(),
            config.spotify_accounts_url.clone(),
            store.clone(),
        ));
        let recipes = RecipeSearch::new(
            Arc::new(SpoonacularProvider::new(
                http_client.clone(),
                config.spoonacular_api_key.clone(),
                config.spoonacular_api_url.clone(),
            )),
            Arc::new(ApiNinjasProvider::new(
                http_client.clone(),
                config.api_ninjas_key.clone(),
                config.api_ninjas_url.clone(),
            )),
            cache("recipes"),
        );
        let yelp = YelpProvider::new(
            http_client.clone(),
            config.yelp_api_key.clone(),
            config.yelp_api_url.clone(),
            cache("restaurants"),
        );
        let tmdb = TmdbProvider::new(
            http_client,
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
            cache("movies"),
        );
        let shows = ShowsService::new(
            ticketmaster.clone(),
            spotify.clone(),
            preferences.clone(),
            store.clone(),
        );

        Ok(Self {
            config,
            store,
            preferences,
            ticketmaster,
            eventbrite,
            eventbrite_searches: LatestOnly::new(),
            spotify,
            recipes,
            yelp,
            tmdb,
            shows,
        })
    }

    /// Works out where the user is for a location-based panel.
    ///
    /// `denied` records a refused location prompt. Coordinates must come as a
    /// pair. `Err(EmptyState)` means the panel should render that empty state.
    pub fn resolve_origin(
        &self,
        lat: Option<f64>,
        lon: Option<f64>,
        denied: bool,
        retry: bool,
    ) -> AppResult<Result<Coordinates, EmptyState>> {
        let resolver = LocationResolver::new(self.store.as_ref());
        if denied {
            resolver.deny()?;
            return Ok(Err(EmptyState::LocationDenied));
        }

        let supplied = match (lat, lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::checked(lat, lon).ok_or_else(|| {
                AppError::InvalidInput("Latitude or longitude out of range".to_string())
            })?),
            (None, None) => None,
            _ => {
                return Err(AppError::InvalidInput(
                    "Latitude and longitude must be given together".to_string(),
                ))
            }
        };
        resolver.resolve(supplied, retry)
    }
}

/// Creates the application router with all routes.
///
/// The request-id layer is outermost so the trace span can pick the ID up.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Names used by cloud-function hosting
        .route("/spoonacularProxy", get(recipes::search))
        .route("/tmdbConfig", get(session::tmdb_config))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)),
        )
}

/// API routes under /api
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/spotify-client-id", get(spotify::client_id))
        .route("/tmdb-config", get(session::tmdb_config))
        .route("/ticketmaster", get(events::ticketmaster))
        .route("/comedy", get(events::comedy))
        .route("/eventbrite", get(events::eventbrite))
        .route("/shows", get(shows::discover))
        .route("/shows/config", get(shows::get_config).put(shows::put_config))
        .route("/spoonacular", get(recipes::search))
        .route("/restaurants", get(restaurants::search))
        .route("/movies", get(movies::list))
        .route("/spotify/login", get(spotify::login))
        .route("/spotify/callback", get(spotify::callback))
        .route("/spotify/top-artists", get(spotify::top_artists))
        .route("/spotify/token", delete(spotify::disconnect))
        .route("/preferences/:domain", get(preferences::list))
        .route(
            "/preferences/:domain/:item_id",
            post(preferences::toggle).delete(preferences::clear),
        )
        .route("/last-search", get(session::get_last_search).put(session::put_last_search))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
