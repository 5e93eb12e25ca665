use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use decision_maker::{
    config::Config,
    db::{FileStore, KeyValueStore},
    routes::{create_router, AppState},
};

const AUSTIN_LAT: f64 = 30.2672;
const AUSTIN_LON: f64 = -97.7431;

/// Server with no provider credentials, persisting under `dir`
fn server_in(dir: &TempDir) -> TestServer {
    let config = Config::local(dir.path().to_string_lossy());
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let state = Arc::new(AppState::new(config, store, None).unwrap());
    TestServer::new(create_router(state)).unwrap()
}

fn create_test_server() -> (TestServer, TempDir) {
    let dir = TempDir::new().unwrap();
    (server_in(&dir), dir)
}

#[tokio::test]
async fn test_health_check() {
    let (server, _dir) = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let (server, _dir) = create_test_server();

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("trace-123"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "trace-123");

    let response = server.get("/health").await;
    let generated = response.header("x-request-id");
    assert!(uuid::Uuid::parse_str(generated.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_missing_ticketmaster_key_is_service_unavailable() {
    let (server, _dir) = create_test_server();

    let response = server
        .get("/api/comedy")
        .add_query_param("lat", AUSTIN_LAT)
        .add_query_param("lon", AUSTIN_LON)
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["kind"], "missingConfig");
    assert!(body["error"].as_str().unwrap().contains("Ticketmaster API key"));
}

#[tokio::test]
async fn test_unknown_segment_is_rejected() {
    let (server, _dir) = create_test_server();
    let response = server
        .get("/api/ticketmaster")
        .add_query_param("segment", "sports")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_comedy_without_location_is_location_denied() {
    let (server, _dir) = create_test_server();

    let response = server.get("/api/comedy").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["empty_state"], "locationDenied");
}

#[tokio::test]
async fn test_denied_location_sticks_until_coordinates_arrive() {
    let (server, _dir) = create_test_server();

    let response = server
        .get("/api/eventbrite")
        .add_query_param("denied", true)
        .await;
    assert_eq!(response.json::<Value>()["empty_state"], "locationDenied");

    let response = server.get("/api/shows").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["empty_state"], "locationDenied");
    assert_eq!(body["spotify_connected"], false);
}

#[tokio::test]
async fn test_half_a_coordinate_pair_is_invalid() {
    let (server, _dir) = create_test_server();
    let response = server
        .get("/api/comedy")
        .add_query_param("lat", AUSTIN_LAT)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["kind"], "invalidInput");
}

#[tokio::test]
async fn test_eventbrite_without_token_is_service_unavailable() {
    let (server, _dir) = create_test_server();

    let response = server
        .get("/api/eventbrite")
        .add_query_param("lat", AUSTIN_LAT)
        .add_query_param("lon", AUSTIN_LON)
        .add_query_param("date", "this_weekend")
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.json::<Value>()["error"]
        .as_str()
        .unwrap()
        .contains("Eventbrite token"));
}

#[tokio::test]
async fn test_eventbrite_rejects_unknown_date() {
    let (server, _dir) = create_test_server();

    let response = server
        .get("/api/eventbrite")
        .add_query_param("lat", AUSTIN_LAT)
        .add_query_param("lon", AUSTIN_LON)
        .add_query_param("date", "someday")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recipes_without_keys_are_service_unavailable() {
    let (server, _dir) = create_test_server();

    let response = server.get("/api/spoonacular").add_query_param("q", "pasta").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let response = server.get("/api/spoonacular").add_query_param("q", "  ").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_movies_and_restaurants_without_keys() {
    let (server, _dir) = create_test_server();

    let response = server.get("/api/movies").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let response = server
        .get("/api/restaurants")
        .add_query_param("location", "Austin, TX")
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_public_client_config() {
    let (server, _dir) = create_test_server();

    let spotify: Value = server.get("/api/spotify-client-id").await.json();
    assert_eq!(spotify["clientId"], Value::Null);
    assert_eq!(spotify["connected"], false);

    let tmdb: Value = server.get("/api/tmdb-config").await.json();
    assert_eq!(tmdb["configured"], false);
    assert_eq!(tmdb["imageBaseUrl"], "https://image.tmdb.org/t/p/w500");
}

#[tokio::test]
async fn test_spotify_login_requires_client_id() {
    let (server, _dir) = create_test_server();

    server
        .get("/api/spotify/login")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    server
        .get("/api/spotify/top-artists")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .delete("/api/spotify/token")
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_spotify_callback_reports_denied_login() {
    let (server, _dir) = create_test_server();
    let response = server
        .get("/api/spotify/callback")
        .add_query_param("error", "access_denied")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_preference_toggle_round_trip() {
    let (server, _dir) = create_test_server();

    let response = server
        .post("/api/preferences/movies/27205")
        .json(&json!({ "status": "watched" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["item_id"], "27205");
    assert_eq!(body["status"], "watched");

    let prefs: Value = server.get("/api/preferences/movies").await.json();
    assert_eq!(prefs["27205"]["status"], "watched");

    // Same status again clears it
    let body: Value = server
        .post("/api/preferences/movies/27205")
        .json(&json!({ "status": "watched" }))
        .await
        .json();
    assert_eq!(body["status"], Value::Null);

    let prefs: Value = server.get("/api/preferences/movies").await.json();
    assert_eq!(prefs, json!({}));
}

#[tokio::test]
async fn test_preference_status_replaces_previous() {
    let (server, _dir) = create_test_server();

    server
        .post("/api/preferences/comedy/vvG1")
        .json(&json!({ "status": "interested" }))
        .await
        .assert_status_ok();
    let body: Value = server
        .post("/api/preferences/comedy/vvG1")
        .json(&json!({ "status": "notInterested" }))
        .await
        .json();
    assert_eq!(body["status"], "notInterested");
}

#[tokio::test]
async fn test_preference_validation() {
    let (server, _dir) = create_test_server();

    server
        .post("/api/preferences/comedy/vvG1")
        .json(&json!({ "status": "watched" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .get("/api/preferences/podcasts")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_preferences_survive_restart() {
    let dir = TempDir::new().unwrap();

    server_in(&dir)
        .post("/api/preferences/restaurants/franklin-bbq")
        .json(&json!({ "status": "interested" }))
        .await
        .assert_status_ok();

    let prefs: Value = server_in(&dir).get("/api/preferences/restaurants").await.json();
    assert_eq!(prefs["franklin-bbq"]["status"], "interested");
}

#[tokio::test]
async fn test_shows_config_round_trip() {
    let (server, _dir) = create_test_server();

    let defaults: Value = server.get("/api/shows/config").await.json();
    assert_eq!(defaults["radius_miles"], 100.0);
    assert_eq!(defaults["include_recommendations"], false);

    server
        .put("/api/shows/config")
        .json(&json!({ "radius_miles": 30.0, "days_ahead": 14, "matched_only": true }))
        .await
        .assert_status_ok();

    let saved: Value = server.get("/api/shows/config").await.json();
    assert_eq!(saved["radius_miles"], 30.0);
    assert_eq!(saved["days_ahead"], 14);
    assert_eq!(saved["matched_only"], true);
    assert_eq!(saved["include_recommendations"], false);

    server
        .put("/api/shows/config")
        .json(&json!({ "radius_miles": -5.0 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_last_search_round_trip() {
    let (server, _dir) = create_test_server();

    let empty: Value = server.get("/api/last-search").await.json();
    assert_eq!(empty, json!({}));

    let search = json!({ "eventbrite": { "date": "this_weekend", "scope": "free", "radius": 25 } });
    server.put("/api/last-search").json(&search).await.assert_status_ok();

    let saved: Value = server.get("/api/last-search").await.json();
    assert_eq!(saved, search);

    server
        .put("/api/last-search")
        .json(&json!(["not", "an", "object"]))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_preference_delete_clears_status() {
    let (server, _dir) = create_test_server();

    server
        .post("/api/preferences/recipes/spoonacular-716429")
        .json(&json!({ "status": "interested" }))
        .await
        .assert_status_ok();

    server
        .delete("/api/preferences/recipes/spoonacular-716429")
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let prefs: Value = server.get("/api/preferences/recipes").await.json();
    assert_eq!(prefs, json!({}));

    // Clearing an item with no status is fine
    server
        .delete("/api/preferences/recipes/spoonacular-716429")
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_cloud_function_route_names() {
    let (server, _dir) = create_test_server();

    let tmdb: Value = server.get("/tmdbConfig").await.json();
    assert_eq!(tmdb["configured"], false);

    server
        .get("/spoonacularProxy")
        .add_query_param("q", "pasta")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}
