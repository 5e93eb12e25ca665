/// Spotify Web API provider
///
/// Login uses the authorization-code flow with PKCE, so no client secret is
/// needed. The access token is kept in the store; there is no refresh: a 401
/// from any API call drops the token and the user connects again.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    db::store::{load_json, save_json, KeyValueStore},
    error::{AppError, AppResult},
    models::Provider,
    services::pkce,
    services::providers::{check_status, read_json, text, Artist, ArtistSource},
};

const TOKEN_KEY: &str = "spotifyTokenV1";
const PENDING_KEY: &str = "spotifyPkceV1";
const SCOPES: [&str; 1] = ["user-top-read"];
/// The recommendations endpoint accepts at most five seeds
const MAX_SEEDS: usize = 5;

/// Verifier and state stored between the redirect and the callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingLogin {
    state: String,
    verifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredToken {
    pub access_token: String,
    pub scope: Option<String>,
    pub obtained_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Clone)]
pub struct SpotifyProvider {
    http_client: HttpClient,
    client_id: Option<String>,
    redirect_uri: String,
    api_url: String,
    accounts_url: String,
    store: Arc<dyn KeyValueStore>,
}

impl SpotifyProvider {
    pub fn new(
        http_client: HttpClient,
        client_id: Option<String>,
        redirect_uri: String,
        api_url: String,
        accounts_url: String,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            http_client,
            client_id,
            redirect_uri,
            api_url,
            accounts_url,
            store,
        }
    }

    pub fn client_id(&self) -> AppResult<&str> {
        self.client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::MissingConfig("Spotify client ID".to_string()))
    }

    /// Starts a login: remembers a fresh verifier and state, and returns the
    /// URL to send the user to
    pub fn begin_login(&self) -> AppResult<String> {
        let client_id = self.client_id()?;
        let verifier = pkce::generate_code_verifier();
        let state = pkce::generate_state();
        let challenge = pkce::code_challenge(&verifier);

        let url = pkce::authorize_url(
            &format!("{}/authorize", self.accounts_url),
            client_id,
            &self.redirect_uri,
            &challenge,
            &state,
            &SCOPES,
        )?;

        save_json(self.store.as_ref(), PENDING_KEY, &PendingLogin { state, verifier })?;
        tracing::info!("Spotify login started");
        Ok(url)
    }

    /// Finishes a login by exchanging the authorization code for a token
    pub async fn complete_login(&self, code: &str, state: &str) -> AppResult<()> {
        let client_id = self.client_id()?.to_string();
        let pending: PendingLogin = load_json(self.store.as_ref(), PENDING_KEY)?
            .ok_or_else(|| AppError::InvalidInput("No Spotify login in progress".to_string()))?;

        if pending.state != state {
            return Err(AppError::InvalidInput(
                "Spotify login state does not match; start the login again".to_string(),
            ));
        }

        let response = self
            .http_client
            .post(format!("{}/api/token", self.accounts_url))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("client_id", client_id.as_str()),
                ("code_verifier", pending.verifier.as_str()),
            ])
            .send()
            .await?;

        let response = check_status(Provider::Spotify, response).await?;
        let token: TokenResponse = response.json().await.map_err(|e| AppError::Parse {
            provider: Provider::Spotify,
            message: e.to_string(),
        })?;

        save_json(
            self.store.as_ref(),
            TOKEN_KEY,
            &StoredToken {
                access_token: token.access_token,
                scope: token.scope,
                obtained_at: Utc::now(),
            },
        )?;
        self.store.remove(PENDING_KEY)?;

        tracing::info!("Spotify login completed");
        Ok(())
    }

    pub fn stored_token(&self) -> AppResult<Option<StoredToken>> {
        load_json(self.store.as_ref(), TOKEN_KEY)
    }

    pub fn is_connected(&self) -> AppResult<bool> {
        Ok(self.stored_token()?.is_some())
    }

    pub fn disconnect(&self) -> AppResult<()> {
        self.store.remove(TOKEN_KEY)
    }

    /// GET against the Web API with the stored token; a 401 drops the token
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> AppResult<Value> {
        let token = self
            .stored_token()?
            .ok_or_else(|| {
                AppError::Unauthorized("Connect Spotify to match shows to your artists".to_string())
            })?;

        let response = self
            .http_client
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(&token.access_token)
            .query(query)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            tracing::warn!("Spotify token rejected, clearing it");
            self.disconnect()?;
        }

        read_json(Provider::Spotify, response).await
    }
}

#[async_trait::async_trait]
impl ArtistSource for SpotifyProvider {
    async fn top_artists(&self, limit: u32) -> AppResult<Vec<Artist>> {
        let body = self
            .get_json(
                "/v1/me/top/artists",
                &[
                    ("limit", limit.clamp(1, 50).to_string()),
                    ("time_range", "medium_term".to_string()),
                ],
            )
            .await?;
        Ok(parse_artists(&body))
    }

    async fn recommended_artists(&self, seeds: Vec<Artist>) -> AppResult<Vec<Artist>> {
        if seeds.is_empty() {
            return Ok(Vec::new());
        }
        let seed_ids: Vec<&str> = seeds.iter().take(MAX_SEEDS).map(|a| a.id.as_str()).collect();

        let body = self
            .get_json(
                "/v1/recommendations",
                &[
                    ("seed_artists", seed_ids.join(",")),
                    ("limit", "50".to_string()),
                ],
            )
            .await?;
        Ok(parse_track_artists(&body))
    }
}

/// Artists from a `me/top/artists` page
pub fn parse_artists(body: &Value) -> Vec<Artist> {
    body.get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(artist_from).collect())
        .unwrap_or_default()
}

/// Distinct artists across the tracks of a recommendations response
pub fn parse_track_artists(body: &Value) -> Vec<Artist> {
    let mut artists: Vec<Artist> = Vec::new();
    let tracks = body.get("tracks").and_then(Value::as_array);
    for track in tracks.into_iter().flatten() {
        let track_artists = track.get("artists").and_then(Value::as_array);
        for artist in track_artists.into_iter().flatten().filter_map(artist_from) {
            if !artists.iter().any(|a| a.id == artist.id) {
                artists.push(artist);
            }
        }
    }
    artists
}

fn artist_from(raw: &Value) -> Option<Artist> {
    Some(Artist {
        id: text(raw, "/id")?,
        name: text(raw, "/name")?,
        genres: raw
            .get("genres")
            .and_then(Value::as_array)
            .map(|g| g.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default(),
    })
}
