use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Redis connection URL. When unset, the response cache lives in-process
    /// and is snapshotted to the local store.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Directory for the file-backed preference store
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Response cache time-to-live, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached responses kept per cache namespace
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Search radius used when the request does not specify one
    #[serde(default = "default_radius_miles")]
    pub default_radius_miles: f64,

    // Provider credentials. All optional: a missing key surfaces as an
    // instructional message unless the request supplies its own.
    #[serde(default)]
    pub ticketmaster_api_key: Option<String>,
    #[serde(default)]
    pub eventbrite_token: Option<String>,
    #[serde(default)]
    pub spotify_client_id: Option<String>,
    #[serde(default)]
    pub spoonacular_api_key: Option<String>,
    #[serde(default)]
    pub api_ninjas_key: Option<String>,
    #[serde(default)]
    pub yelp_api_key: Option<String>,
    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    /// Redirect URI registered with the Spotify application
    #[serde(default = "default_spotify_redirect_uri")]
    pub spotify_redirect_uri: String,

    #[serde(default = "default_ticketmaster_api_url")]
    pub ticketmaster_api_url: String,
    #[serde(default = "default_eventbrite_api_url")]
    pub eventbrite_api_url: String,
    #[serde(default = "default_spotify_api_url")]
    pub spotify_api_url: String,
    #[serde(default = "default_spotify_accounts_url")]
    pub spotify_accounts_url: String,
    #[serde(default = "default_spoonacular_api_url")]
    pub spoonacular_api_url: String,
    #[serde(default = "default_api_ninjas_url")]
    pub api_ninjas_url: String,
    #[serde(default = "default_yelp_api_url")]
    pub yelp_api_url: String,
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    21_600 // 6 hours
}

fn default_cache_capacity() -> usize {
    50
}

fn default_radius_miles() -> f64 {
    100.0
}

fn default_spotify_redirect_uri() -> String {
    "http://127.0.0.1:3000/api/spotify/callback".to_string()
}

fn default_ticketmaster_api_url() -> String {
    "https://app.ticketmaster.com".to_string()
}

fn default_eventbrite_api_url() -> String {
    "https://www.eventbriteapi.com".to_string()
}

fn default_spotify_api_url() -> String {
    "https://api.spotify.com".to_string()
}

fn default_spotify_accounts_url() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_spoonacular_api_url() -> String {
    "https://api.spoonacular.com".to_string()
}

fn default_api_ninjas_url() -> String {
    "https://api.api-ninjas.com".to_string()
}

fn default_yelp_api_url() -> String {
    "https://api.yelp.com".to_string()
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Configuration with every default and no credentials, storing data under `data_dir`
    pub fn local(data_dir: impl Into<String>) -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            redis_url: None,
            data_dir: data_dir.into(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            default_radius_miles: default_radius_miles(),
            ticketmaster_api_key: None,
            eventbrite_token: None,
            spotify_client_id: None,
            spoonacular_api_key: None,
            api_ninjas_key: None,
            yelp_api_key: None,
            tmdb_api_key: None,
            spotify_redirect_uri: default_spotify_redirect_uri(),
            ticketmaster_api_url: default_ticketmaster_api_url(),
            eventbrite_api_url: default_eventbrite_api_url(),
            spotify_api_url: default_spotify_api_url(),
            spotify_accounts_url: default_spotify_accounts_url(),
            spoonacular_api_url: default_spoonacular_api_url(),
            api_ninjas_url: default_api_ninjas_url(),
            yelp_api_url: default_yelp_api_url(),
            tmdb_api_url: default_tmdb_api_url(),
        }
    }
}

/// Picks the configured key, falling back to one supplied with the request.
/// Blank values count as absent.
pub fn resolve_key(configured: Option<&str>, supplied: Option<&str>) -> Option<String> {
    configured
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .or_else(|| supplied.map(str::trim).filter(|k| !k.is_empty()))
        .map(str::to_string)
}
