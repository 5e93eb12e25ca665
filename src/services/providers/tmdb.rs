/// The Movie Database (TMDB) v3 API
use crate::{
    cached,
    config::resolve_key,
    db::{CacheKey, CacheParams, ResponseCache},
    error::{AppError, AppResult},
    models::{Movie, Provider},
    services::formatting::parse_date,
    services::providers::{read_json, text},
};
use reqwest::Client as HttpClient;
use serde_json::Value;
use tracing::instrument;

/// Base URL for poster paths returned by TMDB
pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieQuery {
    /// Title search; discovery by popularity when absent
    pub query: Option<String>,
    pub page: u32,
    pub api_key: Option<String>,
}

impl MovieQuery {
    fn search_text(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::Movies(
            CacheParams::new()
                .text("query", self.search_text())
                .number("page", self.page.max(1)),
        )
    }
}

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    cache: ResponseCache,
}

impl TmdbProvider {
    pub fn new(
        http_client: HttpClient,
        api_key: Option<String>,
        api_url: String,
        cache: ResponseCache,
    ) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
            cache,
        }
    }

    pub fn api_key(&self, supplied: Option<&str>) -> AppResult<String> {
        resolve_key(self.api_key.as_deref(), supplied)
            .ok_or_else(|| AppError::MissingConfig("TMDB API key".to_string()))
    }

    pub async fn movies(&self, query: &MovieQuery) -> AppResult<Vec<Movie>> {
        let api_key = self.api_key(query.api_key.as_deref())?;

        cached!(self.cache, query.cache_key(), async {
            self.fetch(&api_key, query).await
        })
    }

    #[instrument(skip_all, fields(page = query.page))]
    async fn fetch(&self, api_key: &str, query: &MovieQuery) -> AppResult<Vec<Movie>> {
        let mut params: Vec<(&str, String)> = vec![
            ("api_key", api_key.to_string()),
            ("page", query.page.max(1).to_string()),
            ("include_adult", "false".to_string()),
        ];
        let url = match query.search_text() {
            Some(text) => {
                params.push(("query", text.to_string()));
                format!("{}/3/search/movie", self.api_url)
            }
            None => {
                params.push(("sort_by", "popularity.desc".to_string()));
                format!("{}/3/discover/movie", self.api_url)
            }
        };

        let response = self.http_client.get(&url).query(&params).send().await?;
        let body = read_json(Provider::Tmdb, response).await?;
        let movies = parse_movies(&body);

        tracing::info!(
            query = ?query.search_text(),
            results = movies.len(),
            provider = "tmdb",
            "Movie search completed"
        );

        Ok(movies)
    }
}

pub fn parse_movies(body: &Value) -> Vec<Movie> {
    body.get("results")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(normalize_movie).collect())
        .unwrap_or_default()
}

pub fn normalize_movie(raw: &Value) -> Option<Movie> {
    Some(Movie {
        id: raw.get("id").and_then(Value::as_u64)?,
        title: text(raw, "/title").or_else(|| text(raw, "/original_title"))?,
        overview: text(raw, "/overview"),
        release_date: parse_date(text(raw, "/release_date").as_deref()),
        poster_url: text(raw, "/poster_path").map(|path| format!("{}{}", IMAGE_BASE_URL, path)),
        vote_average: raw.get("vote_average").and_then(Value::as_f64),
        status: None,
    })
}
