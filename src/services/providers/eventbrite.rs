/// Eventbrite event search
///
/// Authenticates with a private token: the server's own when configured,
/// otherwise one the user pasted in. A pasted token is remembered in the
/// store so later searches can omit it.
use std::sync::Arc;

use crate::{
    cached,
    config::resolve_key,
    db::{store::KeyValueStore, CacheKey, CacheParams, ResponseCache},
    error::{AppError, AppResult},
    models::{Coordinates, Event, Provider, Venue},
    services::formatting::{format_event_date, parse_local_datetime},
    services::providers::{coordinates_from, read_json, text},
};
use reqwest::Client as HttpClient;
use serde_json::Value;

const TOKEN_KEY: &str = "eventbriteTokenV1";

/// Date windows Eventbrite understands as `start_date.keyword`
pub const DATE_KEYWORDS: [&str; 6] = [
    "today",
    "tomorrow",
    "this_week",
    "this_weekend",
    "next_week",
    "this_month",
];

/// Price scope of the search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Free,
    Paid,
}

impl Scope {
    pub fn parse(raw: Option<&str>) -> AppResult<Self> {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("all") => Ok(Scope::All),
            Some("free") => Ok(Scope::Free),
            Some("paid") => Ok(Scope::Paid),
            Some(other) => Err(AppError::InvalidInput(format!(
                "Unknown scope '{}': use all, free or paid",
                other
            ))),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Scope::All => "all",
            Scope::Free => "free",
            Scope::Paid => "paid",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventbriteQuery {
    pub origin: Coordinates,
    pub radius_miles: f64,
    pub date: Option<String>,
    pub scope: Scope,
    pub keyword: Option<String>,
    pub token: Option<String>,
}

impl EventbriteQuery {
    /// Rejects date windows Eventbrite would not understand
    pub fn validate(&self) -> AppResult<()> {
        if let Some(date) = &self.date {
            if !DATE_KEYWORDS.contains(&date.as_str()) {
                return Err(AppError::InvalidInput(format!(
                    "Unknown date '{}': use one of {}",
                    date,
                    DATE_KEYWORDS.join(", ")
                )));
            }
        }
        if !(self.radius_miles > 0.0) {
            return Err(AppError::InvalidInput("Radius must be positive".to_string()));
        }
        Ok(())
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::Eventbrite(
            CacheParams::new()
                .coord("lat", self.origin.latitude)
                .coord("lon", self.origin.longitude)
                .miles("radius", self.radius_miles)
                .text("date", self.date.as_deref())
                .text("scope", Some(self.scope.as_str()))
                .text("q", self.keyword.as_deref()),
        )
    }
}

#[derive(Clone)]
pub struct EventbriteProvider {
    http_client: HttpClient,
    token: Option<String>,
    api_url: String,
    cache: ResponseCache,
    store: Arc<dyn KeyValueStore>,
}

impl EventbriteProvider {
    pub fn new(
        http_client: HttpClient,
        token: Option<String>,
        api_url: String,
        cache: ResponseCache,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            http_client,
            token,
            api_url,
            cache,
            store,
        }
    }

    /// Configured token, then the supplied one (which is remembered), then
    /// the last remembered one
    fn resolve_token(&self, supplied: Option<&str>) -> AppResult<String> {
        if let Some(token) = resolve_key(self.token.as_deref(), supplied) {
            if self.token.is_none() {
                self.store.set(TOKEN_KEY, &token)?;
            }
            return Ok(token);
        }

        self.store
            .get(TOKEN_KEY)?
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::MissingConfig("Eventbrite token".to_string()))
    }

    /// Forgets a remembered token, e.g. after Eventbrite rejected it
    pub fn forget_token(&self) -> AppResult<()> {
        self.store.remove(TOKEN_KEY)
    }

    pub async fn search(&self, query: EventbriteQuery) -> AppResult<Vec<Event>> {
        query.validate()?;
        let token = self.resolve_token(query.token.as_deref())?;

        let result = self.search_cached(&token, &query).await;

        if let Err(AppError::Upstream { status: 401, .. }) = &result {
            if self.token.is_none() {
                self.forget_token()?;
            }
        }
        result
    }

    async fn search_cached(&self, token: &str, query: &EventbriteQuery) -> AppResult<Vec<Event>> {
        cached!(self.cache, query.cache_key(), async {
            self.fetch(token, query).await
        })
    }

    async fn fetch(&self, token: &str, query: &EventbriteQuery) -> AppResult<Vec<Event>> {
        let url = format!("{}/v3/events/search/", self.api_url);

        let mut params: Vec<(&str, String)> = vec![
            ("location.latitude", query.origin.latitude.to_string()),
            ("location.longitude", query.origin.longitude.to_string()),
            (
                "location.within",
                format!("{}mi", query.radius_miles.ceil().max(1.0) as u64),
            ),
            ("expand", "venue".to_string()),
        ];
        if let Some(date) = &query.date {
            params.push(("start_date.keyword", date.clone()));
        }
        match query.scope {
            Scope::All => {}
            Scope::Free => params.push(("price", "free".to_string())),
            Scope::Paid => params.push(("price", "paid".to_string())),
        }
        if let Some(keyword) = query.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
            params.push(("q", keyword.trim().to_string()));
        }

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(&params)
            .send()
            .await?;
        let body = read_json(Provider::Eventbrite, response).await?;
        let events = parse_events(&body);

        tracing::info!(
            results = events.len(),
            provider = "eventbrite",
            "Event search completed"
        );

        Ok(events)
    }
}

pub fn parse_events(body: &Value) -> Vec<Event> {
    body.get("events")
        .and_then(Value::as_array)
        .map(|events| events.iter().filter_map(normalize_event).collect())
        .unwrap_or_default()
}

pub fn normalize_event(raw: &Value) -> Option<Event> {
    let id = text(raw, "/id")?;
    let name = text(raw, "/name/text").or_else(|| text(raw, "/name"))?;

    let raw_start = text(raw, "/start/local");
    let (date, time) = parse_local_datetime(raw_start.as_deref());

    let venue_raw = raw.get("venue");
    let venue = venue_raw
        .map(|v| Venue {
            name: text(v, "/name"),
            city: text(v, "/address/city"),
            state: text(v, "/address/region"),
        })
        .unwrap_or_default();
    let coordinates = venue_raw.and_then(|v| {
        coordinates_from(v.get("latitude"), v.get("longitude"))
            .or_else(|| {
                coordinates_from(v.pointer("/address/latitude"), v.pointer("/address/longitude"))
            })
    });

    Some(Event {
        id,
        source: Provider::Eventbrite,
        name,
        date,
        time,
        display_date: format_event_date(date, time, raw_start.as_deref()),
        venue,
        coordinates,
        distance_miles: None,
        image_url: text(raw, "/logo/url"),
        url: text(raw, "/url"),
        performers: Vec::new(),
        matched_artists: Vec::new(),
        status: None,
    })
}
