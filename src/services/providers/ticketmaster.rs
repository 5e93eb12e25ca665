/// Ticketmaster Discovery API provider
///
/// Used for both the concerts panel (classification "music") and the comedy
/// panel (classification "comedy"). Venue coordinates arrive as strings and
/// images as a list of sizes; both are normalized here.
use crate::{
    cached,
    config::resolve_key,
    db::{CacheKey, CacheParams, ResponseCache},
    error::{AppError, AppResult},
    models::{Event, Provider, Venue},
    services::formatting::{format_event_date, parse_date, parse_time},
    services::providers::{coordinates_from, read_json, text, EventQuery, EventSource},
};
use reqwest::Client as HttpClient;
use serde_json::Value;
use tracing::instrument;

const MAX_PAGE_SIZE: u32 = 200;

#[derive(Clone)]
pub struct TicketmasterProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    cache: ResponseCache,
}

impl TicketmasterProvider {
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

    fn cache_key(query: &EventQuery) -> CacheKey {
        let mut params = CacheParams::new()
            .text("keyword", query.keyword.as_deref())
            .text("classification", query.classification.as_deref())
            .miles("radius", query.radius_miles)
            .number("size", query.size)
            .text("start", query.start.map(|d| d.to_string()).as_deref())
            .text("end", query.end.map(|d| d.to_string()).as_deref());
        if let Some(origin) = query.origin {
            params = params
                .coord("lat", origin.latitude)
                .coord("lon", origin.longitude);
        }
        CacheKey::Ticketmaster(params)
    }

    #[instrument(skip_all, fields(classification = ?query.classification))]
    async fn fetch(&self, api_key: &str, query: &EventQuery) -> AppResult<Vec<Event>> {
        let url = format!("{}/discovery/v2/events.json", self.api_url);

        let mut params: Vec<(&str, String)> = vec![
            ("apikey", api_key.to_string()),
            ("size", query.size.clamp(1, MAX_PAGE_SIZE).to_string()),
            ("sort", "date,asc".to_string()),
        ];
        if let Some(origin) = query.origin {
            params.push(("latlong", format!("{},{}", origin.latitude, origin.longitude)));
            params.push(("radius", format!("{}", query.radius_miles.ceil().max(1.0) as u64)));
            params.push(("unit", "miles".to_string()));
        }
        if let Some(keyword) = query.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
            params.push(("keyword", keyword.trim().to_string()));
        }
        if let Some(classification) = &query.classification {
            params.push(("classificationName", classification.clone()));
        }
        if let Some(start) = query.start {
            params.push(("startDateTime", format!("{}T00:00:00Z", start)));
        }
        if let Some(end) = query.end {
            params.push(("endDateTime", format!("{}T23:59:59Z", end)));
        }

        let response = self.http_client.get(&url).query(&params).send().await?;
        let body = read_json(Provider::Ticketmaster, response).await?;
        let events = parse_events(&body);

        tracing::info!(
            classification = ?query.classification,
            results = events.len(),
            provider = "ticketmaster",
            "Event search completed"
        );

        Ok(events)
    }
}

#[async_trait::async_trait]
impl EventSource for TicketmasterProvider {
    async fn search_events(&self, query: &EventQuery) -> AppResult<Vec<Event>> {
        let api_key = resolve_key(self.api_key.as_deref(), query.api_key.as_deref())
            .ok_or_else(|| AppError::MissingConfig("Ticketmaster API key".to_string()))?;

        cached!(self.cache, Self::cache_key(query), async {
            self.fetch(&api_key, query).await
        })
    }

    fn name(&self) -> &'static str {
        "ticketmaster"
    }
}

/// Extracts events from a Discovery API response. An empty page has no
/// `_embedded` object at all.
pub fn parse_events(body: &Value) -> Vec<Event> {
    body.pointer("/_embedded/events")
        .and_then(Value::as_array)
        .map(|events| events.iter().filter_map(normalize_event).collect())
        .unwrap_or_default()
}

pub fn normalize_event(raw: &Value) -> Option<Event> {
    let id = text(raw, "/id")?;
    let name = text(raw, "/name")?;

    let raw_date = text(raw, "/dates/start/localDate");
    let date = parse_date(raw_date.as_deref());
    let time = parse_time(text(raw, "/dates/start/localTime").as_deref());

    let venue_raw = raw.pointer("/_embedded/venues/0");
    let venue = venue_raw
        .map(|v| Venue {
            name: text(v, "/name"),
            city: text(v, "/city/name"),
            state: text(v, "/state/stateCode").or_else(|| text(v, "/state/name")),
        })
        .unwrap_or_default();
    let coordinates = venue_raw.and_then(|v| {
        coordinates_from(v.pointer("/location/latitude"), v.pointer("/location/longitude"))
    });

    let performers = raw
        .pointer("/_embedded/attractions")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(|a| text(a, "/name")).collect())
        .unwrap_or_default();

    Some(Event {
        id,
        source: Provider::Ticketmaster,
        name,
        date,
        time,
        display_date: format_event_date(date, time, raw_date.as_deref()),
        venue,
        coordinates,
        distance_miles: None,
        image_url: best_image(raw),
        url: text(raw, "/url"),
        performers,
        matched_artists: Vec::new(),
        status: None,
    })
}

/// The widest image on offer
fn best_image(raw: &Value) -> Option<String> {
    raw.get("images")?
        .as_array()?
        .iter()
        .filter_map(|img| {
            let width = img.get("width").and_then(Value::as_u64).unwrap_or(0);
            Some((width, text(img, "/url")?))
        })
        .max_by_key(|(width, _)| *width)
        .map(|(_, url)| url)
}
