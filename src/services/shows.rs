/// Concert discovery: nearby music events, ranked by how well they match the
/// artists the user listens to on Spotify
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    db::store::{load_json, save_json, KeyValueStore},
    error::{AppError, AppResult},
    models::{Coordinates, EmptyState, Event, PanelResponse, PreferenceDomain},
    services::geo::{compare_distance, filter_by_radius},
    services::preferences::{hide_dismissed, PreferenceService},
    services::providers::{Artist, ArtistSource, EventQuery, EventSource},
};

const CONFIG_KEY: &str = "showsConfigV1";
const TOP_ARTIST_LIMIT: u32 = 50;
const EVENT_PAGE_SIZE: u32 = 200;
const MAX_RADIUS_MILES: f64 = 500.0;
const MAX_DAYS_AHEAD: u32 = 365;

/// User settings for the shows panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowsConfig {
    pub radius_miles: f64,
    pub days_ahead: u32,
    /// Also match artists from Spotify recommendations seeded by top artists
    pub include_recommendations: bool,
    /// Only return events with at least one matched artist
    pub matched_only: bool,
}

impl Default for ShowsConfig {
    fn default() -> Self {
        Self {
            radius_miles: 100.0,
            days_ahead: 90,
            include_recommendations: false,
            matched_only: false,
        }
    }
}

impl ShowsConfig {
    pub fn validate(&self) -> AppResult<()> {
        if !(self.radius_miles > 0.0 && self.radius_miles <= MAX_RADIUS_MILES) {
            return Err(AppError::InvalidInput(format!(
                "Radius must be between 0 and {} miles",
                MAX_RADIUS_MILES
            )));
        }
        if self.days_ahead == 0 || self.days_ahead > MAX_DAYS_AHEAD {
            return Err(AppError::InvalidInput(format!(
                "Days ahead must be between 1 and {}",
                MAX_DAYS_AHEAD
            )));
        }
        Ok(())
    }
}

/// Shows panel payload
#[derive(Debug, Clone, Serialize)]
pub struct ShowsPanel {
    #[serde(flatten)]
    pub panel: PanelResponse<Event>,
    /// False when Spotify is not connected and nothing could be matched
    pub spotify_connected: bool,
}

#[derive(Clone)]
pub struct ShowsService {
    events: Arc<dyn EventSource>,
    artists: Arc<dyn ArtistSource>,
    preferences: PreferenceService,
    store: Arc<dyn KeyValueStore>,
}

impl ShowsService {
    pub fn new(
        events: Arc<dyn EventSource>,
        artists: Arc<dyn ArtistSource>,
        preferences: PreferenceService,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            events,
            artists,
            preferences,
            store,
        }
    }

    pub fn config(&self) -> AppResult<ShowsConfig> {
        Ok(load_json(self.store.as_ref(), CONFIG_KEY)?.unwrap_or_default())
    }

    pub fn save_config(&self, config: &ShowsConfig) -> AppResult<()> {
        config.validate()?;
        save_json(self.store.as_ref(), CONFIG_KEY, config)
    }

    /// Listening taste used for matching. A missing or expired Spotify login
    /// yields `None` rather than failing the whole panel.
    async fn listened_artists(&self, config: &ShowsConfig) -> AppResult<Option<Vec<Artist>>> {
        let mut artists = match self.artists.top_artists(TOP_ARTIST_LIMIT).await {
            Ok(artists) => artists,
            Err(AppError::Unauthorized(_)) => return Ok(None),
            Err(AppError::Upstream { status: 401, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        if config.include_recommendations && !artists.is_empty() {
            match self.artists.recommended_artists(artists.clone()).await {
                Ok(recommended) => {
                    for artist in recommended {
                        if !artists.iter().any(|a| a.id == artist.id) {
                            artists.push(artist);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Could not load recommended artists, matching top artists only"
                    );
                }
            }
        }

        Ok(Some(artists))
    }

    pub async fn discover(
        &self,
        origin: Coordinates,
        today: NaiveDate,
        api_key: Option<String>,
        hide_dismissed_items: bool,
    ) -> AppResult<ShowsPanel> {
        let config = self.config()?;
        let artists = self.listened_artists(&config).await?;
        let spotify_connected = artists.is_some();

        let query = EventQuery {
            classification: Some("music".to_string()),
            origin: Some(origin),
            radius_miles: config.radius_miles,
            start: Some(today),
            end: today.checked_add_days(Days::new(u64::from(config.days_ahead))),
            size: EVENT_PAGE_SIZE,
            api_key,
            ..EventQuery::default()
        };
        let events = self.events.search_events(&query).await?;

        let mut events = filter_by_radius(events, origin, config.radius_miles);
        match_artists(&mut events, artists.as_deref().unwrap_or_default());
        if config.matched_only {
            events.retain(|e| !e.matched_artists.is_empty());
        }
        rank_shows(&mut events);

        self.preferences.annotate(PreferenceDomain::Shows, &mut events)?;
        if hide_dismissed_items {
            events = hide_dismissed(events);
        }

        tracing::info!(
            results = events.len(),
            matched = events.iter().filter(|e| !e.matched_artists.is_empty()).count(),
            spotify_connected,
            "Shows discovered"
        );

        Ok(ShowsPanel {
            panel: PanelResponse::new(events, EmptyState::NoNearby),
            spotify_connected,
        })
    }
}

/// Records which artists play each event. An artist matches when its name
/// equals one of the performers or appears in the event name, ignoring case.
pub fn match_artists(events: &mut [Event], artists: &[Artist]) {
    let names: Vec<(String, &str)> = artists
        .iter()
        .map(|a| (a.name.trim().to_lowercase(), a.name.as_str()))
        .filter(|(lower, _)| !lower.is_empty())
        .collect();

    for event in events.iter_mut() {
        let event_name = event.name.to_lowercase();
        let performers: Vec<String> =
            event.performers.iter().map(|p| p.trim().to_lowercase()).collect();

        event.matched_artists = names
            .iter()
            .filter(|(lower, _)| performers.contains(lower) || event_name.contains(lower.as_str()))
            .map(|(_, original)| original.to_string())
            .collect();
    }
}

/// Matched events first, then nearest first; the sort is stable
pub fn rank_shows(events: &mut [Event]) {
    events.sort_by(|a, b| {
        let a_unmatched = a.matched_artists.is_empty();
        let b_unmatched = b.matched_artists.is_empty();
        a_unmatched
            .cmp(&b_unmatched)
            .then_with(|| compare_distance(a.distance_miles, b.distance_miles))
    });
}
