use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{Coordinates, PreferenceStatus, Provider};

/// A dated event at a venue: a concert, a comedy show or an Eventbrite listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: String,
    pub source: Provider,
    pub name: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    /// Human-readable date, e.g. "Sat, Oct 17, 2026 · 7:30 PM"
    pub display_date: String,
    pub venue: Venue,
    pub coordinates: Option<Coordinates>,
    pub distance_miles: Option<f64>,
    pub image_url: Option<String>,
    pub url: Option<String>,
    /// Performer names listed by the source, used for artist matching
    #[serde(default)]
    pub performers: Vec<String>,
    #[serde(default)]
    pub matched_artists: Vec<String>,
    pub status: Option<PreferenceStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Venue {
    pub name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl Venue {
    /// "Venue, City, ST" with missing parts left out
    pub fn label(&self) -> String {
        [&self.name, &self.city, &self.state]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
