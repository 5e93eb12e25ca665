use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod event;
pub mod movie;
pub mod preference;
pub mod recipe;
pub mod restaurant;

pub use event::{Event, Venue};
pub use movie::Movie;
pub use preference::{PreferenceDomain, PreferenceEntry, PreferenceMap, PreferenceStatus};
pub use recipe::{Recipe, RecipeTags, WinePairing};
pub use restaurant::Restaurant;

/// Third-party APIs the service aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ticketmaster,
    Eventbrite,
    Spotify,
    Spoonacular,
    ApiNinjas,
    Yelp,
    Tmdb,
}

impl Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Provider::Ticketmaster => "Ticketmaster",
            Provider::Eventbrite => "Eventbrite",
            Provider::Spotify => "Spotify",
            Provider::Spoonacular => "Spoonacular",
            Provider::ApiNinjas => "API Ninjas",
            Provider::Yelp => "Yelp",
            Provider::Tmdb => "TMDB",
        };
        write!(f, "{}", name)
    }
}

/// A point on the earth, in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns coordinates only when both are finite and in range
    pub fn checked(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then(|| Self::new(latitude, longitude))
    }
}

/// Why a panel has nothing to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyState {
    /// No usable location: the user denied it or never supplied one
    LocationDenied,
    /// Location known, but nothing within the search radius
    NoNearby,
    /// The search itself returned nothing
    NoResults,
}

/// Items for one panel, plus the reason when there are none
#[derive(Debug, Clone, Serialize)]
pub struct PanelResponse<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_state: Option<EmptyState>,
}

impl<T> PanelResponse<T> {
    /// Wraps items, marking the response empty with `when_empty` if there are none
    pub fn new(items: Vec<T>, when_empty: EmptyState) -> Self {
        let empty_state = items.is_empty().then_some(when_empty);
        Self { items, empty_state }
    }

    pub fn empty(state: EmptyState) -> Self {
        Self {
            items: Vec::new(),
            empty_state: Some(state),
        }
    }
}
