use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// How the user feels about an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreferenceStatus {
    Interested,
    NotInterested,
    Watched,
}

/// Each panel keeps its own preference map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceDomain {
    Comedy,
    Shows,
    Movies,
    Recipes,
    Restaurants,
    Events,
}

impl PreferenceDomain {
    pub const ALL: [PreferenceDomain; 6] = [
        PreferenceDomain::Comedy,
        PreferenceDomain::Shows,
        PreferenceDomain::Movies,
        PreferenceDomain::Recipes,
        PreferenceDomain::Restaurants,
        PreferenceDomain::Events,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceDomain::Comedy => "comedy",
            PreferenceDomain::Shows => "shows",
            PreferenceDomain::Movies => "movies",
            PreferenceDomain::Recipes => "recipes",
            PreferenceDomain::Restaurants => "restaurants",
            PreferenceDomain::Events => "events",
        }
    }

    /// Only movies can be marked as watched
    pub fn accepts(&self, status: PreferenceStatus) -> bool {
        status != PreferenceStatus::Watched || *self == PreferenceDomain::Movies
    }
}

impl Display for PreferenceDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PreferenceDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|domain| domain.as_str() == wanted)
            .ok_or_else(|| format!("Unknown preference domain: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceEntry {
    pub status: PreferenceStatus,
    pub updated_at: DateTime<Utc>,
}

/// Item id → preference, serialized as a plain JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreferenceMap {
    entries: BTreeMap<String, PreferenceEntry>,
}

impl PreferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, item_id: &str) -> Option<PreferenceStatus> {
        self.entries.get(item_id).map(|e| e.status)
    }

    /// Applies a status click. Choosing the status the item already has
    /// clears it; any other status replaces it. Returns the resulting status.
    pub fn toggle(
        &mut self,
        item_id: &str,
        status: PreferenceStatus,
        now: DateTime<Utc>,
    ) -> Option<PreferenceStatus> {
        if self.status(item_id) == Some(status) {
            self.entries.remove(item_id);
            None
        } else {
            self.set(item_id, status, now);
            Some(status)
        }
    }

    /// Sets a status unconditionally
    pub fn set(&mut self, item_id: &str, status: PreferenceStatus, now: DateTime<Utc>) {
        self.entries.insert(
            item_id.to_string(),
            PreferenceEntry {
                status,
                updated_at: now,
            },
        );
    }

    pub fn clear(&mut self, item_id: &str) -> bool {
        self.entries.remove(item_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
