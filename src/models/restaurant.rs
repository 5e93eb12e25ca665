use serde::{Deserialize, Serialize};

use super::{Coordinates, PreferenceStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub categories: Vec<String>,
    pub phone: Option<String>,
    /// Price tier as the source renders it, e.g. "$$"
    pub price: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub website: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub distance_miles: Option<f64>,
    pub status: Option<PreferenceStatus>,
}
