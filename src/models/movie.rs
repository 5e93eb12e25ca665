use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::PreferenceStatus;

/// Represents a movie returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub poster_url: Option<String>,
    pub vote_average: Option<f64>,
    pub status: Option<PreferenceStatus>,
}
