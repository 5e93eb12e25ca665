use serde::{Deserialize, Serialize};

use super::{PreferenceStatus, Provider};

/// A recipe normalized from Spoonacular or API Ninjas
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    /// Source id when present, otherwise the lowercased title
    pub key: String,
    pub source: Provider,
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    /// Ordered label/value pairs such as ("Ready in", "45 min")
    pub facts: Vec<(String, String)>,
    pub tags: RecipeTags,
    /// Names of the boolean flags that are set, e.g. "Vegetarian"
    pub badges: Vec<String>,
    pub wine_pairing: Option<WinePairing>,
    pub score: Option<f64>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub status: Option<PreferenceStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecipeTags {
    pub cuisines: Vec<String>,
    pub diets: Vec<String>,
    pub dish_types: Vec<String>,
}

impl RecipeTags {
    pub fn is_empty(&self) -> bool {
        self.cuisines.is_empty() && self.diets.is_empty() && self.dish_types.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WinePairing {
    pub wines: Vec<String>,
    pub text: Option<String>,
}
