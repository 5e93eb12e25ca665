use crate::{
    config::resolve_key,
    error::{AppError, AppResult},
    models::{Provider, Recipe},
    services::providers::{read_json, RecipeQuery, RecipeSource},
    services::recipes::normalize_spoonacular,
};
use reqwest::Client as HttpClient;
use serde_json::Value;

/// Spoonacular caps complexSearch pages at 100
const MAX_RESULTS: u32 = 100;

/// Spoonacular recipe search, asking for full recipe information in one call
#[derive(Clone)]
pub struct SpoonacularProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
}

impl SpoonacularProvider {
    pub fn new(http_client: HttpClient, api_key: Option<String>, api_url: String) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
        }
    }

    fn key_for(&self, query: &RecipeQuery) -> Option<String> {
        resolve_key(self.api_key.as_deref(), query.api_key.as_deref())
    }
}

#[async_trait::async_trait]
impl RecipeSource for SpoonacularProvider {
    async fn search_recipes(&self, query: &RecipeQuery) -> AppResult<Vec<Recipe>> {
        let api_key = self
            .key_for(query)
            .ok_or_else(|| AppError::MissingConfig("Spoonacular API key".to_string()))?;

        let url = format!("{}/recipes/complexSearch", self.api_url);
        let mut params: Vec<(&str, String)> = vec![
            ("apiKey", api_key),
            ("query", query.query.trim().to_string()),
            ("number", query.number.clamp(1, MAX_RESULTS).to_string()),
            ("addRecipeInformation", "true".to_string()),
            ("addRecipeNutrition", "true".to_string()),
            ("fillIngredients", "true".to_string()),
            ("instructionsRequired", "true".to_string()),
        ];
        if let Some(cuisine) = query.cuisine.as_deref().filter(|c| !c.trim().is_empty()) {
            params.push(("cuisine", cuisine.trim().to_string()));
        }
        if let Some(diet) = query.diet.as_deref().filter(|d| !d.trim().is_empty()) {
            params.push(("diet", diet.trim().to_string()));
        }

        let response = self.http_client.get(&url).query(&params).send().await?;
        let body = read_json(Provider::Spoonacular, response).await?;
        let recipes = parse_results(&body);

        tracing::info!(
            query = %query.query,
            results = recipes.len(),
            provider = "spoonacular",
            "Recipe search completed"
        );

        Ok(recipes)
    }

    fn is_configured(&self, query: &RecipeQuery) -> bool {
        self.key_for(query).is_some()
    }

    fn name(&self) -> &'static str {
        "spoonacular"
    }
}

pub fn parse_results(body: &Value) -> Vec<Recipe> {
    body.get("results")
        .and_then(Value::as_array)
        .map(|results| results.iter().filter_map(normalize_spoonacular).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_results() {
        let body = json!({
            "results": [
                {"id": 715538, "title": "Bruschetta", "spoonacularScore": 88.0},
                {"id": 1}
            ],
            "totalResults": 2
        });
        let recipes = parse_results(&body);
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].key, "715538");
        assert_eq!(recipes[0].score, Some(88.0));
    }

    #[test]
    fn test_is_configured_accepts_supplied_key() {
        let provider =
            SpoonacularProvider::new(HttpClient::new(), None, "http://test.local".to_string());
        let mut query = RecipeQuery::default();
        assert!(!provider.is_configured(&query));
        query.api_key = Some("user-key".to_string());
        assert!(provider.is_configured(&query));
    }

    #[tokio::test]
    async fn test_missing_key_is_reported() {
        let provider =
            SpoonacularProvider::new(HttpClient::new(), None, "http://test.local".to_string());
        let result = provider.search_recipes(&RecipeQuery::default()).await;
        assert!(matches!(result, Err(AppError::MissingConfig(_))));
    }
}
