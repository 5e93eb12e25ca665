use crate::{
    config::resolve_key,
    error::{AppError, AppResult},
    models::{Provider, Recipe},
    services::providers::{read_json, RecipeQuery, RecipeSource},
    services::recipes::normalize_api_ninjas,
};
use reqwest::Client as HttpClient;
use serde_json::Value;

/// API Ninjas recipe lookup, the fallback when Spoonacular is unavailable.
/// Results carry only a title, an ingredient string and an instruction blob.
#[derive(Clone)]
pub struct ApiNinjasProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
}

impl ApiNinjasProvider {
    pub fn new(http_client: HttpClient, api_key: Option<String>, api_url: String) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
        }
    }
}

#[async_trait::async_trait]
impl RecipeSource for ApiNinjasProvider {
    async fn search_recipes(&self, query: &RecipeQuery) -> AppResult<Vec<Recipe>> {
        // The user-supplied key belongs to Spoonacular, so only the server's key counts
        let api_key = resolve_key(self.api_key.as_deref(), None)
            .ok_or_else(|| AppError::MissingConfig("API Ninjas key".to_string()))?;

        let response = self
            .http_client
            .get(format!("{}/v1/recipe", self.api_url))
            .header("X-Api-Key", api_key)
            .query(&[("query", query.query.trim())])
            .send()
            .await?;
        let body = read_json(Provider::ApiNinjas, response).await?;

        let mut recipes = parse_results(&body);
        recipes.truncate(query.number.max(1) as usize);

        tracing::info!(
            query = %query.query,
            results = recipes.len(),
            provider = "api_ninjas",
            "Recipe search completed"
        );

        Ok(recipes)
    }

    fn is_configured(&self, _query: &RecipeQuery) -> bool {
        resolve_key(self.api_key.as_deref(), None).is_some()
    }

    fn name(&self) -> &'static str {
        "api_ninjas"
    }
}

/// The endpoint answers with a bare array
pub fn parse_results(body: &Value) -> Vec<Recipe> {
    body.as_array()
        .map(|results| results.iter().filter_map(normalize_api_ninjas).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_results_splits_ingredients() {
        let body = json!([{
            "title": "Pancakes",
            "ingredients": "1 cup flour|1 egg|1 cup milk",
            "servings": "4 Servings",
            "instructions": "Whisk everything. Fry in a pan."
        }]);

        let recipes = parse_results(&body);
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].key, "pancakes");
        assert_eq!(recipes[0].ingredients, vec!["1 cup flour", "1 egg", "1 cup milk"]);
        assert_eq!(recipes[0].source, Provider::ApiNinjas);
    }

    #[test]
    fn test_parse_results_not_an_array() {
        assert!(parse_results(&json!({"error": "bad"})).is_empty());
    }

    #[test]
    fn test_supplied_key_does_not_configure_fallback() {
        let provider =
            ApiNinjasProvider::new(HttpClient::new(), None, "http://test.local".to_string());
        let query = RecipeQuery {
            api_key: Some("spoonacular-key".to_string()),
            ..RecipeQuery::default()
        };
        assert!(!provider.is_configured(&query));
    }
}
