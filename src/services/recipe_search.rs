use std::sync::Arc;

use crate::{
    cached,
    db::{CacheKey, CacheParams, ResponseCache},
    error::{AppError, AppResult},
    models::Recipe,
    services::providers::{RecipeQuery, RecipeSource},
    services::recipes::sort_by_score,
};

const DEFAULT_RESULTS: u32 = 12;

/// Recipe search over a primary source with a fallback.
///
/// The fallback is used when the primary has no key for the query, or when
/// the primary call fails and the fallback is configured. Results are sorted
/// by score and cached per normalized query.
#[derive(Clone)]
pub struct RecipeSearch {
    primary: Arc<dyn RecipeSource>,
    fallback: Arc<dyn RecipeSource>,
    cache: ResponseCache,
}

impl RecipeSearch {
    pub fn new(
        primary: Arc<dyn RecipeSource>,
        fallback: Arc<dyn RecipeSource>,
        cache: ResponseCache,
    ) -> Self {
        Self {
            primary,
            fallback,
            cache,
        }
    }

    fn cache_key(query: &RecipeQuery) -> CacheKey {
        CacheKey::Recipes(
            CacheParams::new()
                .text("query", Some(&query.query))
                .text("cuisine", query.cuisine.as_deref())
                .text("diet", query.diet.as_deref())
                .number("number", query.number),
        )
    }

    pub async fn search(&self, mut query: RecipeQuery) -> AppResult<Vec<Recipe>> {
        if query.query.trim().is_empty() {
            return Err(AppError::InvalidInput("Enter a dish or ingredient to search".to_string()));
        }
        if query.number == 0 {
            query.number = DEFAULT_RESULTS;
        }

        cached!(self.cache, Self::cache_key(&query), async {
            let mut recipes = self.fetch(&query).await?;
            sort_by_score(&mut recipes);
            Ok::<_, AppError>(recipes)
        })
    }

    async fn fetch(&self, query: &RecipeQuery) -> AppResult<Vec<Recipe>> {
        if !self.primary.is_configured(query) {
            if !self.fallback.is_configured(query) {
                return Err(AppError::MissingConfig(
                    "Spoonacular API key (or an API Ninjas key)".to_string(),
                ));
            }
            tracing::info!(
                source = self.fallback.name(),
                "Primary recipe source has no key, using fallback"
            );
            return self.fallback.search_recipes(query).await;
        }

        match self.primary.search_recipes(query).await {
            Ok(recipes) => Ok(recipes),
            Err(e) if self.fallback.is_configured(query) => {
                tracing::warn!(
                    error = %e,
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    "Recipe search failed, trying fallback"
                );
                self.fallback.search_recipes(query).await
            }
            Err(e) => Err(e),
        }
    }
}
