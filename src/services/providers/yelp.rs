/// Yelp Fusion business search for the restaurants panel
use crate::{
    cached,
    config::resolve_key,
    db::{CacheKey, CacheParams, ResponseCache},
    error::{AppError, AppResult},
    models::{Coordinates, Provider, Restaurant},
    services::providers::{coordinates_from, read_json, text},
};
use reqwest::Client as HttpClient;
use serde_json::Value;

const METERS_PER_MILE: f64 = 1609.344;
/// Yelp rejects radii above 40 km
const MAX_RADIUS_METERS: u32 = 40_000;
const MAX_LIMIT: u32 = 50;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestaurantQuery {
    /// Free-text place, e.g. "Austin, TX"; used when no coordinates are given
    pub location: Option<String>,
    pub origin: Option<Coordinates>,
    pub term: Option<String>,
    pub radius_miles: f64,
    pub limit: u32,
    pub api_key: Option<String>,
}

impl RestaurantQuery {
    pub fn validate(&self) -> AppResult<()> {
        let has_location = self
            .location
            .as_deref()
            .is_some_and(|l| !l.trim().is_empty());
        if self.origin.is_none() && !has_location {
            return Err(AppError::InvalidInput(
                "Give a city or share your location to search restaurants".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cache_key(&self) -> CacheKey {
        let mut params = CacheParams::new()
            .text("location", self.location.as_deref())
            .text("term", self.term.as_deref())
            .miles("radius", self.radius_miles)
            .number("limit", self.limit);
        if let Some(origin) = self.origin {
            params = params
                .coord("lat", origin.latitude)
                .coord("lon", origin.longitude);
        }
        CacheKey::Restaurants(params)
    }
}

#[derive(Clone)]
pub struct YelpProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    cache: ResponseCache,
}

impl YelpProvider {
    pub fn new(
        http_client: HttpClient,
        api_key: Option<String>,
        api_url: String,
        cache: ResponseCache,
    ) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
            cache,
        }
    }

    pub async fn search(&self, query: &RestaurantQuery) -> AppResult<Vec<Restaurant>> {
        query.validate()?;
        let api_key = resolve_key(self.api_key.as_deref(), query.api_key.as_deref())
            .ok_or_else(|| AppError::MissingConfig("Yelp API key".to_string()))?;

        cached!(self.cache, query.cache_key(), async {
            self.fetch(&api_key, query).await
        })
    }

    async fn fetch(&self, api_key: &str, query: &RestaurantQuery) -> AppResult<Vec<Restaurant>> {
        let radius_meters =
            ((query.radius_miles * METERS_PER_MILE).round() as u32).clamp(1, MAX_RADIUS_METERS);

        let mut params: Vec<(&str, String)> = vec![
            ("categories", "restaurants".to_string()),
            ("limit", query.limit.clamp(1, MAX_LIMIT).to_string()),
            ("radius", radius_meters.to_string()),
            ("sort_by", "best_match".to_string()),
        ];
        match (query.origin, query.location.as_deref()) {
            (Some(origin), _) => {
                params.push(("latitude", origin.latitude.to_string()));
                params.push(("longitude", origin.longitude.to_string()));
            }
            (None, Some(location)) => params.push(("location", location.trim().to_string())),
            (None, None) => {}
        }
        if let Some(term) = query.term.as_deref().filter(|t| !t.trim().is_empty()) {
            params.push(("term", term.trim().to_string()));
        }

        let response = self
            .http_client
            .get(format!("{}/v3/businesses/search", self.api_url))
            .bearer_auth(api_key)
            .query(&params)
            .send()
            .await?;
        let body = read_json(Provider::Yelp, response).await?;
        let restaurants = parse_businesses(&body);

        tracing::info!(
            results = restaurants.len(),
            provider = "yelp",
            "Restaurant search completed"
        );

        Ok(restaurants)
    }
}

pub fn parse_businesses(body: &Value) -> Vec<Restaurant> {
    body.get("businesses")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(normalize_business).collect())
        .unwrap_or_default()
}

pub fn normalize_business(raw: &Value) -> Option<Restaurant> {
    let id = text(raw, "/id")?;
    let name = text(raw, "/name")?;

    let categories = raw
        .get("categories")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(|c| text(c, "/title")).collect())
        .unwrap_or_default();

    Some(Restaurant {
        id,
        name,
        address: text(raw, "/location/address1"),
        city: text(raw, "/location/city"),
        state: text(raw, "/location/state"),
        zip: text(raw, "/location/zip_code"),
        categories,
        phone: text(raw, "/display_phone").or_else(|| text(raw, "/phone")),
        price: text(raw, "/price"),
        rating: raw.get("rating").and_then(Value::as_f64),
        review_count: raw
            .get("review_count")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok()),
        website: text(raw, "/url"),
        coordinates: coordinates_from(
            raw.pointer("/coordinates/latitude"),
            raw.pointer("/coordinates/longitude"),
        ),
        distance_miles: None,
        status: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CachePolicy;
    use serde_json::json;

    #[test]
    fn test_normalize_business() {
        let raw = json!({
            "id": "franklin-bbq",
            "name": "Franklin Barbecue",
            "url": "https://www.yelp.com/biz/franklin-bbq",
            "price": "$$",
            "rating": 4.5,
            "review_count": 6012,
            "display_phone": "(512) 653-1187",
            "categories": [{"alias": "bbq", "title": "Barbeque"}],
            "coordinates": {"latitude": 30.2701, "longitude": -97.7313},
            "location": {
                "address1": "900 E 11th St",
                "city": "Austin",
                "state": "TX",
                "zip_code": "78702"
            }
        });

        let restaurant = normalize_business(&raw).unwrap();
        assert_eq!(restaurant.name, "Franklin Barbecue");
        assert_eq!(restaurant.categories, vec!["Barbeque"]);
        assert_eq!(restaurant.review_count, Some(6012));
        assert_eq!(restaurant.zip.as_deref(), Some("78702"));
        assert_eq!(restaurant.coordinates, Some(Coordinates::new(30.2701, -97.7313)));
    }

    #[test]
    fn test_validate_requires_a_place() {
        assert!(RestaurantQuery::default().validate().is_err());
        let by_city = RestaurantQuery {
            location: Some("Austin, TX".to_string()),
            ..RestaurantQuery::default()
        };
        assert!(by_city.validate().is_ok());
    }

    #[test]
    fn test_cache_key_normalizes_location_case() {
        let a = RestaurantQuery {
            location: Some("Austin, TX".to_string()),
            ..RestaurantQuery::default()
        };
        let b = RestaurantQuery {
            location: Some(" austin, tx ".to_string()),
            ..RestaurantQuery::default()
        };
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[tokio::test]
    async fn test_missing_key_is_reported() {
        let provider = YelpProvider::new(
            HttpClient::new(),
            None,
            "http://test.local".to_string(),
            ResponseCache::memory("restaurants", CachePolicy::new(60, 5)),
        );
        let query = RestaurantQuery {
            location: Some("Austin".to_string()),
            ..RestaurantQuery::default()
        };
        assert!(matches!(provider.search(&query).await, Err(AppError::MissingConfig(_))));
    }
}
