/// Panel pipelines: provider results → radius filter and distance sort →
/// stored preference status → optional hiding of dismissed items
use crate::{
    error::AppResult,
    models::{
        Coordinates, EmptyState, Event, Movie, PanelResponse, PreferenceDomain, Recipe, Restaurant,
    },
    services::geo::{filter_by_radius, sort_by_distance},
    services::preferences::{hide_dismissed, Preferable, PreferenceService},
    services::providers::{
        eventbrite::{EventbriteProvider, EventbriteQuery},
        tmdb::{MovieQuery, TmdbProvider},
        yelp::{RestaurantQuery, YelpProvider},
        EventQuery, EventSource, RecipeQuery,
    },
    services::recipe_search::RecipeSearch,
    services::supersede::LatestOnly,
};

fn with_preferences<T: Preferable>(
    preferences: &PreferenceService,
    domain: PreferenceDomain,
    mut items: Vec<T>,
    hide: bool,
) -> AppResult<Vec<T>> {
    preferences.annotate(domain, &mut items)?;
    Ok(if hide { hide_dismissed(items) } else { items })
}

/// Nearby events from a venue source, e.g. the comedy panel
pub async fn nearby_events(
    source: &dyn EventSource,
    preferences: &PreferenceService,
    domain: PreferenceDomain,
    origin: Coordinates,
    query: EventQuery,
    hide: bool,
) -> AppResult<PanelResponse<Event>> {
    let radius = query.radius_miles;
    let query = EventQuery {
        origin: Some(origin),
        ..query
    };

    let events = source.search_events(&query).await?;
    let mut events = filter_by_radius(events, origin, radius);
    sort_by_distance(&mut events);

    let events = with_preferences(preferences, domain, events, hide)?;
    Ok(PanelResponse::new(events, EmptyState::NoNearby))
}

/// Eventbrite search. A newer search aborts the one still running.
pub async fn eventbrite_events(
    provider: &EventbriteProvider,
    searches: &LatestOnly,
    preferences: &PreferenceService,
    query: EventbriteQuery,
    hide: bool,
) -> AppResult<PanelResponse<Event>> {
    query.validate()?;
    let origin = query.origin;
    let radius = query.radius_miles;

    let provider = provider.clone();
    let events = searches.run(async move { provider.search(query).await }).await?;

    let mut events = filter_by_radius(events, origin, radius);
    sort_by_distance(&mut events);

    let events = with_preferences(preferences, PreferenceDomain::Events, events, hide)?;
    Ok(PanelResponse::new(events, EmptyState::NoNearby))
}

pub async fn recipes(
    search: &RecipeSearch,
    preferences: &PreferenceService,
    query: RecipeQuery,
    hide: bool,
) -> AppResult<PanelResponse<Recipe>> {
    let recipes = search.search(query).await?;
    let recipes = with_preferences(preferences, PreferenceDomain::Recipes, recipes, hide)?;
    Ok(PanelResponse::new(recipes, EmptyState::NoResults))
}

/// Restaurants by city or position. With a position, results are limited to
/// the radius and sorted nearest first; a city search keeps Yelp's order.
pub async fn restaurants(
    provider: &YelpProvider,
    preferences: &PreferenceService,
    query: RestaurantQuery,
    hide: bool,
) -> AppResult<PanelResponse<Restaurant>> {
    let restaurants = provider.search(&query).await?;

    let (restaurants, when_empty) = match query.origin {
        Some(origin) => {
            let mut nearby = filter_by_radius(restaurants, origin, query.radius_miles);
            sort_by_distance(&mut nearby);
            (nearby, EmptyState::NoNearby)
        }
        None => (restaurants, EmptyState::NoResults),
    };

    let restaurants =
        with_preferences(preferences, PreferenceDomain::Restaurants, restaurants, hide)?;
    Ok(PanelResponse::new(restaurants, when_empty))
}

pub async fn movies(
    provider: &TmdbProvider,
    preferences: &PreferenceService,
    query: MovieQuery,
    hide: bool,
) -> AppResult<PanelResponse<Movie>> {
    let movies = provider.movies(&query).await?;
    let movies = with_preferences(preferences, PreferenceDomain::Movies, movies, hide)?;
    Ok(PanelResponse::new(movies, EmptyState::NoResults))
}
