use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::db::store::{load_json, save_json, KeyValueStore};
use crate::error::AppResult;
use crate::models::{Coordinates, EmptyState, Event, Restaurant};

/// Mean earth radius in miles
const EARTH_RADIUS_MILES: f64 = 3958.8;

const LOCATION_KEY: &str = "lastLocationV1";

/// Great-circle distance between two points, in miles
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().min(1.0).asin()
}

/// Anything with an optional position that can carry a computed distance
pub trait Located {
    fn coordinates(&self) -> Option<Coordinates>;
    fn distance_miles(&self) -> Option<f64>;
    fn set_distance_miles(&mut self, miles: f64);
}

impl Located for Event {
    fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    fn distance_miles(&self) -> Option<f64> {
        self.distance_miles
    }

    fn set_distance_miles(&mut self, miles: f64) {
        self.distance_miles = Some(miles);
    }
}

impl Located for Restaurant {
    fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    fn distance_miles(&self) -> Option<f64> {
        self.distance_miles
    }

    fn set_distance_miles(&mut self, miles: f64) {
        self.distance_miles = Some(miles);
    }
}

/// Keeps items within `radius_miles` of `origin`, annotating their distance.
/// Items without coordinates cannot be placed and are dropped.
pub fn filter_by_radius<T: Located>(
    items: Vec<T>,
    origin: Coordinates,
    radius_miles: f64,
) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|mut item| {
            let distance = haversine_miles(origin, item.coordinates()?);
            item.set_distance_miles(distance);
            (distance <= radius_miles).then_some(item)
        })
        .collect()
}

/// Sorts nearest first; items with unknown distance go last, in original order
pub fn sort_by_distance<T: Located>(items: &mut [T]) {
    items.sort_by(|a, b| compare_distance(a.distance_miles(), b.distance_miles()));
}

pub fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// What we last learned about the user's location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum LocationMemo {
    Known { coordinates: Coordinates },
    Denied,
}

/// Per-session location memo, so the user is asked once.
///
/// Coordinates supplied with a request always win and are remembered. A
/// request without coordinates reuses the remembered location; after a
/// denial it stays denied until the caller explicitly retries.
pub struct LocationResolver<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> LocationResolver<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    pub fn resolve(
        &self,
        supplied: Option<Coordinates>,
        retry: bool,
    ) -> AppResult<Result<Coordinates, EmptyState>> {
        if let Some(coordinates) = supplied {
            save_json(self.store, LOCATION_KEY, &LocationMemo::Known { coordinates })?;
            return Ok(Ok(coordinates));
        }

        match load_json::<LocationMemo>(self.store, LOCATION_KEY)? {
            Some(LocationMemo::Known { coordinates }) => Ok(Ok(coordinates)),
            Some(LocationMemo::Denied) if retry => {
                // Forget the denial so the client can prompt again
                self.forget()?;
                Ok(Err(EmptyState::LocationDenied))
            }
            _ => Ok(Err(EmptyState::LocationDenied)),
        }
    }

    /// Records that the user refused to share a location
    pub fn deny(&self) -> AppResult<()> {
        save_json(self.store, LOCATION_KEY, &LocationMemo::Denied)
    }

    pub fn forget(&self) -> AppResult<()> {
        self.store.remove(LOCATION_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MemoryStore;
    use crate::models::{Provider, Venue};

    const AUSTIN_USER: Coordinates = Coordinates {
        latitude: 30.2672,
        longitude: -97.7431,
    };

    fn event_at(id: &str, coordinates: Option<Coordinates>) -> Event {
        Event {
            id: id.to_string(),
            source: Provider::Ticketmaster,
            name: id.to_string(),
            date: None,
            time: None,
            display_date: String::new(),
            venue: Venue::default(),
            coordinates,
            distance_miles: None,
            image_url: None,
            url: None,
            performers: vec![],
            matched_artists: vec![],
            status: None,
        }
    }

    #[test]
    fn test_haversine_zero_distance() {
        assert!(haversine_miles(AUSTIN_USER, AUSTIN_USER).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_nearby_venue() {
        let venue = Coordinates::new(30.2669, -97.7428);
        let d = haversine_miles(AUSTIN_USER, venue);
        assert!((d - 0.027).abs() < 0.01, "distance was {}", d);
    }

    #[test]
    fn test_haversine_austin_to_new_york() {
        let msg = Coordinates::new(40.7505, -73.9934);
        let d = haversine_miles(AUSTIN_USER, msg);
        assert!(d > 1500.0 && d < 1530.0, "distance was {}", d);
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let msg = Coordinates::new(40.7505, -73.9934);
        let there = haversine_miles(AUSTIN_USER, msg);
        let back = haversine_miles(msg, AUSTIN_USER);
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn test_filter_by_radius_excludes_far_venues() {
        let events = vec![
            event_at("austin", Some(Coordinates::new(30.2669, -97.7428))),
            event_at("nyc", Some(Coordinates::new(40.7505, -73.9934))),
        ];

        let kept = filter_by_radius(events, AUSTIN_USER, 300.0);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "austin");
        assert!(kept[0].distance_miles.unwrap() < 0.1);
    }

    #[test]
    fn test_filter_by_radius_drops_unplaceable_items() {
        let events = vec![event_at("nowhere", None)];
        assert!(filter_by_radius(events, AUSTIN_USER, 10_000.0).is_empty());
    }

    #[test]
    fn test_filter_by_radius_every_kept_item_is_within_radius() {
        let events: Vec<Event> = (0..40)
            .map(|i| {
                let offset = i as f64 * 0.25;
                event_at(&i.to_string(), Some(Coordinates::new(30.0 + offset, -97.0 - offset)))
            })
            .collect();

        let radius = 250.0;
        let kept = filter_by_radius(events, AUSTIN_USER, radius);
        assert!(!kept.is_empty());
        for event in &kept {
            let d = haversine_miles(AUSTIN_USER, event.coordinates.unwrap());
            assert!(d <= radius + 1e-9);
        }
    }

    #[test]
    fn test_sort_by_distance_puts_unknown_last() {
        let mut events = vec![
            event_at("unknown", None),
            event_at("far", Some(Coordinates::new(31.0, -97.7431))),
            event_at("near", Some(Coordinates::new(30.3, -97.7431))),
        ];
        events[1].distance_miles = Some(50.9);
        events[2].distance_miles = Some(2.3);
        sort_by_distance(&mut events);

        let order: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(order, vec!["near", "far", "unknown"]);
    }

    #[test]
    fn test_location_memo_reuses_supplied_location() {
        let store = MemoryStore::new();
        let resolver = LocationResolver::new(&store);

        assert_eq!(resolver.resolve(Some(AUSTIN_USER), false).unwrap(), Ok(AUSTIN_USER));
        assert_eq!(resolver.resolve(None, false).unwrap(), Ok(AUSTIN_USER));
    }

    #[test]
    fn test_location_memo_denial_sticks_without_retry() {
        let store = MemoryStore::new();
        let resolver = LocationResolver::new(&store);
        resolver.deny().unwrap();

        assert_eq!(
            resolver.resolve(None, false).unwrap(),
            Err(EmptyState::LocationDenied)
        );
        // A retry that brings coordinates clears the denial
        assert_eq!(resolver.resolve(Some(AUSTIN_USER), true).unwrap(), Ok(AUSTIN_USER));
        assert_eq!(resolver.resolve(None, false).unwrap(), Ok(AUSTIN_USER));
    }

    #[test]
    fn test_location_memo_retry_forgets_denial() {
        let store = MemoryStore::new();
        let resolver = LocationResolver::new(&store);
        resolver.deny().unwrap();

        resolver.resolve(None, true).unwrap();
        assert_eq!(store.get(LOCATION_KEY).unwrap(), None);
    }

    #[test]
    fn test_location_memo_unknown_is_denied_state() {
        let store = MemoryStore::new();
        let resolver = LocationResolver::new(&store);
        assert_eq!(
            resolver.resolve(None, true).unwrap(),
            Err(EmptyState::LocationDenied)
        );
    }
}
