use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::store::{load_json, save_json, KeyValueStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    Event, Movie, PreferenceDomain, PreferenceMap, PreferenceStatus, Recipe, Restaurant,
};

/// An item the user can mark
pub trait Preferable {
    fn preference_id(&self) -> String;
    fn status(&self) -> Option<PreferenceStatus>;
    fn set_status(&mut self, status: Option<PreferenceStatus>);
}

macro_rules! impl_preferable {
    ($ty:ty, |$item:ident| $id:expr) => {
        impl Preferable for $ty {
            fn preference_id(&self) -> String {
                let $item = self;
                $id
            }

            fn status(&self) -> Option<PreferenceStatus> {
                self.status
            }

            fn set_status(&mut self, status: Option<PreferenceStatus>) {
                self.status = status;
            }
        }
    };
}

impl_preferable!(Event, |e| e.id.clone());
impl_preferable!(Recipe, |r| r.key.clone());
impl_preferable!(Restaurant, |r| r.id.clone());
impl_preferable!(Movie, |m| m.id.to_string());

/// Reads and writes the per-domain preference maps.
///
/// Every change is written through to the store before returning. Changes
/// are serialized so concurrent clicks never overwrite each other's maps.
#[derive(Clone)]
pub struct PreferenceService {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl PreferenceService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn lock_writes(&self) -> AppResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| AppError::Internal("Preference lock poisoned".to_string()))
    }

    fn storage_key(domain: PreferenceDomain) -> String {
        format!("prefs:{}", domain)
    }

    pub fn load(&self, domain: PreferenceDomain) -> AppResult<PreferenceMap> {
        Ok(load_json(self.store.as_ref(), &Self::storage_key(domain))?.unwrap_or_default())
    }

    fn save(&self, domain: PreferenceDomain, map: &PreferenceMap) -> AppResult<()> {
        save_json(self.store.as_ref(), &Self::storage_key(domain), map)
    }

    /// Toggles a status on an item and persists the map.
    /// Returns the item's status after the toggle.
    pub fn toggle(
        &self,
        domain: PreferenceDomain,
        item_id: &str,
        status: PreferenceStatus,
    ) -> AppResult<Option<PreferenceStatus>> {
        let item_id = item_id.trim();
        if item_id.is_empty() {
            return Err(AppError::InvalidInput("Item id cannot be empty".to_string()));
        }
        if !domain.accepts(status) {
            return Err(AppError::InvalidInput(format!(
                "{:?} is not a valid status for {}",
                status, domain
            )));
        }

        let result = {
            let _guard = self.lock_writes()?;
            let mut map = self.load(domain)?;
            let result = map.toggle(item_id, status, Utc::now());
            self.save(domain, &map)?;
            result
        };

        tracing::info!(
            domain = %domain,
            item_id = %item_id,
            status = ?result,
            "Preference updated"
        );

        Ok(result)
    }

    /// Removes any status from an item
    pub fn clear(&self, domain: PreferenceDomain, item_id: &str) -> AppResult<bool> {
        let _guard = self.lock_writes()?;
        let mut map = self.load(domain)?;
        let removed = map.clear(item_id.trim());
        if removed {
            self.save(domain, &map)?;
        }
        Ok(removed)
    }

    /// Copies the stored status onto every item
    pub fn annotate<T: Preferable>(
        &self,
        domain: PreferenceDomain,
        items: &mut [T],
    ) -> AppResult<()> {
        let map = self.load(domain)?;
        for item in items.iter_mut() {
            item.set_status(map.status(&item.preference_id()));
        }
        Ok(())
    }
}

/// Drops items the user marked as not interested
pub fn hide_dismissed<T: Preferable>(items: Vec<T>) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| item.status() != Some(PreferenceStatus::NotInterested))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{FileStore, MemoryStore};

    fn movie(id: u64) -> Movie {
        Movie {
            id,
            title: format!("Movie {}", id),
            overview: None,
            release_date: None,
            poster_url: None,
            vote_average: None,
            status: None,
        }
    }

    fn service() -> PreferenceService {
        PreferenceService::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_toggle_persists_between_loads() {
        let prefs = service();
        prefs
            .toggle(PreferenceDomain::Comedy, "evt-1", PreferenceStatus::Interested)
            .unwrap();

        let map = prefs.load(PreferenceDomain::Comedy).unwrap();
        assert_eq!(map.status("evt-1"), Some(PreferenceStatus::Interested));
        assert!(prefs.load(PreferenceDomain::Shows).unwrap().is_empty());
    }

    #[test]
    fn test_double_toggle_returns_to_no_status() {
        let prefs = service();
        let first = prefs
            .toggle(PreferenceDomain::Shows, "evt-1", PreferenceStatus::Interested)
            .unwrap();
        let second = prefs
            .toggle(PreferenceDomain::Shows, "evt-1", PreferenceStatus::Interested)
            .unwrap();

        assert_eq!(first, Some(PreferenceStatus::Interested));
        assert_eq!(second, None);
        assert_eq!(prefs.load(PreferenceDomain::Shows).unwrap().status("evt-1"), None);
    }

    #[test]
    fn test_watched_rejected_outside_movies() {
        let prefs = service();
        let result = prefs.toggle(PreferenceDomain::Recipes, "r-1", PreferenceStatus::Watched);
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_empty_item_id_rejected() {
        let prefs = service();
        let result = prefs.toggle(PreferenceDomain::Movies, "  ", PreferenceStatus::Watched);
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_annotate_and_hide() {
        let prefs = service();
        prefs
            .toggle(PreferenceDomain::Movies, "1", PreferenceStatus::Watched)
            .unwrap();
        prefs
            .toggle(PreferenceDomain::Movies, "2", PreferenceStatus::NotInterested)
            .unwrap();

        let mut movies = vec![movie(1), movie(2), movie(3)];
        prefs.annotate(PreferenceDomain::Movies, &mut movies).unwrap();
        assert_eq!(movies[0].status, Some(PreferenceStatus::Watched));
        assert_eq!(movies[1].status, Some(PreferenceStatus::NotInterested));
        assert_eq!(movies[2].status, None);

        let visible = hide_dismissed(movies);
        let ids: Vec<u64> = visible.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_clear_removes_status() {
        let prefs = service();
        prefs
            .toggle(PreferenceDomain::Restaurants, "yelp-1", PreferenceStatus::Interested)
            .unwrap();
        assert!(prefs.clear(PreferenceDomain::Restaurants, "yelp-1").unwrap());
        assert!(!prefs.clear(PreferenceDomain::Restaurants, "yelp-1").unwrap());
    }

    #[test]
    fn test_parallel_toggles_are_all_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = PreferenceService::new(Arc::new(FileStore::open(dir.path()).unwrap()));

        std::thread::scope(|scope| {
            for i in 0..64 {
                let prefs = prefs.clone();
                scope.spawn(move || {
                    let item_id = format!("evt-{}", i);
                    prefs
                        .toggle(PreferenceDomain::Comedy, &item_id, PreferenceStatus::Interested)
                        .unwrap();
                });
            }
        });

        let map = prefs.load(PreferenceDomain::Comedy).unwrap();
        assert_eq!(map.len(), 64);
        assert_eq!(map.status("evt-63"), Some(PreferenceStatus::Interested));
    }
}
