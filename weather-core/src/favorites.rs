use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::{
    error::StorageError,
    model::{Coordinate, FavoriteLocation, LocationData},
    storage::{FAVORITES_KEY, Storage, read_json, write_json},
};

/// Saved locations, most recently added first, unique by coordinate.
///
/// Every mutation writes the whole list back to storage.
#[derive(Debug)]
pub struct FavoritesStore {
    storage: Arc<dyn Storage>,
    favorites: Mutex<Vec<FavoriteLocation>>,
}

impl FavoritesStore {
    /// Load the persisted list; a corrupt record starts an empty list.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let favorites: Vec<FavoriteLocation> =
            read_json(storage.as_ref(), FAVORITES_KEY).unwrap_or_default();
        tracing::debug!("Loaded {} favorite locations", favorites.len());

        Self {
            storage,
            favorites: Mutex::new(favorites),
        }
    }

    pub fn list(&self) -> Vec<FavoriteLocation> {
        self.favorites.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.favorites.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.favorites.lock().is_empty()
    }

    pub fn is_favorite(&self, coordinate: Coordinate) -> bool {
        self.favorites
            .lock()
            .iter()
            .any(|f| f.coordinate() == coordinate)
    }

    /// Case-insensitive lookup by name or "Name, Region".
    pub fn find_by_name(&self, name: &str) -> Option<FavoriteLocation> {
        let needle = name.trim().to_lowercase();
        let favorites = self.favorites.lock();

        favorites
            .iter()
            .find(|f| f.location.display_name().to_lowercase() == needle)
            .or_else(|| {
                favorites
                    .iter()
                    .find(|f| f.location.name.to_lowercase() == needle)
            })
            .cloned()
    }

    /// Put `location` at the front, replacing any entry at the same coordinate.
    pub fn add(&self, location: LocationData, now: DateTime<Utc>) -> Result<(), StorageError> {
        let coordinate = location.coordinate();
        self.commit(|favorites| {
            favorites.retain(|f| f.coordinate() != coordinate);
            favorites.insert(
                0,
                FavoriteLocation {
                    location,
                    added_at: now,
                },
            );
        })
    }

    pub fn remove(&self, coordinate: Coordinate) -> Result<(), StorageError> {
        self.commit(|favorites| favorites.retain(|f| f.coordinate() != coordinate))
    }

    /// Add when absent, remove when present. Returns whether the location is
    /// a favorite afterwards.
    pub fn toggle(&self, location: LocationData, now: DateTime<Utc>) -> Result<bool, StorageError> {
        if self.is_favorite(location.coordinate()) {
            self.remove(location.coordinate())?;
            Ok(false)
        } else {
            self.add(location, now)?;
            Ok(true)
        }
    }

    /// Apply `change` to a copy, persist it, and keep it only once saved.
    fn commit(&self, change: impl FnOnce(&mut Vec<FavoriteLocation>)) -> Result<(), StorageError> {
        let mut favorites = self.favorites.lock();
        let mut next = favorites.clone();
        change(&mut next);

        write_json(self.storage.as_ref(), FAVORITES_KEY, &next)?;
        *favorites = next;
        Ok(())
    }
}
