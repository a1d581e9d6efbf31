use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::{
    error::StorageError,
    model::{Coordinate, LocationCacheEntry},
    storage::{LOCATION_CACHE_KEY, Storage, read_json, write_json},
};

/// How long a resolved location stays usable without asking for a new fix.
pub const LOCATION_CACHE_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

pub fn location_cache_ttl() -> Duration {
    Duration::milliseconds(LOCATION_CACHE_TTL_MS)
}

/// Single-slot cache of the last resolved location.
#[derive(Debug, Clone)]
pub struct LocationCache {
    storage: Arc<dyn Storage>,
}

impl LocationCache {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// The stored entry, if present, readable and younger than the TTL.
    pub fn load(&self, now: DateTime<Utc>) -> Option<LocationCacheEntry> {
        let entry: LocationCacheEntry = read_json(self.storage.as_ref(), LOCATION_CACHE_KEY)?;

        if is_fresh(&entry, now) {
            Some(entry)
        } else {
            tracing::debug!("Cached location from {} has expired", entry.timestamp);
            None
        }
    }

    /// Overwrite the slot.
    pub fn store(
        &self,
        coordinate: Coordinate,
        city_name: &str,
        is_real_location: bool,
        now: DateTime<Utc>,
    ) -> Result<LocationCacheEntry, StorageError> {
        let entry = LocationCacheEntry {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            city_name: city_name.to_string(),
            timestamp: now,
            is_real_location,
        };
        write_json(self.storage.as_ref(), LOCATION_CACHE_KEY, &entry)?;
        Ok(entry)
    }
}

fn is_fresh(entry: &LocationCacheEntry, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(entry.timestamp) < location_cache_ttl()
}
