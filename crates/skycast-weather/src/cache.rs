//! Per-city weather cache on disk.
//!
//! Each city key (trimmed, lower-cased city name) owns one pretty-printed JSON
//! file in the cache directory. An entry is served until it is older than the
//! TTL, overwritten by a newer fetch, or invalidated.

use crate::types::{WeatherError, WeatherPayload};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

const ENTRY_PREFIX: &str = "weather_";
const ENTRY_SUFFIX: &str = ".json";

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    city: String,
    fetched_at: DateTime<Utc>,
    payload: WeatherPayload,
}

#[derive(Debug)]
pub struct WeatherCache {
    cache_dir: PathBuf,
    ttl: Option<Duration>,
    // Serialises file access within the process.
    lock: Mutex<()>,
}

/// Normalised cache key for a city name.
pub fn cache_key(city: &str) -> String {
    city.trim().to_lowercase()
}

impl WeatherCache {
    /// `ttl` of `None` keeps entries until they are overwritten or invalidated.
    pub fn new(cache_dir: impl Into<PathBuf>, ttl: Option<Duration>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ttl,
            lock: Mutex::new(()),
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.cache_dir
            .join(format!("{}{}{}", ENTRY_PREFIX, &digest[..16], ENTRY_SUFFIX))
    }

    /// Return the cached payload for `city` if there is a fresh, readable entry.
    ///
    /// Missing, empty, corrupt, mismatched and expired entries are all misses.
    pub fn load(&self, city: &str) -> Option<WeatherPayload> {
        let key = cache_key(city);
        let path = self.entry_path(&key);

        let contents = {
            let _guard = self.lock.lock();
            match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::debug!("Weather cache miss for {}", key);
                    return None;
                }
                Err(e) => {
                    tracing::warn!("Failed to read weather cache {:?}: {}", path, e);
                    return None;
                }
            }
        };

        if contents.trim().is_empty() {
            tracing::debug!("Weather cache entry for {} is empty", key);
            return None;
        }

        let entry: CacheEntry = match serde_json::from_str(&contents) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Corrupt weather cache entry {:?}, refetching: {}", path, e);
                return None;
            }
        };

        if entry.city != key {
            tracing::warn!(
                "Weather cache entry {:?} belongs to {}, expected {}",
                path,
                entry.city,
                key
            );
            return None;
        }

        if self.is_expired(entry.fetched_at) {
            tracing::debug!("Weather cache entry for {} expired", key);
            return None;
        }

        tracing::debug!("Weather cache hit for {}", key);
        Some(entry.payload)
    }

    fn is_expired(&self, fetched_at: DateTime<Utc>) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        // Timestamps from the future count as fresh.
        match (Utc::now() - fetched_at).to_std() {
            Ok(age) => age > ttl,
            Err(_) => false,
        }
    }

    /// Write `payload` as the entry for `city`, replacing any previous one.
    ///
    /// The write is not atomic; a crash mid-write leaves a corrupt entry,
    /// which `load` treats as a miss.
    ///
    /// # Errors
    /// Returns `WeatherError::Cache` if the directory or file cannot be written.
    pub fn store(&self, city: &str, payload: &WeatherPayload) -> Result<(), WeatherError> {
        let key = cache_key(city);
        let entry = CacheEntry {
            city: key.clone(),
            fetched_at: Utc::now(),
            payload: payload.clone(),
        };
        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| WeatherError::Cache(format!("Failed to serialize entry: {}", e)))?;
        let path = self.entry_path(&key);

        let _guard = self.lock.lock();
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| WeatherError::Cache(format!("Failed to create cache dir: {}", e)))?;
        fs::write(&path, json)
            .map_err(|e| WeatherError::Cache(format!("Failed to write {:?}: {}", path, e)))?;

        tracing::debug!("Stored weather cache entry for {} at {:?}", key, path);
        Ok(())
    }

    /// Remove the entry for `city`. Returns whether one existed.
    ///
    /// # Errors
    /// Returns `WeatherError::Cache` if the file exists but cannot be removed.
    pub fn invalidate(&self, city: &str) -> Result<bool, WeatherError> {
        let key = cache_key(city);
        let path = self.entry_path(&key);

        let _guard = self.lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Invalidated weather cache for {}", key);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(WeatherError::Cache(format!(
                "Failed to remove {:?}: {}",
                path, e
            ))),
        }
    }

    /// Remove every cache entry. Returns how many were removed.
    ///
    /// # Errors
    /// Returns `WeatherError::Cache` if the directory cannot be listed or an
    /// entry cannot be removed.
    pub fn clear(&self) -> Result<usize, WeatherError> {
        let _guard = self.lock.lock();
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(WeatherError::Cache(format!("Failed to list cache: {}", e))),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| WeatherError::Cache(e.to_string()))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(ENTRY_PREFIX) && name.ends_with(ENTRY_SUFFIX) {
                fs::remove_file(entry.path())
                    .map_err(|e| WeatherError::Cache(format!("Failed to remove {}: {}", name, e)))?;
                removed += 1;
            }
        }

        tracing::info!("Cleared {} weather cache entries", removed);
        Ok(removed)
    }
}
