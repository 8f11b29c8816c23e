//! Load-or-fetch facade over the cache and provider.
//!
//! Cache file access is blocking, so every cache call runs on the blocking
//! pool.

use std::sync::Arc;

use crate::cache::WeatherCache;
use crate::provider::WeatherProvider;
use crate::types::{WeatherError, WeatherPayload};

#[derive(Debug)]
pub struct WeatherService {
    provider: WeatherProvider,
    cache: Arc<WeatherCache>,
}

impl WeatherService {
    pub fn new(provider: WeatherProvider, cache: WeatherCache) -> Self {
        Self {
            provider,
            cache: Arc::new(cache),
        }
    }

    async fn with_cache<T, F>(&self, f: F) -> Result<T, WeatherError>
    where
        F: FnOnce(&WeatherCache) -> Result<T, WeatherError> + Send + 'static,
        T: Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        tokio::task::spawn_blocking(move || f(&cache))
            .await
            .map_err(|e| WeatherError::Cache(format!("Cache task failed: {}", e)))?
    }

    /// Serve `city` from the cache, fetching and storing it on a miss.
    ///
    /// The fetch runs outside the cache lock; concurrent misses for one city
    /// each call the provider and the last write wins.
    ///
    /// # Errors
    /// Propagates provider errors. A failed cache lookup or write is logged
    /// and does not fail the request.
    pub async fn load_or_fetch(&self, city: &str) -> Result<WeatherPayload, WeatherError> {
        let key = city.to_string();
        match self.with_cache(move |cache| Ok(cache.load(&key))).await {
            Ok(Some(payload)) => return Ok(payload),
            Ok(None) => {}
            Err(e) => tracing::warn!("Weather cache lookup for {} failed: {}", city, e),
        }
        self.refresh(city).await
    }

    /// Fetch `city` from the provider and overwrite its cache entry.
    ///
    /// # Errors
    /// Propagates provider errors.
    pub async fn refresh(&self, city: &str) -> Result<WeatherPayload, WeatherError> {
        let payload = self.provider.fetch(city).await?;

        let key = city.to_string();
        let entry = payload.clone();
        if let Err(e) = self.with_cache(move |cache| cache.store(&key, &entry)).await {
            tracing::warn!("Serving uncached weather for {}: {}", city, e);
        }
        Ok(payload)
    }

    /// Drop the cached entry for `city`. Returns whether one existed.
    ///
    /// # Errors
    /// Returns `WeatherError::Cache` if the entry cannot be removed.
    pub async fn invalidate(&self, city: &str) -> Result<bool, WeatherError> {
        let key = city.to_string();
        self.with_cache(move |cache| cache.invalidate(&key)).await
    }

    /// Drop every cached entry. Returns how many were removed.
    ///
    /// # Errors
    /// Returns `WeatherError::Cache` if the cache directory cannot be cleared.
    pub async fn clear(&self) -> Result<usize, WeatherError> {
        self.with_cache(WeatherCache::clear).await
    }
}
