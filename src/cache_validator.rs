use crate::http_client::Source;
use crate::models::SourceOutcome;
use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::time::Duration;

/// Response cache for adapter results, keyed by request fingerprint.
///
/// Entries are stored as `ValidatedCacheEntry` JSON and re-checked on read;
/// an entry that fails its checksum is dropped and the source is queried again.
/// Error-tagged outcomes are never cached.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Cache<String, String>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(max_capacity)
                .build(),
        }
    }

    /// SHA-256 of `source:input`, lowercased and trimmed so trivially
    /// different spellings of the same query share an entry.
    pub fn fingerprint(source: Source, input: &str) -> String {
        let normalized = input.trim().to_lowercase();
        let mut hasher = Sha256::new();
        hasher.update(source.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(normalized.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cached = self.inner.get(key).await?;
        match ValidatedCacheEntry::deserialize_and_validate(&cached) {
            Some(valid_data) => serde_json::from_str(&valid_data).ok(),
            None => {
                self.inner.invalidate(key).await;
                None
            }
        }
    }

    pub async fn insert<T: Serialize>(&self, key: String, value: &T) {
        if let Ok(json_str) = serde_json::to_string(value) {
            let entry = ValidatedCacheEntry::new(json_str);
            self.inner.insert(key, entry.serialize()).await;
        }
    }

    /// Returns the cached record for `key`, or runs `fetch` and caches a
    /// successful outcome.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: String, fetch: F) -> SourceOutcome<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = SourceOutcome<T>>,
    {
        if let Some(hit) = self.get::<T>(&key).await {
            tracing::debug!("Response cache HIT: {}", &key[..12.min(key.len())]);
            return SourceOutcome::Data(hit);
        }

        let outcome = fetch().await;
        if let SourceOutcome::Data(ref data) = outcome {
            self.insert(key, data).await;
        }
        outcome
    }

    #[cfg(test)]
    async fn insert_raw(&self, key: String, raw: String) {
        self.inner.insert(key, raw).await;
    }
}

/// Wrapper for cached data with integrity validation
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValidatedCacheEntry {
    /// The actual cached data (JSON string)
    pub data: String,
    /// SHA-256 checksum of the data (hex encoded)
    pub checksum: String,
}

impl ValidatedCacheEntry {
    /// Creates a new validated cache entry with computed checksum
    pub fn new(data: String) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns true if the checksum matches, false if tampered
    pub fn is_valid(&self) -> bool {
        let computed = Self::compute_checksum(&self.data);
        computed == self.checksum
    }

    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Returns Some(data) if valid, None if corrupted or invalid JSON
    pub fn deserialize_and_validate(serialized: &str) -> Option<String> {
        let entry: ValidatedCacheEntry = serde_json::from_str(serialized).ok()?;

        if entry.is_valid() {
            Some(entry.data)
        } else {
            tracing::warn!(
                "Cache validation failed: checksum mismatch. Expected: {}, Data length: {}",
                entry.checksum,
                entry.data.len()
            );
            None
        }
    }
}
