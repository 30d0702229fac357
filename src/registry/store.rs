//! The key registry store
//!
//! Owns the in-memory mapping and serializes every mutation behind a write
//! lock that also covers durable persistence, so memory and the snapshot
//! file never diverge after a reported success.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::registry::source::{parse_payload, KeySource};
use crate::registry::KeyRecord;
use crate::types::{LoadError, RegistryError};

/// The authoritative key-record store for the running process.
///
/// Constructed once by the composition root and shared by handle; there is
/// no module-level singleton.
pub struct KeyRegistry {
    source: KeySource,
    keys: RwLock<HashMap<String, KeyRecord>>,
}

impl KeyRegistry {
    /// Create an empty registry wired to the given source.
    ///
    /// The mapping stays empty until `load()` runs.
    pub fn new(source: KeySource) -> Self {
        Self {
            source,
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with no external source (mutations memory-only)
    pub fn memory_only() -> Self {
        Self::new(KeySource::Memory)
    }

    /// The source this registry synchronizes with
    pub fn source(&self) -> &KeySource {
        &self.source
    }

    /// Replace the entire mapping with the current contents of the source.
    ///
    /// Transactional: any fetch or parse failure leaves the prior mapping
    /// untouched. Records added since the last durable persist are
    /// discarded, which is the reload contract, not a bug.
    pub async fn load(&self) -> Result<(), LoadError> {
        // Fetch and parse before taking the lock; readers keep serving the
        // old mapping until the new one is complete.
        let loaded = match self.source.fetch().await? {
            Some(payload) => parse_payload(&payload)?,
            None => HashMap::new(),
        };

        let count = loaded.len();
        let mut keys = self.keys.write().await;
        *keys = loaded;

        info!(count, source = %self.source.describe(), "Key store loaded");
        Ok(())
    }

    /// Insert a record if its key is not already present.
    ///
    /// Durable variants persist the full mapping before returning; a
    /// persist failure rolls the insertion back.
    pub async fn add(&self, record: KeyRecord) -> Result<(), RegistryError> {
        let mut keys = self.keys.write().await;

        if keys.contains_key(&record.key) {
            return Err(RegistryError::AlreadyExists(record.key));
        }

        let key = record.key.clone();
        keys.insert(key.clone(), record);

        if let Err(e) = self.persist(&keys).await {
            keys.remove(&key);
            warn!(key = %key, error = %e, "Rolled back key insertion after persist failure");
            return Err(e);
        }

        info!(key = %key, "Key added");
        Ok(())
    }

    /// Generate and insert a fresh key with default flags.
    ///
    /// Keys are UUID v4 strings; a collision with an existing key triggers
    /// regeneration rather than an error. The only failure mode is a
    /// persist failure in the durable variant, which is rolled back.
    pub async fn issue(&self) -> Result<KeyRecord, RegistryError> {
        let mut keys = self.keys.write().await;

        let key = loop {
            let candidate = Uuid::new_v4().to_string();
            if !keys.contains_key(&candidate) {
                break candidate;
            }
        };

        let record = KeyRecord::new(key.clone());
        keys.insert(key.clone(), record.clone());

        if let Err(e) = self.persist(&keys).await {
            keys.remove(&key);
            warn!(key = %key, error = %e, "Rolled back issued key after persist failure");
            return Err(e);
        }

        info!(key = %key, "Key issued");
        Ok(record)
    }

    /// Look up a key and return its full current record.
    ///
    /// A record with `valid=false` is still found and returned; callers
    /// needing an authorization decision check `record.valid` themselves.
    pub async fn verify(&self, key: &str) -> Result<KeyRecord, RegistryError> {
        self.keys
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    /// Overwrite the security code of an existing key unconditionally.
    ///
    /// Returns the updated record. Persist failures restore the prior code.
    pub async fn set_security_code(
        &self,
        key: &str,
        code: &str,
    ) -> Result<KeyRecord, RegistryError> {
        let mut keys = self.keys.write().await;

        let record = keys
            .get_mut(key)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))?;

        let previous = record.security_code.replace(code.to_string());
        let updated = record.clone();

        if let Err(e) = self.persist(&keys).await {
            if let Some(record) = keys.get_mut(key) {
                record.security_code = previous;
            }
            warn!(key = %key, error = %e, "Rolled back security code after persist failure");
            return Err(e);
        }

        info!(key = %key, "Security code updated");
        Ok(updated)
    }

    /// Read-only snapshot copy of the full mapping
    pub async fn list_all(&self) -> HashMap<String, KeyRecord> {
        self.keys.read().await.clone()
    }

    /// Current number of records
    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    /// Whether the registry holds no records
    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }

    /// Write the full mapping to the durable snapshot, if this registry has
    /// one. Writes go to a staging file that is renamed over the target so
    /// no failure path leaves a truncated snapshot.
    async fn persist(&self, keys: &HashMap<String, KeyRecord>) -> Result<(), RegistryError> {
        let KeySource::File(path) = &self.source else {
            return Ok(());
        };

        let payload = serde_json::to_vec_pretty(keys)
            .map_err(|e| RegistryError::PersistFailed(e.to_string()))?;

        let staging = staging_path(path);
        tokio::fs::write(&staging, &payload).await?;

        if let Err(e) = tokio::fs::rename(&staging, path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }

        Ok(())
    }
}

/// Staging path next to the snapshot, e.g. `keys.json` → `keys.json.tmp`
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
