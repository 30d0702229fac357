//! Key set sources: where the authoritative mapping originates
//!
//! A registry is wired to exactly one source. The local-file source is
//! durable (mutations are written back); the remote source is read-only
//! (remote documents are fetched, never written).
//!
//! Accepted payload shapes:
//! - JSON object: key-string → record fields. The mapping key is
//!   authoritative; it overwrites any conflicting embedded `key` field.
//! - JSON array of record objects, keyed by each object's `key` field.
//!   Entries that lack a usable `key` are skipped, not fatal.
//!
//! Any other top-level shape is `UnsupportedFormat`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::registry::KeyRecord;
use crate::types::LoadError;

/// Source of the authoritative key set
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Local JSON snapshot; mutations are persisted back to this path
    File(PathBuf),

    /// Remote JSON document fetched over HTTP with a bounded timeout
    Remote { url: String, timeout: Duration },

    /// No external source; the registry starts empty and stays memory-only
    Memory,
}

impl KeySource {
    /// Whether mutations are written back to this source
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::File(_))
    }

    /// Short source kind label for logs and the health endpoint
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Remote { .. } => "remote",
            Self::Memory => "memory",
        }
    }

    /// Human-readable source description
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => format!("file:{}", path.display()),
            Self::Remote { url, .. } => format!("remote:{}", url),
            Self::Memory => "memory-only".to_string(),
        }
    }

    /// Fetch the raw payload from this source.
    ///
    /// Returns `None` when the source has no snapshot yet: a memory-only
    /// registry, or a local file that does not exist (the service writes it
    /// on the first durable mutation).
    pub async fn fetch(&self) -> Result<Option<Value>, LoadError> {
        match self {
            Self::Memory => Ok(None),

            Self::File(path) => {
                let bytes = match tokio::fs::read(path).await {
                    Ok(b) => b,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        debug!(path = %path.display(), "Key file not present, starting empty");
                        return Ok(None);
                    }
                    Err(e) => {
                        return Err(LoadError::SourceUnavailable(format!(
                            "Failed to read {}: {}",
                            path.display(),
                            e
                        )));
                    }
                };

                let value = serde_json::from_slice(&bytes).map_err(|e| {
                    LoadError::UnsupportedFormat(format!("{}: {}", path.display(), e))
                })?;
                Ok(Some(value))
            }

            Self::Remote { url, timeout } => {
                let client = reqwest::Client::builder()
                    .timeout(*timeout)
                    .build()
                    .map_err(|e| LoadError::SourceUnavailable(e.to_string()))?;

                let response = client.get(url).send().await?;

                if !response.status().is_success() {
                    return Err(LoadError::SourceUnavailable(format!(
                        "{} returned HTTP {}",
                        url,
                        response.status()
                    )));
                }

                let bytes = response.bytes().await?;
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| LoadError::UnsupportedFormat(format!("{}: {}", url, e)))?;
                Ok(Some(value))
            }
        }
    }
}

/// Convert a raw payload into the key mapping.
///
/// Object payloads must map every key to record-shaped fields; array
/// payloads are lenient, dropping entries that do not parse into a record
/// with a usable `key`.
pub fn parse_payload(payload: &Value) -> Result<HashMap<String, KeyRecord>, LoadError> {
    match payload {
        Value::Object(entries) => {
            let mut keys = HashMap::with_capacity(entries.len());
            for (key, fields) in entries {
                let mut record: KeyRecord =
                    serde_json::from_value(fields.clone()).map_err(|e| {
                        LoadError::UnsupportedFormat(format!("entry '{}': {}", key, e))
                    })?;
                // The mapping key is authoritative over the embedded field
                record.key = key.clone();
                keys.insert(key.clone(), record);
            }
            Ok(keys)
        }

        Value::Array(entries) => {
            let mut keys = HashMap::with_capacity(entries.len());
            for entry in entries {
                match serde_json::from_value::<KeyRecord>(entry.clone()) {
                    Ok(record) if !record.key.is_empty() => {
                        keys.insert(record.key.clone(), record);
                    }
                    Ok(_) => {
                        warn!("Skipping array entry without a key field");
                    }
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed array entry");
                    }
                }
            }
            Ok(keys)
        }

        other => Err(LoadError::UnsupportedFormat(format!(
            "expected object or array, got {}",
            json_type_name(other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
