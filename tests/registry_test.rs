//! Registry integration tests
//!
//! Covers the durable file-backed variant (persistence, rollback, reload
//! transactionality) and the concurrency properties of key issuance.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use keyward::registry::{KeyRecord, KeyRegistry, KeySource};
use keyward::types::{LoadError, RegistryError};
use tempfile::TempDir;

fn file_registry(dir: &TempDir) -> KeyRegistry {
    KeyRegistry::new(KeySource::File(dir.path().join("keys.json")))
}

#[tokio::test]
async fn test_add_persists_across_instances() {
    let dir = TempDir::new().unwrap();

    let registry = file_registry(&dir);
    registry.load().await.unwrap();
    registry
        .add(KeyRecord::new("abc").with_security_code("1234"))
        .await
        .unwrap();

    // A fresh registry over the same file sees the record
    let reloaded = file_registry(&dir);
    reloaded.load().await.unwrap();

    let record = reloaded.verify("abc").await.unwrap();
    assert_eq!(record.key, "abc");
    assert!(record.valid);
    assert_eq!(record.security_code.as_deref(), Some("1234"));
}

#[tokio::test]
async fn test_set_security_code_persists() {
    let dir = TempDir::new().unwrap();

    let registry = file_registry(&dir);
    registry.load().await.unwrap();
    registry.add(KeyRecord::new("abc")).await.unwrap();
    registry.set_security_code("abc", "9999").await.unwrap();

    let reloaded = file_registry(&dir);
    reloaded.load().await.unwrap();
    let record = reloaded.verify("abc").await.unwrap();
    assert_eq!(record.security_code.as_deref(), Some("9999"));
}

#[tokio::test]
async fn test_snapshot_is_object_form() {
    let dir = TempDir::new().unwrap();

    let registry = file_registry(&dir);
    registry.load().await.unwrap();
    registry.add(KeyRecord::new("abc")).await.unwrap();

    let written = std::fs::read(dir.path().join("keys.json")).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&written).unwrap();

    // Written form is always the object mapping, never the array form
    let entries = value.as_object().expect("object-form snapshot");
    assert_eq!(entries["abc"]["key"], "abc");
    assert_eq!(entries["abc"]["valid"], true);
    assert!(entries["abc"]["security_code"].is_null());
}

#[tokio::test]
async fn test_load_object_payload() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("keys.json"),
        r#"{"abc": {"key": "abc", "valid": true, "security_code": null}}"#,
    )
    .unwrap();

    let registry = file_registry(&dir);
    registry.load().await.unwrap();

    let record = registry.verify("abc").await.unwrap();
    assert!(record.valid);
    assert!(record.security_code.is_none());
}

#[tokio::test]
async fn test_load_array_payload_drops_keyless_entries() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("keys.json"),
        r#"[{"key": "xyz", "valid": false}, {"valid": true}]"#,
    )
    .unwrap();

    let registry = file_registry(&dir);
    registry.load().await.unwrap();

    assert_eq!(registry.len().await, 1);
    assert!(!registry.verify("xyz").await.unwrap().valid);
}

#[tokio::test]
async fn test_load_failure_is_transactional() {
    let dir = TempDir::new().unwrap();

    let registry = file_registry(&dir);
    registry.load().await.unwrap();
    registry.add(KeyRecord::new("abc")).await.unwrap();

    // Corrupt the snapshot behind the registry's back
    std::fs::write(dir.path().join("keys.json"), r#""just a string""#).unwrap();

    let err = registry.load().await.unwrap_err();
    assert!(matches!(err, LoadError::UnsupportedFormat(_)));

    // Prior mapping untouched
    assert!(registry.verify("abc").await.is_ok());
}

#[tokio::test]
async fn test_reload_is_idempotent() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("keys.json"),
        r#"{"abc": {"key": "abc", "valid": true, "security_code": "1"}}"#,
    )
    .unwrap();

    let registry = file_registry(&dir);
    registry.load().await.unwrap();
    let first = registry.list_all().await;

    registry.load().await.unwrap();
    let second = registry.list_all().await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_persist_failure_rolls_back() {
    let dir = TempDir::new().unwrap();

    // Parent directory never created: every persist fails
    let registry = KeyRegistry::new(KeySource::File(dir.path().join("missing").join("keys.json")));
    registry.load().await.unwrap();

    let err = registry.add(KeyRecord::new("abc")).await.unwrap_err();
    assert!(matches!(err, RegistryError::PersistFailed(_)));

    // Rollback: memory never diverges from durable state
    let err = registry.verify("abc").await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));
}

#[tokio::test]
async fn test_set_security_code_rollback_on_persist_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keys.json");
    std::fs::write(
        &path,
        r#"{"abc": {"key": "abc", "valid": true, "security_code": "old"}}"#,
    )
    .unwrap();

    let registry = KeyRegistry::new(KeySource::File(path.clone()));
    registry.load().await.unwrap();

    // Replace the snapshot with a directory so the rename fails
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let err = registry.set_security_code("abc", "new").await.unwrap_err();
    assert!(matches!(err, RegistryError::PersistFailed(_)));

    let record = registry.verify("abc").await.unwrap();
    assert_eq!(record.security_code.as_deref(), Some("old"));
}

#[tokio::test]
async fn test_remote_source_unreachable() {
    // Port 1 refuses connections immediately; well under the timeout
    let registry = KeyRegistry::new(KeySource::Remote {
        url: "http://127.0.0.1:1/keys.json".to_string(),
        timeout: Duration::from_secs(2),
    });

    let err = registry.load().await.unwrap_err();
    assert!(matches!(err, LoadError::SourceUnavailable(_)));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_issued_keys_unique_large_n() {
    let registry = KeyRegistry::memory_only();

    let mut seen = HashSet::new();
    for _ in 0..10_000 {
        let record = registry.issue().await.unwrap();
        assert!(seen.insert(record.key), "issued key collided");
    }

    assert_eq!(registry.len().await, 10_000);
}

#[tokio::test]
async fn test_concurrent_issue_no_lost_updates() {
    let registry = Arc::new(KeyRegistry::memory_only());

    let mut handles = Vec::new();
    for _ in 0..50 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            registry.issue().await.unwrap()
        }));
    }

    let mut keys = HashSet::new();
    for handle in handles {
        let record = handle.await.unwrap();
        assert!(keys.insert(record.key), "concurrent issue collided");
    }

    assert_eq!(keys.len(), 50);
    assert_eq!(registry.len().await, 50);

    // Every issued key is independently verifiable afterwards
    for key in &keys {
        assert!(registry.verify(key).await.is_ok());
    }
}

#[tokio::test]
async fn test_concurrent_mixed_mutations_serialize() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(file_registry(&dir));
    registry.load().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            registry.add(KeyRecord::new(format!("key-{}", i))).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(registry.len().await, 20);

    // The durable snapshot saw every write
    let reloaded = file_registry(&dir);
    reloaded.load().await.unwrap();
    assert_eq!(reloaded.len().await, 20);
}
