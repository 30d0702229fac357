//! Key record type and its wire representation

use serde::{Deserialize, Serialize};

/// One issued key.
///
/// `key` is immutable once created and doubles as the registry mapping key.
/// `valid` defaults to true at creation; `security_code` is absent until a
/// caller attaches one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Unique opaque identifier
    #[serde(default)]
    pub key: String,

    /// Whether the key currently grants access
    #[serde(default = "default_valid")]
    pub valid: bool,

    /// Auxiliary code attached after creation; meaning left to the caller
    #[serde(default)]
    pub security_code: Option<String>,
}

fn default_valid() -> bool {
    true
}

impl KeyRecord {
    /// Create a record with default flags (valid, no security code)
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            valid: true,
            security_code: None,
        }
    }

    /// Override the validity flag
    pub fn with_valid(mut self, valid: bool) -> Self {
        self.valid = valid;
        self
    }

    /// Attach a security code
    pub fn with_security_code(mut self, code: impl Into<String>) -> Self {
        self.security_code = Some(code.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let record = KeyRecord::new("abc");
        assert_eq!(record.key, "abc");
        assert!(record.valid);
        assert!(record.security_code.is_none());
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let record: KeyRecord = serde_json::from_str(r#"{"key":"abc"}"#).unwrap();
        assert!(record.valid);
        assert!(record.security_code.is_none());
    }

    #[test]
    fn test_serialize_null_security_code() {
        let json = serde_json::to_value(KeyRecord::new("abc")).unwrap();
        assert_eq!(json["valid"], true);
        assert!(json["security_code"].is_null());
    }

    #[test]
    fn test_builder_overrides() {
        let record = KeyRecord::new("abc").with_valid(false).with_security_code("1234");
        assert!(!record.valid);
        assert_eq!(record.security_code.as_deref(), Some("1234"));
    }
}
