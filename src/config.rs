//! Configuration for Keyward
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::registry::KeySource;

/// Keyward - key registry service
#[derive(Parser, Debug, Clone)]
#[command(name = "keyward")]
#[command(about = "Key registry service - stores, issues, and verifies license keys")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Path to the local JSON key store (durable source; mutations are
    /// written back synchronously)
    #[arg(long, env = "KEYS_FILE", default_value = "keys.json")]
    pub keys_file: PathBuf,

    /// URL of a remote JSON key document. When set, it replaces the local
    /// file as the authoritative source and mutations stay memory-only.
    #[arg(long, env = "KEYS_URL")]
    pub keys_url: Option<String>,

    /// Timeout for remote key fetches in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value = "15")]
    pub fetch_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Resolve the configured key source (remote URL takes precedence)
    pub fn key_source(&self) -> KeySource {
        match &self.keys_url {
            Some(url) => KeySource::Remote {
                url: url.clone(),
                timeout: Duration::from_secs(self.fetch_timeout_secs),
            },
            None => KeySource::File(self.keys_file.clone()),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.fetch_timeout_secs == 0 {
            return Err("FETCH_TIMEOUT_SECS must be greater than zero".to_string());
        }

        if self.keys_file.as_os_str().is_empty() {
            return Err("KEYS_FILE must not be empty".to_string());
        }

        if let Some(url) = &self.keys_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("KEYS_URL must be an HTTP(S) URL".to_string());
            }
        }

        Ok(())
    }
}
