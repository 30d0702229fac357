//! Keyward - key registry service
//!
//! Keyward stores license-style keys, each with a validity flag and an
//! optional security code, and exposes HTTP operations to list, create,
//! verify, and annotate them.
//!
//! ## Services
//!
//! - **Registry**: In-memory key-record store with uniqueness-checked
//!   insertion and full-reload semantics
//! - **Sources**: Authoritative key set from a local JSON file (durable,
//!   mutations persisted) or a remote JSON document (read-only, mutations
//!   memory-only)
//! - **HTTP adapter**: Thin route layer mapping registry operations onto
//!   endpoints

pub mod config;
pub mod registry;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use registry::{KeyRecord, KeyRegistry, KeySource};
pub use server::{run, AppState};
pub use types::{LoadError, RegistryError};
