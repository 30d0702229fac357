//! Key registry: the authoritative in-memory key-record store
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  KeyRegistry                                                │
//! │                                                             │
//! │  keys: RwLock<HashMap<key, KeyRecord>>                      │
//! │  source: KeySource          (file | remote | none)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry is populated at process start from exactly one source and
//! may be fully replaced by a reload. Mutations (`add`, `issue`,
//! `set_security_code`) hold the write lock across the whole
//! read-compute-write-persist sequence, so readers never observe a
//! partially updated mapping and no two mutations interleave.
//!
//! File-backed registries persist the full mapping synchronously before a
//! mutation reports success; a persist failure rolls the in-memory change
//! back. Remote-backed registries keep mutations memory-only: there is no
//! write path to the remote location, and a restart re-reads the remote
//! document.

pub mod record;
pub mod source;
pub mod store;

pub use record::KeyRecord;
pub use source::KeySource;
pub use store::KeyRegistry;
