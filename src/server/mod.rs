//! HTTP server for Keyward

pub mod http;

pub use http::{run, AppState};
