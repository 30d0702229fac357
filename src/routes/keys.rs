//! Key registry endpoints
//!
//! Keyward is a thin HTTP adapter over the registry. Handlers only parse
//! the request, call the matching registry operation, and translate the
//! result to a status code; all invariants live in the registry.
//!
//! ## Routes
//!
//! - `GET  /keys` - List all key records
//! - `POST /keys` - Add a record supplied by the caller
//! - `POST /keys/issue` - Generate and insert a fresh key
//! - `POST /keys/reload` - Replace the mapping from the configured source
//! - `GET  /verify_key?key=K` - Look up a key
//! - `POST /set_security?key=K&code=C` - Attach a security code

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::registry::KeyRecord;
use crate::server::AppState;
use crate::types::{LoadError, RegistryError};

/// API error response
#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    code: &'static str,
}

/// Build a JSON error response
fn error_response(status: StatusCode, message: &str, code: &'static str) -> Response<Full<Bytes>> {
    let error = ApiError {
        error: message.to_string(),
        code,
    };
    let body = serde_json::to_vec(&error).unwrap_or_default();

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::from(r#"{"error":"Internal error"}"#)))
                .unwrap()
        })
}

/// Build a successful JSON response
fn json_response(data: Vec<u8>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(data)))
        .unwrap()
}

/// Translate a registry error into the adapter's failure representation
fn registry_error_response(err: RegistryError) -> Response<Full<Bytes>> {
    let code = match &err {
        RegistryError::AlreadyExists(_) => "KEY_EXISTS",
        RegistryError::NotFound(_) => "KEY_NOT_FOUND",
        RegistryError::PersistFailed(_) => "PERSIST_FAILED",
    };
    error_response(err.status_code(), &err.to_string(), code)
}

/// Translate a load error into the adapter's failure representation
fn load_error_response(err: LoadError) -> Response<Full<Bytes>> {
    let code = match &err {
        LoadError::SourceUnavailable(_) => "SOURCE_UNAVAILABLE",
        LoadError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
    };
    error_response(err.status_code(), &err.to_string(), code)
}

/// Parse query string into key-value map
fn parse_query_params(query: &str) -> HashMap<String, String> {
    if query.is_empty() {
        return HashMap::new();
    }

    query
        .split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next().unwrap_or("");
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Handle GET /keys
///
/// Returns the full mapping in its persisted object form.
pub async fn handle_list_keys(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let keys = state.registry.list_all().await;
    debug!(count = keys.len(), "Listing keys");

    let body = serde_json::to_vec(&keys).unwrap_or_default();
    json_response(body)
}

/// Handle POST /keys
///
/// Body: a key record; `valid` defaults to true and `security_code` to null
/// when omitted. Duplicate keys are a client error.
pub async fn handle_add_key(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let body_bytes = match req.collect().await {
        Ok(b) => b.to_bytes(),
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read body: {}", e),
                "INVALID_BODY",
            );
        }
    };

    let record: KeyRecord = match serde_json::from_slice(&body_bytes) {
        Ok(r) => r,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid key record: {}", e),
                "INVALID_BODY",
            );
        }
    };

    if record.key.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Key record requires a non-empty 'key' field",
            "INVALID_BODY",
        );
    }

    let key = record.key.clone();
    match state.registry.add(record).await {
        Ok(()) => {
            let body = json!({ "message": "Key added successfully", "key": key });
            json_response(serde_json::to_vec(&body).unwrap_or_default())
        }
        Err(e) => registry_error_response(e),
    }
}

/// Handle POST /keys/issue
///
/// Generates a fresh key with default flags and returns the new record.
pub async fn handle_issue_key(state: Arc<AppState>) -> Response<Full<Bytes>> {
    match state.registry.issue().await {
        Ok(record) => {
            let body = json!({ "message": "Key issued successfully", "key_data": record });
            json_response(serde_json::to_vec(&body).unwrap_or_default())
        }
        Err(e) => registry_error_response(e),
    }
}

/// Handle POST /keys/reload
///
/// Replaces the entire mapping from the configured source. Failure leaves
/// the current mapping untouched.
pub async fn handle_reload_keys(state: Arc<AppState>) -> Response<Full<Bytes>> {
    match state.registry.load().await {
        Ok(()) => {
            let count = state.registry.len().await;
            let body = json!({ "message": "Key store reloaded", "count": count });
            json_response(serde_json::to_vec(&body).unwrap_or_default())
        }
        Err(e) => load_error_response(e),
    }
}

/// Handle GET /verify_key?key=K
///
/// Returns the validity flag plus the full record. A revoked key is still
/// found; only an absent key is a 404.
pub async fn handle_verify_key(
    state: Arc<AppState>,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let params = parse_query_params(query.unwrap_or(""));
    let key = match params.get("key") {
        Some(k) if !k.is_empty() => k,
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Missing 'key' query parameter",
                "MISSING_PARAM",
            );
        }
    };

    match state.registry.verify(key).await {
        Ok(record) => {
            let body = json!({ "valid": record.valid, "key_data": record });
            json_response(serde_json::to_vec(&body).unwrap_or_default())
        }
        Err(e) => registry_error_response(e),
    }
}

/// Handle POST /set_security?key=K&code=C
///
/// Overwrites the security code unconditionally and returns the updated
/// record.
pub async fn handle_set_security(
    state: Arc<AppState>,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let params = parse_query_params(query.unwrap_or(""));

    let key = match params.get("key") {
        Some(k) if !k.is_empty() => k,
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Missing 'key' query parameter",
                "MISSING_PARAM",
            );
        }
    };
    let code = match params.get("code") {
        Some(c) => c,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Missing 'code' query parameter",
                "MISSING_PARAM",
            );
        }
    };

    match state.registry.set_security_code(key, code).await {
        Ok(record) => {
            let body = json!({ "message": "Security code updated", "key_data": record });
            json_response(serde_json::to_vec(&body).unwrap_or_default())
        }
        Err(e) => registry_error_response(e),
    }
}
