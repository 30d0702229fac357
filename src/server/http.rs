//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. One task per
//! connection; handlers share the registry through `AppState`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Args;
use crate::registry::KeyRegistry;
use crate::routes;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// The key registry, owned here and shared by handle
    pub registry: Arc<KeyRegistry>,
    /// Process start, for the health endpoint's uptime field
    pub started_at: Instant,
}

impl AppState {
    /// Create application state around an already-loaded registry
    pub fn new(args: Args, registry: Arc<KeyRegistry>) -> Self {
        Self {
            args,
            registry,
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Keyward listening on {} ({} source)",
        state.args.listen,
        state.registry.source().kind()
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe - returns 200 if keyward is running
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state)).await
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // Key registry operations
        (Method::GET, "/keys") => routes::handle_list_keys(Arc::clone(&state)).await,
        (Method::POST, "/keys") => routes::handle_add_key(Arc::clone(&state), req).await,
        (Method::POST, "/keys/issue") => routes::handle_issue_key(Arc::clone(&state)).await,
        (Method::POST, "/keys/reload") => routes::handle_reload_keys(Arc::clone(&state)).await,
        (Method::GET, "/verify_key") => {
            routes::handle_verify_key(Arc::clone(&state), query.as_deref()).await
        }
        (Method::POST, "/set_security") => {
            routes::handle_set_security(Arc::clone(&state), query.as_deref()).await
        }

        _ => not_found_response(&path),
    };

    Ok(response)
}

/// 404 response for unmatched routes
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = format!(r#"{{"error":"Not found: {}"}}"#, path);
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
