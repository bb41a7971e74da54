//! Pass-through HTTP proxy that exposes the processing backend under `/api`.
//!
//! Requests for the known backend operations are relayed with method, body
//! and content type intact; the backend's status and body come back
//! unchanged. Only transport failures are answered by the proxy itself, as
//! `500 { "error": ... }`.
mod error;
mod forward;

use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use engine_logging::engine_info;
use tokio_util::sync::CancellationToken;

pub use error::ProxyError;
pub use forward::ProxyState;

/// Path prefix the backend surface is mounted under.
pub const API_PREFIX: &str = "/api";

/// Default upload cap, matching the backend's own limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 500 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub listen: SocketAddr,
    pub backend_url: String,
    pub max_body_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            backend_url: "http://127.0.0.1:5000".to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Builds the proxy router. Paths outside the backend surface answer 404
/// without touching the backend.
pub fn router(state: ProxyState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes());
    let api = Router::new()
        .route("/upload", post(forward::upload))
        .route("/status/{job_id}", get(forward::status))
        .route("/jobs", get(forward::jobs))
        .route("/jobs/{job_id}", axum::routing::delete(forward::job))
        .route("/download/{job_id}", get(forward::download_video))
        .route("/download/{job_id}/srt", get(forward::download_subtitles))
        .route("/health", get(forward::health));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(body_limit)
        .with_state(state)
}

/// Serves the proxy until `shutdown` is cancelled.
pub async fn serve(config: ProxyConfig, shutdown: CancellationToken) -> Result<(), ProxyError> {
    let state = ProxyState::new(&config)?;
    let backend = state.backend().clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    engine_info!(
        "proxy listening on http://{}{} -> {}",
        listener.local_addr()?,
        API_PREFIX,
        backend
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    engine_info!("proxy stopped");
    Ok(())
}
