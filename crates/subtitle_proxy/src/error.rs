use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid backend url: {0}")]
    InvalidBackend(String),

    /// The backend could not be reached or dropped the connection.
    #[error("Failed to reach the processing backend: {0}")]
    Upstream(String),

    #[error("Internal proxy error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        // Backend answers, errors included, are relayed untouched; anything
        // reaching this point is the proxy's own failure.
        let body = json!({ "error": self.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
    }
}
