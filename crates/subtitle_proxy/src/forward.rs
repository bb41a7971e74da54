use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use bytes::Bytes;
use engine_logging::{engine_debug, engine_error};
use url::Url;

use crate::error::ProxyError;
use crate::ProxyConfig;

/// Response headers worth relaying; the rest describe the backend hop.
const RELAYED_HEADERS: [axum::http::HeaderName; 2] = [CONTENT_TYPE, CONTENT_DISPOSITION];

/// How the backend's answer travels back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relay {
    /// Read in full first, so a dropped backend connection still becomes a
    /// 500 error envelope. Used for the small JSON endpoints.
    Buffered,
    /// Piped through as it arrives. The status line goes out before the body
    /// is read, so a backend failure mid-transfer can only truncate the
    /// response. Used for video and subtitle downloads.
    Streamed,
}

#[derive(Clone)]
pub struct ProxyState {
    client: reqwest::Client,
    backend: Url,
    max_body_bytes: usize,
}

impl ProxyState {
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let backend = Url::parse(&config.backend_url)
            .map_err(|err| ProxyError::InvalidBackend(err.to_string()))?;
        if backend.cannot_be_a_base() || !matches!(backend.scheme(), "http" | "https") {
            return Err(ProxyError::InvalidBackend(backend.to_string()));
        }
        // Uploads can be large, so only connection setup is bounded.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| ProxyError::Internal(err.to_string()))?;
        Ok(Self {
            client,
            backend,
            max_body_bytes: config.max_body_bytes,
        })
    }

    pub fn backend(&self) -> &Url {
        &self.backend
    }

    pub(crate) fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    fn target(&self, segments: &[&str]) -> Result<Url, ProxyError> {
        let mut url = self.backend.clone();
        url.path_segments_mut()
            .map_err(|_| ProxyError::InvalidBackend(self.backend.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends the request on to the backend and relays its answer with the
    /// status code untouched.
    async fn forward(
        &self,
        relay: Relay,
        method: Method,
        segments: &[&str],
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response, ProxyError> {
        let url = self.target(segments)?;
        engine_debug!("proxy {} {} ({} bytes)", method, url, body.len());

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(content_type) = headers.get(CONTENT_TYPE) {
            request = request.header(CONTENT_TYPE, content_type.clone());
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let upstream = request.send().await.map_err(|err| {
            engine_error!("proxy {} {} failed: {}", method, url, err);
            ProxyError::Upstream(err.to_string())
        })?;

        let mut response = axum::http::Response::builder().status(upstream.status());
        for name in RELAYED_HEADERS {
            if let Some(value) = upstream.headers().get(&name) {
                response = response.header(name, value.clone());
            }
        }
        engine_debug!("proxy {} {} -> {}", method, url, upstream.status());
        let body = match relay {
            Relay::Buffered => {
                let bytes = upstream.bytes().await.map_err(|err| {
                    engine_error!("proxy {} {} body failed: {}", method, url, err);
                    ProxyError::Upstream(err.to_string())
                })?;
                Body::from(bytes)
            }
            Relay::Streamed => Body::from_stream(upstream.bytes_stream()),
        };
        response
            .body(body)
            .map_err(|err| ProxyError::Internal(err.to_string()))
    }
}

pub(crate) async fn upload(
    State(state): State<ProxyState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    state
        .forward(Relay::Buffered, method, &["upload"], &headers, body)
        .await
}

pub(crate) async fn status(
    State(state): State<ProxyState>,
    Path(job_id): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    state
        .forward(
            Relay::Buffered,
            method,
            &["status", job_id.as_str()],
            &headers,
            body,
        )
        .await
}

pub(crate) async fn jobs(
    State(state): State<ProxyState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    state
        .forward(Relay::Buffered, method, &["jobs"], &headers, body)
        .await
}

pub(crate) async fn job(
    State(state): State<ProxyState>,
    Path(job_id): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    state
        .forward(
            Relay::Buffered,
            method,
            &["jobs", job_id.as_str()],
            &headers,
            body,
        )
        .await
}

pub(crate) async fn download_video(
    State(state): State<ProxyState>,
    Path(job_id): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    state
        .forward(
            Relay::Streamed,
            method,
            &["download", job_id.as_str()],
            &headers,
            body,
        )
        .await
}

pub(crate) async fn download_subtitles(
    State(state): State<ProxyState>,
    Path(job_id): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    state
        .forward(
            Relay::Streamed,
            method,
            &["download", job_id.as_str(), "srt"],
            &headers,
            body,
        )
        .await
}

pub(crate) async fn health(
    State(state): State<ProxyState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    state
        .forward(Relay::Buffered, method, &["health"], &headers, body)
        .await
}
