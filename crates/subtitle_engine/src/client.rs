use std::time::Duration;

use bytes::Bytes;
use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use subtitle_core::{Artifact, Job, JobId, JobListing};
use tokio_util::io::ReaderStream;
use url::Url;

use crate::types::ErrorBody;
use crate::{BackendError, FailureKind, HealthReport, SubmitReceipt, VideoUpload};

/// Multipart field the backend reads the upload from.
pub const VIDEO_FIELD: &str = "video";

/// Upper bound on trusting a declared `Content-Length` for preallocation.
const MAX_PREALLOCATED_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Backend origin, or the proxy's `/api` prefix.
    pub base_url: String,
    /// Applies to connection setup only; requests themselves never time out.
    pub connect_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            connect_timeout: Some(Duration::from_secs(10)),
            user_agent: format!("subtitle-tracker/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// The five backend operations plus the job maintenance endpoints.
#[async_trait::async_trait]
pub trait BackendClient: Send + Sync {
    async fn submit(&self, upload: &VideoUpload) -> Result<SubmitReceipt, BackendError>;

    async fn status(&self, job_id: &JobId) -> Result<Job, BackendError>;

    /// Unordered `jobId -> Job` listing.
    async fn jobs(&self) -> Result<Vec<(JobId, Job)>, BackendError>;

    async fn download(&self, job_id: &JobId, artifact: Artifact) -> Result<Bytes, BackendError>;

    async fn delete_job(&self, job_id: &JobId) -> Result<String, BackendError>;

    async fn health(&self) -> Result<HealthReport, BackendError>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct UploadBody {
    job_id: JobId,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

impl HttpBackend {
    pub fn new(settings: ClientSettings) -> Result<Self, BackendError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| BackendError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(BackendError::new(
                FailureKind::InvalidUrl,
                format!("{base_url} is not an http(s) base url"),
            ));
        }

        let mut builder = reqwest::Client::builder().user_agent(settings.user_agent);
        if let Some(timeout) = settings.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| BackendError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Appends percent-encoded path segments to the base url.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                BackendError::new(FailureKind::InvalidUrl, "base url cannot take a path")
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        fallback: &str,
    ) -> Result<reqwest::Response, BackendError> {
        let response = request.send().await.map_err(BackendError::network)?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response, fallback).await)
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        segments: &[&str],
        fallback: &str,
    ) -> Result<T, BackendError> {
        let url = self.endpoint(segments)?;
        engine_debug!("GET {}", url);
        let response = self.send(self.client.get(url), fallback).await?;
        decode_json(response).await
    }
}

#[async_trait::async_trait]
impl BackendClient for HttpBackend {
    async fn submit(&self, upload: &VideoUpload) -> Result<SubmitReceipt, BackendError> {
        let url = self.endpoint(&["upload"])?;
        let file = tokio::fs::File::open(&upload.path).await.map_err(|err| {
            BackendError::new(
                FailureKind::Io,
                format!("cannot read {}: {err}", upload.path.display()),
            )
        })?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, upload.size_bytes)
            .file_name(upload.file_name.clone())
            .mime_str(video_mime(&upload.file_name))
            .map_err(|err| BackendError::new(FailureKind::Io, err.to_string()))?;
        let form = Form::new().part(VIDEO_FIELD, part);

        engine_debug!(
            "POST {} file={} bytes={}",
            url,
            upload.file_name,
            upload.size_bytes
        );
        let response = self
            .send(self.client.post(url).multipart(form), "Upload failed")
            .await?;
        let body: UploadBody = decode_json(response).await?;
        Ok(SubmitReceipt {
            job_id: body.job_id,
            message: body.message,
            status_url: body.status_url,
        })
    }

    async fn status(&self, job_id: &JobId) -> Result<Job, BackendError> {
        self.get_json(&["status", job_id.as_str()], "Failed to fetch job status")
            .await
    }

    async fn jobs(&self) -> Result<Vec<(JobId, Job)>, BackendError> {
        let listing: JobListing = self.get_json(&["jobs"], "Failed to fetch jobs").await?;
        Ok(listing.into_entries())
    }

    async fn download(&self, job_id: &JobId, artifact: Artifact) -> Result<Bytes, BackendError> {
        let url = self.endpoint(&artifact.path_segments(job_id))?;
        engine_debug!("GET {} ({})", url, artifact);
        let response = self.send(self.client.get(url), "Download failed").await?;

        let hint = response
            .content_length()
            .map_or(0, |len| usize::try_from(len).unwrap_or(usize::MAX))
            .min(MAX_PREALLOCATED_BYTES);
        let mut body = Vec::with_capacity(hint);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(BackendError::network)?;
            body.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(body))
    }

    async fn delete_job(&self, job_id: &JobId) -> Result<String, BackendError> {
        let url = self.endpoint(&["jobs", job_id.as_str()])?;
        engine_debug!("DELETE {}", url);
        let response = self
            .send(self.client.delete(url), "Failed to delete job")
            .await?;
        let bytes = response.bytes().await.map_err(BackendError::network)?;
        let body: MessageBody = serde_json::from_slice(&bytes).unwrap_or_default();
        Ok(body.message.unwrap_or_else(|| format!("Job {job_id} deleted")))
    }

    async fn health(&self) -> Result<HealthReport, BackendError> {
        self.get_json(&["health"], "Health check failed").await
    }
}

async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, BackendError> {
    let bytes = response.bytes().await.map_err(BackendError::network)?;
    serde_json::from_slice(&bytes).map_err(|err| {
        engine_warn!("undecodable backend response: {}", err);
        BackendError::new(
            FailureKind::Decode,
            format!("unexpected response body: {err}"),
        )
    })
}

/// Builds the error for a non-2xx answer, preferring the backend's message.
async fn error_from_response(response: reqwest::Response, fallback: &str) -> BackendError {
    let status = response.status();
    let message = match response.bytes().await {
        Ok(bytes) => serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(ErrorBody::message),
        Err(_) => None,
    }
    .unwrap_or_else(|| fallback.to_string());
    engine_warn!("backend answered {}: {}", status, message);
    BackendError::new(FailureKind::HttpStatus(status.as_u16()), message)
}

fn video_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}
