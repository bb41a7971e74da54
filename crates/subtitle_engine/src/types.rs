use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use subtitle_core::JobId;

/// Message shown whenever the backend could not be reached at all.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error: could not reach the processing backend";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub job_id: JobId,
    pub message: Option<String>,
    pub status_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A validated local file ready to be streamed to `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoUpload {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    pub kind: FailureKind,
    pub message: String,
}

impl BackendError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn network(detail: impl fmt::Display) -> Self {
        engine_logging::engine_debug!("transport failure: {}", detail);
        Self::new(FailureKind::Network, NETWORK_ERROR_MESSAGE)
    }

    /// True when the backend answered; false for transport and local failures.
    pub fn is_backend_reported(&self) -> bool {
        matches!(self.kind, FailureKind::HttpStatus(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Network,
    Decode,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unexpected response body"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}

/// Error envelope the backend uses for non-2xx answers.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Picks the human readable message out of `error` or `detail`.
    pub(crate) fn message(self) -> Option<String> {
        if let Some(error) = self.error.filter(|text| !text.trim().is_empty()) {
            return Some(error);
        }
        match self.detail? {
            serde_json::Value::String(text) => Some(text).filter(|text| !text.trim().is_empty()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
