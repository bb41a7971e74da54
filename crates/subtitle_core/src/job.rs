use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Backend-assigned, opaque job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for JobId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Pipeline stage reported by the backend.
///
/// The backend also emits a few intermediate literals (`extracting_audio`,
/// `uploading`, `translating`); they fold into the stage they belong to so
/// the set stays closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    #[serde(alias = "extracting_audio", alias = "uploading")]
    Processing,
    #[serde(alias = "translating")]
    Transcribing,
    Embedding,
    Rendering,
    Completed,
    Failed,
    Error,
}

impl JobStatus {
    pub const ALL: [JobStatus; 8] = [
        JobStatus::Queued,
        JobStatus::Processing,
        JobStatus::Transcribing,
        JobStatus::Embedding,
        JobStatus::Rendering,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Transcribing => "transcribing",
            JobStatus::Embedding => "embedding",
            JobStatus::Rendering => "rendering",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Error => "error",
        }
    }

    /// Terminal statuses never transition again; polling stops on them.
    pub fn is_terminal(self) -> bool {
        match self {
            JobStatus::Completed | JobStatus::Failed | JobStatus::Error => true,
            JobStatus::Queued
            | JobStatus::Processing
            | JobStatus::Transcribing
            | JobStatus::Embedding
            | JobStatus::Rendering => false,
        }
    }

    /// `failed` and `error` are two literals for the same outcome.
    pub fn is_failure(self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Error)
    }

    /// Position along the happy path; `None` for the failure outcome.
    pub fn stage_index(self) -> Option<u8> {
        match self {
            JobStatus::Queued => Some(0),
            JobStatus::Processing => Some(1),
            JobStatus::Transcribing => Some(2),
            JobStatus::Embedding => Some(3),
            JobStatus::Rendering => Some(4),
            JobStatus::Completed => Some(5),
            JobStatus::Failed | JobStatus::Error => None,
        }
    }

    /// Whether moving from `self` to `next` respects pipeline monotonicity.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self.stage_index(), next.stage_index()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == raw)
            .ok_or_else(|| UnknownStatus(raw.to_string()))
    }
}

/// Full snapshot of one job as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub status: JobStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default, alias = "created_at")]
    pub uploaded_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl Job {
    /// Progress clamped to 0..=100, only while the job is still advancing.
    pub fn visible_progress(&self) -> Option<f64> {
        if self.status.is_terminal() {
            return None;
        }
        self.progress
            .filter(|value| value.is_finite())
            .map(|value| value.clamp(0.0, 100.0))
    }

    /// Parsed submission time used for ordering. Accepts RFC 3339 and the
    /// naive ISO-8601 form the backend writes.
    pub fn uploaded_at_key(&self) -> Option<NaiveDateTime> {
        let raw = self.uploaded_at.trim();
        if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
            return Some(with_offset.naive_utc());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListedJob {
    pub job_id: JobId,
    #[serde(flatten)]
    pub job: Job,
}

/// Body of `GET /jobs`: either the id-keyed map or a `{ jobs: [...] }`
/// envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum JobListing {
    Envelope {
        jobs: Vec<ListedJob>,
        #[serde(default)]
        total_jobs: Option<usize>,
    },
    Map(BTreeMap<JobId, Job>),
}

impl JobListing {
    pub fn into_entries(self) -> Vec<(JobId, Job)> {
        match self {
            JobListing::Envelope { jobs, .. } => jobs
                .into_iter()
                .map(|listed| (listed.job_id, listed.job))
                .collect(),
            JobListing::Map(map) => map.into_iter().collect(),
        }
    }
}
