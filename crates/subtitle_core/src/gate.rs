//! Download gate: which artifacts a status allows.
use std::fmt;

use crate::{JobId, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Video with burned-in subtitles.
    Video,
    /// SRT subtitle file.
    Subtitles,
}

impl Artifact {
    pub const ALL: [Artifact; 2] = [Artifact::Video, Artifact::Subtitles];

    /// Backend path segments for this artifact's download endpoint.
    pub fn path_segments<'a>(&self, job_id: &'a JobId) -> Vec<&'a str> {
        match self {
            Artifact::Video => vec!["download", job_id.as_str()],
            Artifact::Subtitles => vec!["download", job_id.as_str(), "srt"],
        }
    }

    pub fn file_name(&self, job_id: &JobId) -> String {
        match self {
            Artifact::Video => format!("{job_id}_with_subtitles.mp4"),
            Artifact::Subtitles => format!("{job_id}.srt"),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Video => f.write_str("video"),
            Artifact::Subtitles => f.write_str("subtitles"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Availability {
    pub video: bool,
    pub subtitles: bool,
}

impl Availability {
    pub fn for_status(status: JobStatus) -> Self {
        match status {
            JobStatus::Completed => Self {
                video: true,
                subtitles: true,
            },
            // The SRT exists before the final render finishes.
            JobStatus::Embedding | JobStatus::Rendering => Self {
                video: false,
                subtitles: true,
            },
            JobStatus::Queued
            | JobStatus::Processing
            | JobStatus::Transcribing
            | JobStatus::Failed
            | JobStatus::Error => Self::default(),
        }
    }

    pub fn allows(&self, artifact: Artifact) -> bool {
        match artifact {
            Artifact::Video => self.video,
            Artifact::Subtitles => self.subtitles,
        }
    }

    pub fn artifacts(&self) -> Vec<Artifact> {
        Artifact::ALL
            .into_iter()
            .filter(|artifact| self.allows(*artifact))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        !self.video && !self.subtitles
    }
}

pub fn is_downloadable(status: JobStatus, artifact: Artifact) -> bool {
    Availability::for_status(status).allows(artifact)
}
