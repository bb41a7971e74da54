use crate::{Availability, Job, JobId, JobStatus, PollPhase};

/// What a job detail view renders for the watched job.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PollerView {
    pub job_id: Option<JobId>,
    pub phase: PollPhase,
    pub job: Option<Job>,
    pub progress: Option<f64>,
    pub error: Option<String>,
    pub downloads: Availability,
    pub polling: bool,
}

impl PollerView {
    /// No further fetch will happen without an explicit command.
    pub fn is_quiescent(&self) -> bool {
        match self.phase {
            PollPhase::Idle | PollPhase::Errored => true,
            PollPhase::Settled(status) => status.is_terminal(),
            PollPhase::Fetching => false,
        }
    }

    pub fn status(&self) -> Option<JobStatus> {
        self.job.as_ref().map(|job| job.status)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub filename: String,
    pub status: JobStatus,
    pub message: String,
    pub uploaded_at: String,
    pub progress: Option<f64>,
    pub downloads: Availability,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegistryView {
    pub jobs: Vec<JobRowView>,
    pub loading: bool,
    pub error: Option<String>,
    pub loaded: bool,
}
