use crate::{Job, JobId};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Start tracking a job (fresh submission or manual lookup).
    Watch(JobId),
    /// Manual re-check of the watched job.
    Refresh,
    /// Stop tracking; the job view was closed.
    Unwatch,
    /// A status fetch finished.
    StatusFetched {
        job_id: JobId,
        result: Result<Job, String>,
    },
    /// The poll timer for a session fired.
    TimerElapsed { job_id: JobId, session: u64 },
}
