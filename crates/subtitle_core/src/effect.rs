use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchStatus {
        job_id: crate::JobId,
    },
    ScheduleFetch {
        job_id: crate::JobId,
        session: u64,
        delay: Duration,
    },
    CancelTimer,
}
