use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::view_model::PollerView;
use crate::{Availability, Job, JobId, JobStatus};

/// Fixed delay between a settled fetch and the next one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPhase {
    #[default]
    Idle,
    Fetching,
    Settled(JobStatus),
    Errored,
}

/// State of one status poller. Owned by exactly one driver.
#[derive(Debug, Clone, PartialEq)]
pub struct PollerState {
    interval: Duration,
    target: Option<JobId>,
    phase: PollPhase,
    snapshot: Option<Job>,
    last_error: Option<String>,
    /// Bumped on every watch/refresh/unwatch; stale timers carry an old value.
    session: u64,
    /// Requests still on the wire, keyed by job, with the session that will
    /// accept their result.
    outstanding: BTreeMap<JobId, u64>,
    dirty: bool,
}

impl Default for PollerState {
    fn default() -> Self {
        Self::with_interval(DEFAULT_POLL_INTERVAL)
    }
}

impl PollerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            target: None,
            phase: PollPhase::Idle,
            snapshot: None,
            last_error: None,
            session: 0,
            outstanding: BTreeMap::new(),
            dirty: false,
        }
    }

    pub fn view(&self) -> PollerView {
        let downloads = self
            .snapshot
            .as_ref()
            .map(|job| Availability::for_status(job.status))
            .unwrap_or_default();
        PollerView {
            job_id: self.target.clone(),
            phase: self.phase,
            progress: self.snapshot.as_ref().and_then(Job::visible_progress),
            job: self.snapshot.clone(),
            error: self.last_error.clone(),
            downloads,
            polling: self.is_polling(),
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn target(&self) -> Option<&JobId> {
        self.target.as_ref()
    }

    pub fn snapshot(&self) -> Option<&Job> {
        self.snapshot.as_ref()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    /// True while a fetch is running or scheduled.
    pub fn is_polling(&self) -> bool {
        match self.phase {
            PollPhase::Fetching => true,
            PollPhase::Settled(status) => !status.is_terminal(),
            PollPhase::Idle | PollPhase::Errored => false,
        }
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn is_fetching(&self, job_id: &JobId) -> bool {
        self.phase == PollPhase::Fetching && self.target.as_ref() == Some(job_id)
    }

    /// Opens a new session for `job_id`. The held snapshot survives only when
    /// the job stays the same.
    pub(crate) fn begin_session(&mut self, job_id: JobId) {
        if self.target.as_ref() != Some(&job_id) {
            self.snapshot = None;
        }
        self.target = Some(job_id);
        self.session += 1;
        self.last_error = None;
        self.dirty = true;
    }

    pub(crate) fn end_session(&mut self) {
        self.session += 1;
        self.target = None;
        self.phase = PollPhase::Idle;
        self.snapshot = None;
        self.last_error = None;
        self.dirty = true;
    }

    /// Moves to `Fetching`. Returns `false` when a request for the job is
    /// already on the wire; that request is adopted by the current session
    /// instead of issuing a second one.
    pub(crate) fn start_fetch(&mut self, job_id: &JobId) -> bool {
        self.phase = PollPhase::Fetching;
        self.dirty = true;
        match self.outstanding.entry(job_id.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(self.session);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(self.session);
                true
            }
        }
    }

    /// Clears the outstanding marker for `job_id` and reports whether the
    /// result still belongs to the current session.
    pub(crate) fn finish_fetch(&mut self, job_id: &JobId) -> bool {
        let accepted_by = self.outstanding.remove(job_id);
        accepted_by == Some(self.session) && self.is_fetching(job_id)
    }

    pub(crate) fn apply_snapshot(&mut self, job: Job) -> JobStatus {
        let status = job.status;
        self.snapshot = Some(job);
        self.phase = PollPhase::Settled(status);
        self.last_error = None;
        self.dirty = true;
        status
    }

    pub(crate) fn apply_error(&mut self, message: String) {
        self.snapshot = None;
        self.phase = PollPhase::Errored;
        self.last_error = Some(message);
        self.dirty = true;
    }
}
