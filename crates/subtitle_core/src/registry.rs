//! Job registry: the full listing of known jobs, newest first.
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::view_model::{JobRowView, RegistryView};
use crate::{Availability, Job, JobId};

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryMsg {
    /// Explicit user refresh.
    RefreshRequested,
    /// A job was submitted elsewhere in the system.
    JobSubmitted(JobId),
    ListingFetched(Result<Vec<(JobId, Job)>, String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEffect {
    FetchListing,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegistryState {
    jobs: BTreeMap<JobId, Job>,
    loading: bool,
    refresh_queued: bool,
    loaded: bool,
    last_error: Option<String>,
    dirty: bool,
}

impl RegistryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> RegistryView {
        RegistryView {
            jobs: ordered_rows(&self.jobs),
            loading: self.loading,
            error: self.last_error.clone(),
            loaded: self.loaded,
        }
    }

    pub fn get(&self, job_id: &JobId) -> Option<&Job> {
        self.jobs.get(job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn request_fetch(&mut self) -> Vec<RegistryEffect> {
        if self.loading {
            // Coalesce: one more fetch after the current one lands.
            self.refresh_queued = true;
            return Vec::new();
        }
        self.loading = true;
        self.dirty = true;
        vec![RegistryEffect::FetchListing]
    }
}

/// Pure update function for the registry.
pub fn update_registry(
    mut state: RegistryState,
    msg: RegistryMsg,
) -> (RegistryState, Vec<RegistryEffect>) {
    let effects = match msg {
        RegistryMsg::RefreshRequested | RegistryMsg::JobSubmitted(_) => state.request_fetch(),
        RegistryMsg::ListingFetched(result) => {
            state.loading = false;
            state.dirty = true;
            match result {
                Ok(entries) => {
                    state.jobs = entries.into_iter().collect();
                    state.loaded = true;
                    state.last_error = None;
                }
                Err(message) => {
                    state.last_error = Some(message);
                }
            }
            if std::mem::take(&mut state.refresh_queued) {
                state.request_fetch()
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}

/// Rows ordered by upload time, most recent first. Unparseable timestamps
/// sink to the bottom; ties fall back to the job id.
pub fn ordered_rows(jobs: &BTreeMap<JobId, Job>) -> Vec<JobRowView> {
    let mut entries: Vec<(&JobId, &Job)> = jobs.iter().collect();
    entries.sort_by(|(a_id, a), (b_id, b)| compare_newest_first(a, b).then_with(|| a_id.cmp(b_id)));
    entries
        .into_iter()
        .map(|(job_id, job)| JobRowView {
            job_id: job_id.clone(),
            filename: job.filename.clone(),
            status: job.status,
            message: job.message.clone(),
            uploaded_at: job.uploaded_at.clone(),
            progress: job.visible_progress(),
            downloads: Availability::for_status(job.status),
        })
        .collect()
}

fn compare_newest_first(a: &Job, b: &Job) -> Ordering {
    match (a.uploaded_at_key(), b.uploaded_at_key()) {
        (Some(a_key), Some(b_key)) => b_key.cmp(&a_key),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.uploaded_at.cmp(&a.uploaded_at),
    }
}
