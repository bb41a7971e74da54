//! Subtitle tracker core: pure job model, download gate and the poller and
//! registry state machines. No IO lives here.
mod effect;
mod gate;
mod job;
mod msg;
mod registry;
mod selection;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use gate::{is_downloadable, Artifact, Availability};
pub use job::{Job, JobId, JobListing, JobStatus, ListedJob, UnknownStatus};
pub use msg::Msg;
pub use registry::{ordered_rows, update_registry, RegistryEffect, RegistryMsg, RegistryState};
pub use selection::{
    is_supported_video, validate_selection, SelectedFile, SelectionError, SelectionLimits,
    SubmissionForm, DEFAULT_MAX_UPLOAD_BYTES, SUPPORTED_EXTENSIONS,
};
pub use state::{PollPhase, PollerState, DEFAULT_POLL_INTERVAL};
pub use update::update;
pub use view_model::{JobRowView, PollerView, RegistryView};
