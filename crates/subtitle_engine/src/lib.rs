//! Subtitle engine: backend client and the async tasks that drive the
//! pure state machines in `subtitle_core`.
mod client;
mod download;
mod events;
mod filename;
mod persist;
mod poller;
mod registry;
mod submit;
mod types;

pub use client::{BackendClient, ClientSettings, HttpBackend, VIDEO_FIELD};
pub use download::{DownloadError, Downloader};
pub use events::{SubmissionBus, SubmissionEvent};
pub use filename::artifact_filename;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poller::{PollerSettings, StatusPoller};
pub use registry::RegistryHandle;
pub use submit::{SubmitError, Submitter};
pub use types::{
    BackendError, FailureKind, HealthReport, SubmitReceipt, VideoUpload, NETWORK_ERROR_MESSAGE,
};
