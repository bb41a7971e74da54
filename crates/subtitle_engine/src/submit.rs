use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use engine_logging::{engine_info, engine_warn};
use subtitle_core::{SelectedFile, SelectionError, SelectionLimits, SubmissionForm};

use crate::events::{SubmissionBus, SubmissionEvent};
use crate::{BackendClient, BackendError, SubmitReceipt, VideoUpload};

const UPLOAD_CANCELLED: &str = "upload cancelled";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("nothing to submit")]
    NothingSelected,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Turns a local selection into an upload and announces accepted jobs.
pub struct Submitter {
    client: Arc<dyn BackendClient>,
    bus: SubmissionBus,
    limits: SelectionLimits,
    form: SubmissionForm,
}

impl Submitter {
    pub fn new(
        client: Arc<dyn BackendClient>,
        bus: SubmissionBus,
        limits: SelectionLimits,
    ) -> Self {
        Self {
            client,
            bus,
            limits,
            form: SubmissionForm::new(),
        }
    }

    pub fn form(&self) -> &SubmissionForm {
        &self.form
    }

    /// Validates a selection locally. Nothing is sent to the backend here.
    pub async fn select(&mut self, paths: Vec<PathBuf>) -> Result<&SelectedFile, SubmitError> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let metadata = tokio::fs::metadata(&path)
                .await
                .map_err(|source| SubmitError::Unreadable {
                    path: path.clone(),
                    source,
                })?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            files.push(SelectedFile {
                path,
                file_name,
                size_bytes: metadata.len(),
            });
        }

        let limits = self.limits;
        self.form.select(files, &limits).map_err(|err| {
            engine_warn!("selection rejected: {}", err);
            SubmitError::from(err)
        })
    }

    /// Uploads the current selection. On failure the selection is kept so
    /// the caller can retry explicitly.
    pub async fn submit(&mut self) -> Result<SubmitReceipt, SubmitError> {
        let file = self.form.begin_submit().ok_or(SubmitError::NothingSelected)?;
        let upload = VideoUpload {
            path: file.path.clone(),
            file_name: file.file_name.clone(),
            size_bytes: file.size_bytes,
        };

        let in_flight = InFlight::new(&mut self.form);
        match self.client.submit(&upload).await {
            Ok(receipt) => {
                in_flight.succeeded();
                engine_info!("submitted {} as job {}", upload.file_name, receipt.job_id);
                self.bus.publish(SubmissionEvent {
                    job_id: receipt.job_id.clone(),
                    file_name: upload.file_name,
                });
                Ok(receipt)
            }
            Err(err) => {
                engine_warn!("upload of {} failed: {}", upload.file_name, err);
                in_flight.failed(err.message.clone());
                Err(err.into())
            }
        }
    }

    /// Select-then-submit for a single path.
    pub async fn submit_path(&mut self, path: PathBuf) -> Result<SubmitReceipt, SubmitError> {
        self.select(vec![path]).await?;
        self.submit().await
    }
}

/// Settles the form when an upload ends. Dropping it unsettled, as happens
/// when the `submit` future is cancelled, counts as a failed upload so the
/// selection stays available for a retry.
struct InFlight<'a> {
    form: &'a mut SubmissionForm,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn new(form: &'a mut SubmissionForm) -> Self {
        Self {
            form,
            settled: false,
        }
    }

    fn succeeded(mut self) {
        self.settled = true;
        self.form.submit_succeeded();
    }

    fn failed(mut self, message: String) {
        self.settled = true;
        self.form.submit_failed(message);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            engine_warn!("upload cancelled before the backend answered");
            self.form.submit_failed(UPLOAD_CANCELLED);
        }
    }
}
