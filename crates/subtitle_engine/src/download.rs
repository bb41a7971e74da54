use std::path::PathBuf;
use std::sync::Arc;

use engine_logging::{engine_info, engine_warn};
use subtitle_core::{is_downloadable, Artifact, JobId, JobStatus};
use thiserror::Error;

use crate::filename::artifact_filename;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::{BackendClient, BackendError};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("{artifact} is not available while the job is {status}")]
    NotAvailable {
        artifact: Artifact,
        status: JobStatus,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Fetches finished artifacts and stores them in the output directory.
pub struct Downloader {
    client: Arc<dyn BackendClient>,
    writer: AtomicFileWriter,
}

impl Downloader {
    pub fn new(client: Arc<dyn BackendClient>, writer: AtomicFileWriter) -> Self {
        Self { client, writer }
    }

    /// Downloads `artifact` for a job whose last known status is `status`.
    /// The gate is checked first; a declined request never reaches the backend.
    pub async fn download(
        &self,
        job_id: &JobId,
        status: JobStatus,
        artifact: Artifact,
    ) -> Result<PathBuf, DownloadError> {
        if !is_downloadable(status, artifact) {
            engine_warn!(
                "{} for job {} declined: status is {}",
                artifact,
                job_id,
                status
            );
            return Err(DownloadError::NotAvailable { artifact, status });
        }

        let bytes = self.client.download(job_id, artifact).await?;
        let filename = artifact_filename(job_id, artifact);
        let writer = self.writer.clone();
        let path = tokio::task::spawn_blocking(move || writer.write(&filename, &bytes))
            .await
            .map_err(|err| PersistError::Io(std::io::Error::other(err)))??;

        engine_info!(
            "saved {} for job {} to {}",
            artifact,
            job_id,
            path.display()
        );
        Ok(path)
    }

    /// Looks up the job's current status, then downloads through the gate.
    pub async fn download_current(
        &self,
        job_id: &JobId,
        artifact: Artifact,
    ) -> Result<PathBuf, DownloadError> {
        let job = self.client.status(job_id).await?;
        self.download(job_id, job.status, artifact).await
    }
}
