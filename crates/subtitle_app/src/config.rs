use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use subtitle_core::SelectionLimits;
use subtitle_engine::{BackendClient, ClientSettings, HttpBackend, PollerSettings};

use crate::cli::GlobalArgs;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Settings shared by every command, resolved from flags, environment and
/// `.env`.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub backend_url: String,
    pub poll_interval: Duration,
    pub output_dir: PathBuf,
    pub max_upload_bytes: u64,
}

impl AppConfig {
    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        if args.poll_interval_ms == 0 {
            bail!("poll interval must be at least 1 ms");
        }
        if args.max_upload_mb == 0 {
            bail!("upload limit must be at least 1 MB");
        }
        Ok(Self {
            backend_url: args.backend_url.trim().to_string(),
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            output_dir: args.output_dir.clone(),
            max_upload_bytes: args.max_upload_mb.saturating_mul(BYTES_PER_MB),
        })
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.backend_url.clone(),
            ..ClientSettings::default()
        }
    }

    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: self.poll_interval,
        }
    }

    pub fn selection_limits(&self) -> SelectionLimits {
        SelectionLimits {
            max_bytes: self.max_upload_bytes,
            ..SelectionLimits::default()
        }
    }

    pub fn backend(&self) -> Result<Arc<dyn BackendClient>> {
        let client = HttpBackend::new(self.client_settings())
            .with_context(|| format!("cannot use backend url {}", self.backend_url))?;
        Ok(Arc::new(client))
    }
}
