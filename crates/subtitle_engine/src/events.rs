//! Submission notifications, backed by a `tokio::sync::broadcast` channel.
//!
//! The submitter publishes here after every accepted upload; registries
//! subscribe and refresh. Neither side knows about the other.

use subtitle_core::JobId;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionEvent {
    pub job_id: JobId,
    pub file_name: String,
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 64;

/// Fan-out channel for [`SubmissionEvent`]s. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SubmissionBus {
    sender: broadcast::Sender<SubmissionEvent>,
}

impl SubmissionBus {
    /// When the buffer is full, slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers; dropped when nobody listens.
    pub fn publish(&self, event: SubmissionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SubmissionBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
