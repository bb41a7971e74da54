use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use subtitle_core::{
    update_registry, JobId, RegistryEffect, RegistryMsg, RegistryState, RegistryView,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::events::{SubmissionBus, SubmissionEvent};
use crate::{BackendClient, BackendError};

/// Handle to the job registry task. The task refreshes on request and on
/// every submission published on the bus it was spawned with.
pub struct RegistryHandle {
    client: Arc<dyn BackendClient>,
    cmd_tx: mpsc::UnboundedSender<RegistryMsg>,
    view_rx: watch::Receiver<RegistryView>,
    shutdown: CancellationToken,
}

impl RegistryHandle {
    pub fn spawn(client: Arc<dyn BackendClient>, bus: &SubmissionBus) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(RegistryView::default());
        let shutdown = CancellationToken::new();

        let driver = RegistryDriver {
            client: client.clone(),
            state: RegistryState::new(),
            view_tx,
        };
        tokio::spawn(driver.run(cmd_rx, bus.subscribe(), shutdown.clone()));

        Self {
            client,
            cmd_tx,
            view_rx,
            shutdown,
        }
    }

    pub fn refresh(&self) {
        let _ = self.cmd_tx.send(RegistryMsg::RefreshRequested);
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistryView> {
        self.view_rx.clone()
    }

    pub fn current(&self) -> RegistryView {
        self.view_rx.borrow().clone()
    }

    /// Requests a refresh and resolves with the first settled listing after it.
    pub async fn refreshed(&self) -> RegistryView {
        let mut rx = self.view_rx.clone();
        let _ = rx.borrow_and_update();
        self.refresh();
        loop {
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
            let view = rx.borrow_and_update().clone();
            if !view.loading {
                return view;
            }
        }
    }

    /// Deletes a job on the backend, then refreshes the listing.
    pub async fn remove(&self, job_id: &JobId) -> Result<String, BackendError> {
        let message = self.client.delete_job(job_id).await?;
        engine_info!("removed job {}", job_id);
        self.refresh();
        Ok(message)
    }
}

impl Drop for RegistryHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct RegistryDriver {
    client: Arc<dyn BackendClient>,
    state: RegistryState,
    view_tx: watch::Sender<RegistryView>,
}

impl RegistryDriver {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<RegistryMsg>,
        submissions: broadcast::Receiver<SubmissionEvent>,
        shutdown: CancellationToken,
    ) {
        let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<RegistryMsg>();
        let mut submissions = Some(submissions);
        loop {
            let msg = tokio::select! {
                _ = shutdown.cancelled() => break,
                cmd = cmd_rx.recv() => match cmd {
                    Some(msg) => msg,
                    None => break,
                },
                event = next_submission(&mut submissions) => match event {
                    Some(msg) => msg,
                    None => continue,
                },
                Some(msg) = msg_rx.recv() => msg,
            };
            self.dispatch(msg, &msg_tx);
        }
        engine_debug!("job registry stopped");
    }

    fn dispatch(&mut self, msg: RegistryMsg, msg_tx: &mpsc::UnboundedSender<RegistryMsg>) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update_registry(state, msg);
        if state.consume_dirty() {
            self.view_tx.send_replace(state.view());
        }
        self.state = state;

        for effect in effects {
            match effect {
                RegistryEffect::FetchListing => {
                    let client = self.client.clone();
                    let tx = msg_tx.clone();
                    tokio::spawn(async move {
                        let result = client.jobs().await.map_err(|err| err.message);
                        let _ = tx.send(RegistryMsg::ListingFetched(result));
                    });
                }
            }
        }
    }
}

/// Next submission as a registry message; pends forever once the bus closes.
async fn next_submission(
    submissions: &mut Option<broadcast::Receiver<SubmissionEvent>>,
) -> Option<RegistryMsg> {
    let Some(receiver) = submissions.as_mut() else {
        return std::future::pending().await;
    };
    match receiver.recv().await {
        Ok(event) => {
            engine_debug!("registry saw submission of job {}", event.job_id);
            Some(RegistryMsg::JobSubmitted(event.job_id))
        }
        Err(RecvError::Lagged(skipped)) => {
            engine_warn!("registry missed {} submission events", skipped);
            Some(RegistryMsg::RefreshRequested)
        }
        Err(RecvError::Closed) => {
            *submissions = None;
            None
        }
    }
}
