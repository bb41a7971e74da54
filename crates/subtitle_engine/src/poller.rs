use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use subtitle_core::{update, Effect, JobId, Msg, PollerState, PollerView, DEFAULT_POLL_INTERVAL};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::BackendClient;

#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub interval: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

enum PollerCommand {
    Watch(JobId),
    Refresh,
    Unwatch,
}

impl PollerCommand {
    fn into_msg(self) -> Msg {
        match self {
            PollerCommand::Watch(job_id) => Msg::Watch(job_id),
            PollerCommand::Refresh => Msg::Refresh,
            PollerCommand::Unwatch => Msg::Unwatch,
        }
    }
}

/// Handle to one status poller task. Dropping it stops the task and clears
/// any pending timer.
pub struct StatusPoller {
    cmd_tx: mpsc::UnboundedSender<PollerCommand>,
    view_rx: watch::Receiver<PollerView>,
    shutdown: CancellationToken,
}

impl StatusPoller {
    /// Spawns the poller on the current tokio runtime.
    pub fn spawn(client: Arc<dyn BackendClient>, settings: PollerSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(PollerView::default());
        let shutdown = CancellationToken::new();

        let driver = PollerDriver {
            client,
            state: PollerState::with_interval(settings.interval),
            view_tx,
            shutdown: shutdown.clone(),
            timer: None,
        };
        tokio::spawn(driver.run(cmd_rx));

        Self {
            cmd_tx,
            view_rx,
            shutdown,
        }
    }

    pub fn watch(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(PollerCommand::Watch(job_id));
    }

    /// Manual re-check; the only way out of the errored state.
    pub fn refresh(&self) {
        let _ = self.cmd_tx.send(PollerCommand::Refresh);
    }

    pub fn unwatch(&self) {
        let _ = self.cmd_tx.send(PollerCommand::Unwatch);
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerView> {
        self.view_rx.clone()
    }

    pub fn current(&self) -> PollerView {
        self.view_rx.borrow().clone()
    }

    /// Watches `job_id` and resolves once the poller goes quiet: terminal
    /// status, error, or shutdown. `on_change` sees every intermediate view.
    pub async fn follow(
        &self,
        job_id: JobId,
        mut on_change: impl FnMut(&PollerView),
    ) -> PollerView {
        let mut rx = self.view_rx.clone();
        let _ = rx.borrow_and_update();
        self.watch(job_id);
        loop {
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
            let view = rx.borrow_and_update().clone();
            on_change(&view);
            if view.is_quiescent() {
                return view;
            }
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct PollerDriver {
    client: Arc<dyn BackendClient>,
    state: PollerState,
    view_tx: watch::Sender<PollerView>,
    shutdown: CancellationToken,
    /// At most one armed timer per poller.
    timer: Option<CancellationToken>,
}

impl PollerDriver {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<PollerCommand>) {
        let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<Msg>();
        let shutdown = self.shutdown.clone();
        loop {
            let msg = tokio::select! {
                _ = shutdown.cancelled() => break,
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => cmd.into_msg(),
                    None => break,
                },
                Some(msg) = msg_rx.recv() => msg,
            };
            self.dispatch(msg, &msg_tx);
        }
        self.cancel_timer();
        engine_debug!("status poller stopped");
    }

    fn dispatch(&mut self, msg: Msg, msg_tx: &mpsc::UnboundedSender<Msg>) {
        let before = self.state.snapshot().map(|job| job.status);
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);

        if let (Some(before), Some(after)) = (before, state.snapshot().map(|job| job.status)) {
            if !before.can_transition_to(after) {
                engine_warn!("backend reported {} after {}", after, before);
            }
        }
        if state.consume_dirty() {
            let view = state.view();
            engine_debug!(
                "poller job={:?} phase={:?}",
                view.job_id.as_ref().map(JobId::as_str),
                view.phase
            );
            self.view_tx.send_replace(view);
        }
        self.state = state;

        for effect in effects {
            self.execute(effect, msg_tx);
        }
    }

    fn execute(&mut self, effect: Effect, msg_tx: &mpsc::UnboundedSender<Msg>) {
        match effect {
            Effect::FetchStatus { job_id } => {
                let client = self.client.clone();
                let tx = msg_tx.clone();
                // Not tied to the shutdown token: an in-flight request may
                // finish, the state machine drops its answer if stale.
                tokio::spawn(async move {
                    let result = client.status(&job_id).await.map_err(|err| err.message);
                    let _ = tx.send(Msg::StatusFetched { job_id, result });
                });
            }
            Effect::ScheduleFetch {
                job_id,
                session,
                delay,
            } => {
                self.cancel_timer();
                let token = self.shutdown.child_token();
                self.timer = Some(token.clone());
                let tx = msg_tx.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        _ = tokio::time::sleep(delay) => {
                            let _ = tx.send(Msg::TimerElapsed { job_id, session });
                        }
                    }
                });
            }
            Effect::CancelTimer => self.cancel_timer(),
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}
