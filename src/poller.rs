//! Periodic usage polling.
//!
//! A single task owns the `UsageClient`, so fetches and credential changes
//! are applied one at a time in the order they arrive. Callers talk to it
//! through a `PollerHandle`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::display::DisplayState;
use crate::usage::UsageClient;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Requests accepted by the poller task.
#[derive(Debug, Clone)]
pub enum PollerCommand {
    /// Fetch now instead of waiting for the next tick
    Refresh,
    /// Replace the session key and fetch with it
    SetCredential(String),
}

/// Receives every display update produced by the poller.
pub trait StatusSink: Send + Sync + 'static {
    fn publish(&self, state: &DisplayState);
}

/// Handle to a running poller task.
pub struct PollerHandle {
    tx: mpsc::Sender<PollerCommand>,
    cancel: CancellationToken,
    task: JoinHandle<DisplayState>,
}

impl PollerHandle {
    pub async fn refresh(&self) -> Result<(), String> {
        self.send(PollerCommand::Refresh).await
    }

    pub async fn set_credential(&self, credential: String) -> Result<(), String> {
        self.send(PollerCommand::SetCredential(credential)).await
    }

    async fn send(&self, command: PollerCommand) -> Result<(), String> {
        self.tx
            .send(command)
            .await
            .map_err(|_| "Poller is not running".to_string())
    }

    /// Stop polling and return the last display state.
    pub async fn shutdown(self) -> Result<DisplayState, String> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|e| format!("Poller task failed: {}", e))
    }
}

/// Start polling on the current tokio runtime. The first fetch happens
/// immediately, later ones every `interval` after the previous fetch.
pub fn spawn_poller(
    client: UsageClient,
    interval: Duration,
    sink: Arc<dyn StatusSink>,
) -> PollerHandle {
    let interval = interval.max(MIN_INTERVAL);
    let (tx, rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_poller(client, interval, rx, cancel.clone(), sink));
    PollerHandle { tx, cancel, task }
}

async fn run_poller(
    mut client: UsageClient,
    interval: Duration,
    mut rx: mpsc::Receiver<PollerCommand>,
    cancel: CancellationToken,
    sink: Arc<dyn StatusSink>,
) -> DisplayState {
    let mut state = DisplayState::new(client.has_credential());
    sink.publish(&state);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    log::info!("Poller: started, interval {}s", interval.as_secs());

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            command = rx.recv() => match command {
                Some(command) => apply_command(&mut client, &mut state, command),
                None => break,
            },
            _ = ticker.tick() => log::debug!("Poller: scheduled fetch"),
        }

        // Anything queued while we were waiting folds into this fetch.
        while let Ok(command) = rx.try_recv() {
            apply_command(&mut client, &mut state, command);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = client.fetch_usage() => outcome,
        };

        if let Err(e) = &outcome {
            log::warn!("Poller: fetch failed: {}", e);
        }
        state.apply(&outcome, Utc::now());
        sink.publish(&state);
        ticker.reset();
    }

    log::info!("Poller: stopped");
    state
}

fn apply_command(client: &mut UsageClient, state: &mut DisplayState, command: PollerCommand) {
    match command {
        PollerCommand::Refresh => log::debug!("Poller: manual refresh"),
        PollerCommand::SetCredential(credential) => {
            client.set_credential(&credential);
            state.credential_configured = client.has_credential();
        }
    }
}
