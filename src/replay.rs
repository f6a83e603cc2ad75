use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, Result};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::{
    error::ReadyCheckError,
    host::GameStateProvider,
    protocol::{CaptureMessage, HostState},
    roster::RosterSnapshot,
    status::RawStatusEntry,
    worker::{flush_worker, WorkerMessage},
};

/// Host backed by recorded frames. Reads always see the most recently applied
/// frame.
#[derive(Debug, Clone, Default)]
pub struct ReplayHost {
    state: Arc<Mutex<Option<HostState>>>,
}

impl ReplayHost {
    pub fn apply(&self, state: HostState) {
        *self.lock() = Some(state);
    }

    fn lock(&self) -> MutexGuard<'_, Option<HostState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GameStateProvider for ReplayHost {
    fn locate_sources(&self) -> Result<(), ReadyCheckError> {
        if self.lock().is_some() {
            Ok(())
        } else {
            Err(ReadyCheckError::HostSignatureMissing {
                source_name: "capture host state".to_owned(),
            })
        }
    }

    fn is_logged_in(&self) -> bool {
        self.lock().as_ref().is_some_and(|state| state.logged_in)
    }

    fn roster(&self) -> Option<RosterSnapshot> {
        self.lock().as_ref().and_then(|state| state.roster.clone())
    }

    fn raw_statuses(&self) -> Option<Vec<RawStatusEntry>> {
        self.lock().as_ref().and_then(|state| state.statuses.clone())
    }
}

/// Feeds a capture through a running worker. Host frames are applied only once
/// the worker has drained every event sent before them.
pub async fn replay_capture(
    messages: Vec<CaptureMessage>,
    host: &ReplayHost,
    tx: &UnboundedSender<WorkerMessage>,
) -> Result<()> {
    let total = messages.len();
    for message in messages {
        match message {
            CaptureMessage::HostState(state) => {
                flush_worker(tx).await?;
                debug!(logged_in = state.logged_in, "applying host frame");
                host.apply(state);
            }
            CaptureMessage::Event(event) => {
                tx.send(WorkerMessage::Event(event))
                    .map_err(|_| anyhow!("ready check worker stopped during replay"))?;
            }
        }
    }
    flush_worker(tx).await?;
    info!(messages = total, "capture replay finished");
    Ok(())
}
