use anyhow::{anyhow, Result};
use crossbeam_channel::Sender;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    controller::ReadyCheckController,
    events::ReadyCheckEvent,
    host::{GameStateProvider, ReportSink},
    reporting::NotReadyReport,
};

#[derive(Debug)]
pub enum WorkerMessage {
    Event(ReadyCheckEvent),
    /// Answered once every message queued before it has been processed.
    Flush(oneshot::Sender<()>),
}

/// Runs the controller on its own task. Events are handled strictly in
/// arrival order, interleaved with a periodic `Tick` at the configured
/// interval. The task ends when every sender is dropped.
pub fn spawn_ready_check_worker<P>(
    controller: ReadyCheckController<P>,
    rx: mpsc::UnboundedReceiver<WorkerMessage>,
) -> JoinHandle<()>
where
    P: GameStateProvider + 'static,
{
    tokio::spawn(async move {
        run_worker_loop(controller, rx).await;
    })
}

async fn run_worker_loop<P: GameStateProvider>(
    mut controller: ReadyCheckController<P>,
    mut rx: mpsc::UnboundedReceiver<WorkerMessage>,
) {
    let tick_interval = controller.config().tick_interval();
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(tick_ms = tick_interval.as_millis() as u64, "ready check worker started");

    loop {
        tokio::select! {
            biased;
            message = rx.recv() => match message {
                Some(WorkerMessage::Event(event)) => {
                    debug!(event = event.label(), "processing ready check event");
                    controller.process_event(event);
                }
                Some(WorkerMessage::Flush(done)) => {
                    let _ = done.send(());
                }
                None => break,
            },
            _ = ticker.tick() => controller.process_event(ReadyCheckEvent::Tick),
        }
    }

    info!("ready check worker stopped");
}

/// Waits until the worker has drained everything sent before this call.
pub async fn flush_worker(tx: &mpsc::UnboundedSender<WorkerMessage>) -> Result<()> {
    let (done_tx, done_rx) = oneshot::channel();
    tx.send(WorkerMessage::Flush(done_tx))
        .map_err(|_| anyhow!("ready check worker is not running"))?;
    done_rx
        .await
        .map_err(|_| anyhow!("ready check worker stopped before flushing"))
}

/// Forwards not-ready reports into a crossbeam channel for a UI or chat thread.
#[derive(Debug, Clone)]
pub struct ChannelReportSink {
    tx: Sender<NotReadyReport>,
}

impl ChannelReportSink {
    pub fn new(tx: Sender<NotReadyReport>) -> Self {
        Self { tx }
    }
}

impl ReportSink for ChannelReportSink {
    fn dispatch_not_ready(&self, report: NotReadyReport) {
        let count = report.names.len();
        if self.tx.send(report).is_err() {
            warn!(count, "dropping not-ready report; receiver is gone");
        }
    }
}
