use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use tokio::{
    runtime::{Builder, Handle, Runtime},
    time::sleep,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    config::ReadyCheckConfig,
    correlation::{correlate, CorrelatedEntry},
    error::{ReadyCheckError, SnapshotError},
    events::ReadyCheckEvent,
    host::{GameStateProvider, ReportSink},
    reporting::{project_not_ready, NotReadyReport},
    roster::read_roster,
    status::read_statuses,
    store::ResultStore,
};

/// Cloneable read side of the controller for renderers and other threads.
#[derive(Debug, Clone)]
pub struct ReadyCheckHandle {
    store: Arc<ResultStore>,
    active: Arc<AtomicBool>,
}

impl ReadyCheckHandle {
    pub fn results(&self) -> Option<Vec<CorrelatedEntry>> {
        self.store.get()
    }

    pub fn snapshot(&self) -> Option<Arc<Vec<CorrelatedEntry>>> {
        self.store.snapshot()
    }

    pub fn invalidate(&self) {
        self.store.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Where delayed work runs: the runtime the controller was built in, or a
/// one-worker runtime of its own when built outside one.
#[derive(Debug)]
struct Scheduler {
    handle: Handle,
    owned: Option<Runtime>,
}

impl Scheduler {
    fn current_or_owned() -> Result<Self, ReadyCheckError> {
        if let Ok(handle) = Handle::try_current() {
            return Ok(Self {
                handle,
                owned: None,
            });
        }
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("ready-check-timer")
            .enable_time()
            .build()
            .map_err(|source| ReadyCheckError::SchedulerUnavailable { source })?;
        debug!("no ambient tokio runtime; ready check timers use their own");
        Ok(Self {
            handle: runtime.handle().clone(),
            owned: Some(runtime),
        })
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        drop(self.handle.spawn(task));
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(runtime) = self.owned.take() {
            runtime.shutdown_background();
        }
    }
}

/// At most one pending delayed clear. Arming replaces the previous timer.
#[derive(Debug, Default)]
struct AutoClearTimer {
    cancel: Option<CancellationToken>,
}

impl AutoClearTimer {
    fn arm(
        &mut self,
        scheduler: &Scheduler,
        delay: Duration,
        store: Arc<ResultStore>,
        active: Arc<AtomicBool>,
    ) {
        self.cancel();
        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        scheduler.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = sleep(delay) => {
                    if !token.is_cancelled() && !active.load(Ordering::Acquire) {
                        store.clear();
                        info!(delay_secs = delay.as_secs(), "auto-cleared ready check results");
                    }
                }
            }
        });
    }

    fn cancel(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}

/// Ready check lifecycle state machine.
///
/// Events are processed one at a time, so correlation passes never overlap and
/// the pass run for `Ended` always follows every tick pass before it.
pub struct ReadyCheckController<P> {
    config: ReadyCheckConfig,
    host: P,
    sink: Arc<dyn ReportSink>,
    store: Arc<ResultStore>,
    active: Arc<AtomicBool>,
    auto_clear: AutoClearTimer,
    territory_id: Option<u16>,
    scheduler: Scheduler,
}

impl<P: GameStateProvider> ReadyCheckController<P> {
    pub fn new(
        config: ReadyCheckConfig,
        host: P,
        sink: Arc<dyn ReportSink>,
    ) -> Result<Self, ReadyCheckError> {
        if let Err(err) = host.locate_sources() {
            error!(%err, "ready check helper cannot start");
            return Err(err);
        }
        let scheduler = Scheduler::current_or_owned()?;
        Ok(Self {
            config,
            host,
            sink,
            store: Arc::new(ResultStore::new()),
            active: Arc::new(AtomicBool::new(false)),
            auto_clear: AutoClearTimer::default(),
            territory_id: None,
            scheduler,
        })
    }

    pub fn config(&self) -> &ReadyCheckConfig {
        &self.config
    }

    pub fn handle(&self) -> ReadyCheckHandle {
        ReadyCheckHandle {
            store: Arc::clone(&self.store),
            active: Arc::clone(&self.active),
        }
    }

    pub fn results(&self) -> Option<Vec<CorrelatedEntry>> {
        self.store.get()
    }

    pub fn invalidate(&self) {
        self.store.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn process_event(&mut self, event: ReadyCheckEvent) {
        match event {
            ReadyCheckEvent::Started => self.on_started(),
            ReadyCheckEvent::Ended => self.on_ended(),
            ReadyCheckEvent::Tick => self.on_tick(),
            ReadyCheckEvent::TerritoryChanged { territory_id } => {
                self.on_territory_changed(territory_id)
            }
            ReadyCheckEvent::CombatStarted => self.on_combat_started(),
            ReadyCheckEvent::Logout => self.on_logout(),
        }
    }

    /// Correlates the current host snapshots and publishes the result. On
    /// failure the previous result stays published.
    pub fn run_pass(&self) -> Result<usize, SnapshotError> {
        let outcome = read_roster(&self.host).and_then(|roster| {
            let statuses = read_statuses(&self.host)?;
            correlate(&roster, &statuses)
        });
        match outcome {
            Ok(entries) => {
                let count = entries.len();
                self.store.set(entries);
                Ok(count)
            }
            Err(err) => {
                debug!(%err, "skipping ready check correlation pass");
                Err(err)
            }
        }
    }

    fn on_started(&mut self) {
        if !self.host.is_logged_in() {
            debug!("ignoring ready check start while logged out");
            return;
        }
        self.active.store(true, Ordering::Release);
        self.auto_clear.cancel();
        info!("ready check started");
    }

    fn on_tick(&mut self) {
        if self.is_active() && self.host.is_logged_in() {
            let _ = self.run_pass();
        }
    }

    fn on_ended(&mut self) {
        if !self.host.is_logged_in() {
            debug!("ignoring ready check end while logged out");
            return;
        }
        self.active.store(false, Ordering::Release);
        let _ = self.run_pass();

        let not_ready = self
            .store
            .snapshot()
            .map(|entries| project_not_ready(&entries))
            .unwrap_or_default();
        info!(not_ready = not_ready.len(), "ready check ended");

        if self.config.show_results_in_chat && !not_ready.is_empty() {
            self.dispatch_report(NotReadyReport {
                names: not_ready,
                at: Utc::now(),
            });
        }
        if self.config.clear_after_time {
            self.auto_clear.arm(
                &self.scheduler,
                self.config.clear_delay(),
                Arc::clone(&self.store),
                Arc::clone(&self.active),
            );
        }
    }

    fn on_territory_changed(&mut self, territory_id: u16) {
        self.territory_id = Some(territory_id);
        if self.config.clear_entering_instance && self.config.is_instanced(territory_id) {
            debug!(territory_id, "clearing ready check results on instance entry");
            self.store.clear();
        }
    }

    fn on_combat_started(&mut self) {
        let in_instance = self
            .territory_id
            .is_some_and(|territory_id| self.config.is_instanced(territory_id));
        if self.config.clear_in_combat || (self.config.clear_in_combat_in_instance && in_instance) {
            debug!(in_instance, "clearing ready check results on combat start");
            self.store.clear();
        }
    }

    fn on_logout(&mut self) {
        self.active.store(false, Ordering::Release);
        self.auto_clear.cancel();
        self.store.clear();
        info!("cleared ready check state on logout");
    }

    fn dispatch_report(&self, report: NotReadyReport) {
        let delay = self.config.report_delay();
        if delay.is_zero() {
            self.sink.dispatch_not_ready(report);
            return;
        }
        let sink = Arc::clone(&self.sink);
        self.scheduler.spawn(async move {
            sleep(delay).await;
            sink.dispatch_not_ready(report);
        });
    }
}

impl<P> Drop for ReadyCheckController<P> {
    fn drop(&mut self) {
        self.auto_clear.cancel();
    }
}
