use crate::{
    error::ReadyCheckError,
    reporting::NotReadyReport,
    roster::RosterSnapshot,
    status::RawStatusEntry,
};

/// Read-only view of the game state the ready check core depends on.
///
/// Every method returns a fresh snapshot; `None` means the underlying source is
/// not populated right now (loading screens, zone transitions) and the caller
/// should skip its pass.
pub trait GameStateProvider: Send {
    /// Checked once when the controller is built.
    fn locate_sources(&self) -> Result<(), ReadyCheckError>;

    fn is_logged_in(&self) -> bool;

    fn roster(&self) -> Option<RosterSnapshot>;

    fn raw_statuses(&self) -> Option<Vec<RawStatusEntry>>;
}

/// Receives the list of players who were not ready when a check ended.
/// Delivery is fire-and-forget; formatting is the sink's business.
pub trait ReportSink: Send + Sync {
    fn dispatch_not_ready(&self, report: NotReadyReport);
}
