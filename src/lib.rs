//! Ready check correlation core for a game overlay.
//!
//! A [`ReadyCheckController`] reads roster and raw status snapshots from a
//! [`GameStateProvider`], correlates them into [`CorrelatedEntry`] records and
//! publishes the result for renderers and chat reporting.

pub mod config;
pub mod controller;
pub mod correlation;
pub mod error;
pub mod events;
pub mod host;
pub mod layout;
pub mod protocol;
pub mod replay;
pub mod reporting;
pub mod roster;
pub mod status;
pub mod store;
pub mod worker;

#[cfg(test)]
mod testing;

pub use config::ReadyCheckConfig;
pub use controller::{ReadyCheckController, ReadyCheckHandle};
pub use correlation::{correlate, CorrelatedEntry, CorrelationMode};
pub use error::{ReadyCheckError, SnapshotError};
pub use events::ReadyCheckEvent;
pub use host::{GameStateProvider, ReportSink};
pub use reporting::{format_not_ready_message, project_not_ready, NotReadyReport};
pub use roster::{RosterMember, RosterSnapshot};
pub use status::{RawStatusEntry, ReadyCheckStatus};
pub use store::ResultStore;
