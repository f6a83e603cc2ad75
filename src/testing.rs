use std::sync::{Arc, Mutex};

use crate::{
    error::ReadyCheckError,
    host::{GameStateProvider, ReportSink},
    reporting::NotReadyReport,
    roster::{RosterMember, RosterSnapshot},
    status::{RawStatusEntry, ReadyCheckStatus},
};

#[derive(Debug, Default)]
struct FakeState {
    logged_in: bool,
    roster: Option<RosterSnapshot>,
    statuses: Option<Vec<RawStatusEntry>>,
    missing_source: Option<String>,
}

/// Shared handle so a test can keep mutating the host after handing a clone to
/// the controller.
#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    state: Arc<Mutex<FakeState>>,
}

impl FakeHost {
    pub fn with(roster: RosterSnapshot, statuses: Vec<RawStatusEntry>) -> Self {
        let host = Self::default();
        host.set_logged_in(true);
        host.set_roster(Some(roster));
        host.set_statuses(Some(statuses));
        host
    }

    pub fn set_logged_in(&self, logged_in: bool) {
        self.state.lock().unwrap().logged_in = logged_in;
    }

    pub fn set_roster(&self, roster: Option<RosterSnapshot>) {
        self.state.lock().unwrap().roster = roster;
    }

    pub fn set_statuses(&self, statuses: Option<Vec<RawStatusEntry>>) {
        self.state.lock().unwrap().statuses = statuses;
    }

    pub fn set_missing_source(&self, source_name: &str) {
        self.state.lock().unwrap().missing_source = Some(source_name.to_owned());
    }
}

impl GameStateProvider for FakeHost {
    fn locate_sources(&self) -> Result<(), ReadyCheckError> {
        match self.state.lock().unwrap().missing_source.clone() {
            Some(source_name) => Err(ReadyCheckError::HostSignatureMissing { source_name }),
            None => Ok(()),
        }
    }

    fn is_logged_in(&self) -> bool {
        self.state.lock().unwrap().logged_in
    }

    fn roster(&self) -> Option<RosterSnapshot> {
        self.state.lock().unwrap().roster.clone()
    }

    fn raw_statuses(&self) -> Option<Vec<RawStatusEntry>> {
        self.state.lock().unwrap().statuses.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    reports: Arc<Mutex<Vec<NotReadyReport>>>,
}

impl RecordingSink {
    pub fn reports(&self) -> Vec<NotReadyReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl ReportSink for RecordingSink {
    fn dispatch_not_ready(&self, report: NotReadyReport) {
        self.reports.lock().unwrap().push(report);
    }
}

pub fn statuses(values: &[ReadyCheckStatus]) -> Vec<RawStatusEntry> {
    values
        .iter()
        .map(|status| RawStatusEntry::new(0, *status))
        .collect()
}

/// Three-member local party with the local player in slot 1.
pub fn light_party() -> RosterSnapshot {
    RosterSnapshot {
        local_player_entity_id: Some(0x20),
        local_party: vec![
            RosterMember::new("Thancred", 1, 0x10),
            RosterMember::new("Minfilia", 2, 0x20),
            RosterMember::new("Urianger", 3, 0x30),
        ],
        ..Default::default()
    }
}
