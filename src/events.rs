use serde::{Deserialize, Serialize};

/// Notifications from the host, consumed by the controller one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReadyCheckEvent {
    Started,
    Ended,
    /// Once per host frame.
    Tick,
    TerritoryChanged {
        territory_id: u16,
    },
    CombatStarted,
    Logout,
}

impl ReadyCheckEvent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Ended => "ended",
            Self::Tick => "tick",
            Self::TerritoryChanged { .. } => "territory_changed",
            Self::CombatStarted => "combat_started",
            Self::Logout => "logout",
        }
    }
}
