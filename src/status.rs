use serde::{Deserialize, Serialize};

use crate::{error::SnapshotError, host::GameStateProvider};

/// Low 32 bits of a handle that the host uses for "no entity here".
pub const ABSENT_ENTITY_ID: u32 = 0xE000_0000;
/// Capacity of the host's ready check array: a full 48 player alliance.
pub const MAX_READY_CHECK_ENTRIES: usize = 48;

const SOURCE: &str = "ready check status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyCheckStatus {
    #[default]
    Unknown,
    Ready,
    NotReady,
    MemberNotPresent,
}

impl ReadyCheckStatus {
    /// Decodes the host's status byte. "Awaiting response" carries no answer
    /// yet and folds into `Unknown`, as does anything unrecognised.
    pub fn from_raw(value: u8) -> Self {
        match value {
            2 => Self::Ready,
            3 => Self::NotReady,
            4 => Self::MemberNotPresent,
            _ => Self::Unknown,
        }
    }

    pub fn is_not_ready(self) -> bool {
        matches!(self, Self::NotReady | Self::MemberNotPresent)
    }
}

/// One slot of the host's ready check array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStatusEntry {
    /// Content id for cross-realm parties, an entity id in the low 32 bits for
    /// alliance slots, and meaningless for the local party range.
    #[serde(default)]
    pub identity_handle: u64,
    #[serde(default)]
    pub status: ReadyCheckStatus,
}

impl RawStatusEntry {
    pub fn new(identity_handle: u64, status: ReadyCheckStatus) -> Self {
        Self {
            identity_handle,
            status,
        }
    }

    /// The entity id packed into the handle, if it names a present entity.
    pub fn entity_handle(&self) -> Option<u32> {
        let low = (self.identity_handle & 0xFFFF_FFFF) as u32;
        if self.identity_handle == 0 || low == ABSENT_ENTITY_ID {
            return None;
        }
        Some(low)
    }
}

pub fn read_statuses<P>(host: &P) -> Result<Vec<RawStatusEntry>, SnapshotError>
where
    P: GameStateProvider + ?Sized,
{
    let statuses = host
        .raw_statuses()
        .ok_or(SnapshotError::Unavailable { source_name: SOURCE })?;
    if statuses.len() > MAX_READY_CHECK_ENTRIES {
        return Err(SnapshotError::malformed(
            SOURCE,
            format!(
                "{} entries exceeds capacity of {MAX_READY_CHECK_ENTRIES}",
                statuses.len()
            ),
        ));
    }
    Ok(statuses)
}
