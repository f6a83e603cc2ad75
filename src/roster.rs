use serde::{Deserialize, Serialize};

use crate::{error::SnapshotError, host::GameStateProvider, status::ABSENT_ENTITY_ID};

pub const MAX_PARTY_MEMBERS: usize = 8;
pub const MAX_ALLIANCE_MEMBERS: usize = 16;
pub const MAX_CROSS_REALM_GROUPS: usize = 6;

const SOURCE: &str = "roster";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RosterMember {
    pub name: String,
    pub content_id: u64,
    pub entity_id: u32,
    pub slot_index: u8,
    pub group_index: u8,
}

impl RosterMember {
    pub fn new(name: impl Into<String>, content_id: u64, entity_id: u32) -> Self {
        Self {
            name: name.into(),
            content_id,
            entity_id,
            ..Default::default()
        }
    }

    pub fn at(mut self, group_index: u8, slot_index: u8) -> Self {
        self.group_index = group_index;
        self.slot_index = slot_index;
        self
    }

    /// Entity id, unless it is zero or the host's absent marker.
    pub fn present_entity_id(&self) -> Option<u32> {
        match self.entity_id {
            0 | ABSENT_ENTITY_ID => None,
            id => Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CrossRealmGroup {
    pub group_index: u8,
    pub members: Vec<RosterMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RosterSnapshot {
    pub is_cross_realm: bool,
    pub local_player_entity_id: Option<u32>,
    /// Same-world party in slot order.
    pub local_party: Vec<RosterMember>,
    /// Both alliance groups, tagged with group 1 or 2.
    pub alliance: Vec<RosterMember>,
    pub cross_realm_groups: Vec<CrossRealmGroup>,
}

impl RosterSnapshot {
    /// A cross-realm flag with a populated local party means the party has
    /// regrouped inside an instance and reports like a regular party.
    pub fn uses_cross_world_addressing(&self) -> bool {
        self.is_cross_realm && self.local_party.is_empty()
    }

    /// First cross-realm member with this content id, paired with the group
    /// it was listed under.
    pub fn cross_realm_member_by_content_id(
        &self,
        content_id: u64,
    ) -> Option<(u8, &RosterMember)> {
        if content_id == 0 {
            return None;
        }
        self.cross_realm_groups.iter().find_map(|group| {
            group
                .members
                .iter()
                .find(|member| member.content_id == content_id)
                .map(|member| (group.group_index, member))
        })
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.local_party.len() > MAX_PARTY_MEMBERS {
            return Err(SnapshotError::malformed(
                SOURCE,
                format!("local party has {} members", self.local_party.len()),
            ));
        }
        if self.alliance.len() > MAX_ALLIANCE_MEMBERS {
            return Err(SnapshotError::malformed(
                SOURCE,
                format!("alliance has {} members", self.alliance.len()),
            ));
        }
        if let Some(member) = self
            .alliance
            .iter()
            .find(|member| !(1..=2).contains(&member.group_index))
        {
            return Err(SnapshotError::malformed(
                SOURCE,
                format!(
                    "alliance member {} tagged with group {}",
                    member.name, member.group_index
                ),
            ));
        }
        if self.cross_realm_groups.len() > MAX_CROSS_REALM_GROUPS {
            return Err(SnapshotError::malformed(
                SOURCE,
                format!("{} cross-realm groups", self.cross_realm_groups.len()),
            ));
        }
        if let Some(group) = self
            .cross_realm_groups
            .iter()
            .find(|group| group.members.len() > MAX_PARTY_MEMBERS)
        {
            return Err(SnapshotError::malformed(
                SOURCE,
                format!(
                    "cross-realm group {} has {} members",
                    group.group_index,
                    group.members.len()
                ),
            ));
        }
        Ok(())
    }
}

pub fn read_roster<P>(host: &P) -> Result<RosterSnapshot, SnapshotError>
where
    P: GameStateProvider + ?Sized,
{
    let roster = host
        .roster()
        .ok_or(SnapshotError::Unavailable { source_name: SOURCE })?;
    roster.validate()?;
    Ok(roster)
}
