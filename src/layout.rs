use serde::{Deserialize, Serialize};

use crate::{
    correlation::CorrelatedEntry,
    roster::RosterSnapshot,
    status::ABSENT_ENTITY_ID,
};

/// Where a player sits in the on-screen party lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyListLayout {
    pub cross_world: bool,
    /// 0 is the local party list, 1 and up are alliance lists.
    pub group_number: u8,
    pub member_index: u8,
}

pub fn locate_entry(roster: &RosterSnapshot, entry: &CorrelatedEntry) -> Option<PartyListLayout> {
    locate(roster, entry.content_id, entry.entity_id)
}

pub fn locate(roster: &RosterSnapshot, content_id: u64, entity_id: u32) -> Option<PartyListLayout> {
    let entity_id = match entity_id {
        0 | ABSENT_ENTITY_ID => None,
        id => Some(id),
    };
    if content_id == 0 && entity_id.is_none() {
        return None;
    }

    if !roster.local_party.is_empty() {
        for (slot, member) in roster.local_party.iter().enumerate() {
            let same_content = content_id > 0 && member.content_id == content_id;
            let same_entity = entity_id.is_some() && entity_id == member.present_entity_id();
            if same_content || same_entity {
                return Some(PartyListLayout {
                    cross_world: false,
                    group_number: 0,
                    member_index: slot as u8,
                });
            }
        }
        return roster
            .alliance
            .iter()
            .find(|member| entity_id.is_some() && entity_id == member.present_entity_id())
            .map(|member| PartyListLayout {
                cross_world: false,
                group_number: member.group_index,
                member_index: member.slot_index,
            });
    }

    if roster.is_cross_realm {
        return roster
            .cross_realm_member_by_content_id(content_id)
            .map(|(group_number, member)| PartyListLayout {
                cross_world: true,
                group_number,
                member_index: member.slot_index,
            });
    }

    None
}
