use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    error::SnapshotError,
    roster::{RosterMember, RosterSnapshot},
    status::{RawStatusEntry, ReadyCheckStatus, MAX_READY_CHECK_ENTRIES},
};

const SOURCE: &str = "ready check status";

/// One player's ready check answer, attributed to a roster identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelatedEntry {
    pub name: String,
    pub content_id: u64,
    pub entity_id: u32,
    pub ready_state: ReadyCheckStatus,
    /// 0 for the local party, 1 and 2 for alliance groups, and the host's own
    /// group numbering for cross-realm parties.
    pub group_index: u8,
    /// Display position inside the group. For the local party this is not the
    /// raw array position once the self offset has been applied.
    pub member_index: u8,
}

impl CorrelatedEntry {
    pub fn identity(&self) -> (u64, u32) {
        (self.content_id, self.entity_id)
    }

    fn from_member(
        member: &RosterMember,
        ready_state: ReadyCheckStatus,
        group_index: u8,
        member_index: u8,
    ) -> Self {
        Self {
            name: member.name.clone(),
            content_id: member.content_id,
            entity_id: member.entity_id,
            ready_state,
            group_index,
            member_index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationMode {
    Regular,
    CrossWorld,
}

impl CorrelationMode {
    pub fn for_roster(roster: &RosterSnapshot) -> Self {
        if roster.uses_cross_world_addressing() {
            Self::CrossWorld
        } else {
            Self::Regular
        }
    }
}

/// Attributes every raw status to a roster member.
///
/// Entries that cannot be attributed are dropped. Any malformation aborts the
/// whole pass so the caller never publishes a partial list.
pub fn correlate(
    roster: &RosterSnapshot,
    statuses: &[RawStatusEntry],
) -> Result<Vec<CorrelatedEntry>, SnapshotError> {
    roster.validate()?;
    if statuses.len() > MAX_READY_CHECK_ENTRIES {
        return Err(SnapshotError::malformed(
            SOURCE,
            format!("{} entries", statuses.len()),
        ));
    }
    match CorrelationMode::for_roster(roster) {
        CorrelationMode::Regular => correlate_regular(roster, statuses),
        CorrelationMode::CrossWorld => Ok(correlate_cross_world(roster, statuses)),
    }
}

fn correlate_regular(
    roster: &RosterSnapshot,
    statuses: &[RawStatusEntry],
) -> Result<Vec<CorrelatedEntry>, SnapshotError> {
    let alliance_by_entity = alliance_lookup(roster);
    let party_size = roster.local_party.len();
    let mut out = CorrelatedList::with_capacity(statuses.len());
    let mut found_self = false;

    for (i, raw) in statuses.iter().enumerate() {
        if i < party_size {
            // The array always opens with the local player; party members in
            // roster slots before them are shifted one place back.
            let member = &roster.local_party[i];
            if Some(member.entity_id) == roster.local_player_entity_id {
                let status = status_at(statuses, 0)?;
                out.push_front(CorrelatedEntry::from_member(member, status, 0, 0));
                found_self = true;
            } else if !found_self {
                let status = status_at(statuses, i + 1)?;
                out.push(CorrelatedEntry::from_member(member, status, 0, (i + 1) as u8));
            } else {
                let status = status_at(statuses, i)?;
                out.push(CorrelatedEntry::from_member(member, status, 0, i as u8));
            }
        } else if let Some(entity_id) = raw.entity_handle() {
            match alliance_by_entity.get(&entity_id) {
                Some(member) => out.push(CorrelatedEntry {
                    name: member.name.clone(),
                    content_id: member.content_id,
                    entity_id,
                    ready_state: raw.status,
                    group_index: member.group_index,
                    member_index: member.slot_index,
                }),
                None => trace!(
                    index = i,
                    entity_id = format_args!("{entity_id:08X}"),
                    "no alliance member for ready check entry"
                ),
            }
        }
    }

    Ok(out.into_inner())
}

fn correlate_cross_world(
    roster: &RosterSnapshot,
    statuses: &[RawStatusEntry],
) -> Vec<CorrelatedEntry> {
    let mut out = CorrelatedList::with_capacity(statuses.len());
    for raw in statuses {
        match roster.cross_realm_member_by_content_id(raw.identity_handle) {
            Some((group_index, member)) => out.push(CorrelatedEntry::from_member(
                member,
                raw.status,
                group_index,
                member.slot_index,
            )),
            None => trace!(
                content_id = format_args!("{:016X}", raw.identity_handle),
                "no cross-realm member for ready check entry"
            ),
        }
    }
    out.into_inner()
}

/// Alliance members keyed by entity id, group 1 before group 2. The first
/// member seen for an id keeps it.
fn alliance_lookup(roster: &RosterSnapshot) -> HashMap<u32, &RosterMember> {
    let mut members: Vec<&RosterMember> = roster.alliance.iter().collect();
    members.sort_by_key(|member| (member.group_index, member.slot_index));

    let mut lookup = HashMap::with_capacity(members.len());
    for member in members {
        lookup.entry(member.entity_id).or_insert(member);
    }
    lookup
}

fn status_at(statuses: &[RawStatusEntry], index: usize) -> Result<ReadyCheckStatus, SnapshotError> {
    statuses
        .get(index)
        .map(|entry| entry.status)
        .ok_or_else(|| {
            SnapshotError::malformed(
                SOURCE,
                format!("index {index} out of range for {} entries", statuses.len()),
            )
        })
}

/// Output list that keeps at most one entry per identity.
struct CorrelatedList {
    entries: Vec<CorrelatedEntry>,
    seen: HashSet<(u64, u32)>,
}

impl CorrelatedList {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    fn push(&mut self, entry: CorrelatedEntry) {
        if self.admit(&entry) {
            self.entries.push(entry);
        }
    }

    fn push_front(&mut self, entry: CorrelatedEntry) {
        if self.admit(&entry) {
            self.entries.insert(0, entry);
        }
    }

    fn admit(&mut self, entry: &CorrelatedEntry) -> bool {
        let identity = entry.identity();
        // Members with no identity at all cannot collide with anyone.
        if identity == (0, 0) || self.seen.insert(identity) {
            return true;
        }
        trace!(name = %entry.name, "dropping duplicate ready check entry");
        false
    }

    fn into_inner(self) -> Vec<CorrelatedEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{correlate, CorrelatedEntry, CorrelationMode};
    use crate::{
        error::SnapshotError,
        roster::{CrossRealmGroup, RosterMember, RosterSnapshot},
        status::{RawStatusEntry, ReadyCheckStatus, ABSENT_ENTITY_ID},
        testing::{light_party, statuses},
    };

    use ReadyCheckStatus::{MemberNotPresent, NotReady, Ready, Unknown};

    fn names(entries: &[CorrelatedEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    fn alliance_roster() -> RosterSnapshot {
        let mut roster = light_party();
        roster.alliance = vec![
            RosterMember::new("Estinien", 101, 0x1001).at(1, 0),
            RosterMember::new("Aymeric", 102, 0x1002).at(1, 1),
            RosterMember::new("Lucia", 201, 0x2001).at(2, 0),
        ];
        roster
    }

    fn cross_realm_roster() -> RosterSnapshot {
        RosterSnapshot {
            is_cross_realm: true,
            cross_realm_groups: vec![
                CrossRealmGroup {
                    group_index: 0,
                    members: vec![
                        RosterMember::new("G'raha", 9001, 0x50).at(0, 0),
                        RosterMember::new("Krile", 9002, 0x51).at(0, 1),
                    ],
                },
                CrossRealmGroup {
                    group_index: 3,
                    members: vec![RosterMember::new("Tataru", 9003, 0).at(3, 0)],
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn self_entry_moves_to_front_and_earlier_slots_look_ahead() {
        let out = correlate(&light_party(), &statuses(&[Ready, NotReady, Ready]))
            .expect("pass should succeed");

        assert_eq!(names(&out), vec!["Minfilia", "Thancred", "Urianger"]);
        assert_eq!(out[0].ready_state, Ready);
        assert_eq!((out[0].group_index, out[0].member_index), (0, 0));
        assert_eq!(out[1].ready_state, NotReady);
        assert_eq!((out[1].group_index, out[1].member_index), (0, 1));
        assert_eq!(out[2].ready_state, Ready);
        assert_eq!((out[2].group_index, out[2].member_index), (0, 2));
    }

    #[test]
    fn alliance_entry_resolves_through_entity_lookup() {
        let mut raw = statuses(&[Ready, Ready, Ready]);
        raw.push(RawStatusEntry::new(0x1001, NotReady));

        let out = correlate(&alliance_roster(), &raw).expect("pass should succeed");
        let estinien = out
            .iter()
            .find(|entry| entry.name == "Estinien")
            .expect("alliance member should be attributed");
        assert_eq!(estinien.ready_state, NotReady);
        assert_eq!(estinien.content_id, 101);
        assert_eq!(estinien.entity_id, 0x1001);
        assert_eq!((estinien.group_index, estinien.member_index), (1, 0));
    }

    #[test]
    fn absent_sentinel_in_alliance_range_is_dropped() {
        let mut roster = alliance_roster();
        roster
            .alliance
            .push(RosterMember::new("Ghost", 0, ABSENT_ENTITY_ID).at(2, 1));
        let mut raw = statuses(&[Ready, Ready, Ready]);
        raw.push(RawStatusEntry::new(ABSENT_ENTITY_ID as u64, NotReady));
        raw.push(RawStatusEntry::new(0, NotReady));

        let out = correlate(&roster, &raw).expect("pass should succeed");
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|entry| entry.group_index == 0));
    }

    #[test]
    fn unknown_alliance_handle_is_dropped() {
        let mut raw = statuses(&[Ready, Ready, Ready]);
        raw.push(RawStatusEntry::new(0x9999, NotReady));
        raw.push(RawStatusEntry::new(0x2001, MemberNotPresent));

        let out = correlate(&alliance_roster(), &raw).expect("pass should succeed");
        assert_eq!(names(&out), vec!["Minfilia", "Thancred", "Urianger", "Lucia"]);
        assert_eq!(out[3].ready_state, MemberNotPresent);
    }

    #[test]
    fn alliance_lookup_keeps_first_member_per_entity_id() {
        let mut roster = alliance_roster();
        roster.alliance.insert(0, RosterMember::new("Impostor", 999, 0x1001).at(2, 5));
        let mut raw = statuses(&[Ready, Ready, Ready]);
        raw.push(RawStatusEntry::new(0x1001, Ready));

        let out = correlate(&roster, &raw).expect("pass should succeed");
        assert!(out.iter().any(|entry| entry.name == "Estinien"));
        assert!(!out.iter().any(|entry| entry.name == "Impostor"));
    }

    #[test]
    fn repeated_alliance_handle_yields_one_entry() {
        let mut raw = statuses(&[Ready, Ready, Ready]);
        raw.push(RawStatusEntry::new(0x1002, Ready));
        raw.push(RawStatusEntry::new(0x1002, NotReady));

        let out = correlate(&alliance_roster(), &raw).expect("pass should succeed");
        let aymeric: Vec<_> = out.iter().filter(|entry| entry.name == "Aymeric").collect();
        assert_eq!(aymeric.len(), 1);
        assert_eq!(aymeric[0].ready_state, Ready);
    }

    #[test]
    fn alliance_copy_of_local_member_is_not_duplicated() {
        let mut roster = alliance_roster();
        roster
            .alliance
            .insert(0, RosterMember::new("Minfilia", 2, 0x20).at(1, 0));
        let mut raw = statuses(&[NotReady, Ready, Ready]);
        raw.push(RawStatusEntry::new(0x20, Ready));

        let out = correlate(&roster, &raw).expect("pass should succeed");
        let minfilia: Vec<_> = out.iter().filter(|entry| entry.name == "Minfilia").collect();
        assert_eq!(minfilia.len(), 1);
        assert_eq!(minfilia[0].ready_state, NotReady);
        assert_eq!(minfilia[0].group_index, 0);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn cross_world_mode_matches_by_content_id() {
        let roster = cross_realm_roster();
        assert_eq!(CorrelationMode::for_roster(&roster), CorrelationMode::CrossWorld);

        let raw = vec![
            RawStatusEntry::new(9002, Ready),
            RawStatusEntry::new(4242, NotReady),
            RawStatusEntry::new(9003, NotReady),
            RawStatusEntry::new(0, NotReady),
        ];
        let out = correlate(&roster, &raw).expect("pass should succeed");
        assert_eq!(names(&out), vec!["Krile", "Tataru"]);
        assert_eq!(out[0].entity_id, 0x51);
        assert_eq!((out[0].group_index, out[0].member_index), (0, 1));
        assert_eq!((out[1].group_index, out[1].member_index), (3, 0));
        assert_eq!(out[1].ready_state, NotReady);
    }

    #[test]
    fn regrouped_cross_realm_party_correlates_as_regular() {
        let mut roster = light_party();
        roster.is_cross_realm = true;
        assert_eq!(CorrelationMode::for_roster(&roster), CorrelationMode::Regular);

        let out = correlate(&roster, &statuses(&[NotReady, Ready, Ready]))
            .expect("pass should succeed");
        assert_eq!(out[0].name, "Minfilia");
        assert_eq!(out[0].ready_state, NotReady);
    }

    #[test]
    fn missing_local_player_aborts_when_look_ahead_runs_off_the_end() {
        let mut roster = light_party();
        roster.local_player_entity_id = None;

        let err = correlate(&roster, &statuses(&[Ready, Ready, Ready]))
            .expect_err("look-ahead past the array must abort");
        assert!(matches!(err, SnapshotError::Malformed { .. }));
    }

    #[test]
    fn short_status_array_only_covers_present_slots() {
        let out = correlate(&light_party(), &statuses(&[Ready, NotReady]))
            .expect("pass should succeed");
        assert_eq!(names(&out), vec!["Minfilia", "Thancred"]);
    }

    #[test]
    fn oversized_status_array_is_malformed() {
        let raw = vec![RawStatusEntry::new(0, Unknown); 49];
        assert!(matches!(
            correlate(&light_party(), &raw),
            Err(SnapshotError::Malformed { .. })
        ));
    }

    #[test]
    fn empty_roster_and_statuses_produce_empty_list() {
        let out = correlate(&RosterSnapshot::default(), &[]).expect("pass should succeed");
        assert!(out.is_empty());
    }

    fn any_status() -> impl Strategy<Value = ReadyCheckStatus> {
        prop::sample::select(vec![Unknown, Ready, NotReady, MemberNotPresent])
    }

    fn party_with_self(size: usize, self_slot: usize) -> RosterSnapshot {
        RosterSnapshot {
            local_player_entity_id: Some(0x100 + self_slot as u32),
            local_party: (0..size)
                .map(|slot| {
                    RosterMember::new(format!("slot{slot}"), 500 + slot as u64, 0x100 + slot as u32)
                })
                .collect(),
            ..Default::default()
        }
    }

    fn party_case() -> impl Strategy<Value = (usize, Vec<ReadyCheckStatus>)> {
        (1usize..=8).prop_flat_map(|size| {
            (0..size, prop::collection::vec(any_status(), size))
        })
    }

    proptest! {
        #[test]
        fn self_offset_holds_for_every_party_shape((self_slot, raw) in party_case()) {
            let roster = party_with_self(raw.len(), self_slot);
            let out = correlate(&roster, &statuses(&raw)).expect("pass should succeed");

            prop_assert_eq!(out.len(), raw.len());
            prop_assert_eq!(out[0].name.clone(), format!("slot{self_slot}"));
            prop_assert_eq!(out[0].ready_state, raw[0]);
            for entry in &out[1..] {
                let slot: usize = entry.name["slot".len()..].parse().expect("slot number");
                let expected = if slot < self_slot { raw[slot + 1] } else { raw[slot] };
                prop_assert_eq!(entry.ready_state, expected);
                prop_assert_eq!(entry.group_index, 0);
            }
        }

        #[test]
        fn correlation_is_idempotent((self_slot, raw) in party_case()) {
            let roster = party_with_self(raw.len(), self_slot);
            let raw = statuses(&raw);
            let first = correlate(&roster, &raw).expect("pass should succeed");
            let second = correlate(&roster, &raw).expect("pass should succeed");
            prop_assert_eq!(first, second);
        }

        #[test]
        fn identities_are_never_duplicated(
            handles in prop::collection::vec(0x1000u64..0x1008, 0..12),
            status in any_status(),
        ) {
            let mut roster = light_party();
            roster.alliance = (0..8u8)
                .map(|slot| {
                    RosterMember::new(format!("ally{slot}"), 700 + slot as u64, 0x1000 + slot as u32)
                        .at(1 + slot / 4, slot % 4)
                })
                .collect();
            let mut raw = statuses(&[Ready, Ready, Ready]);
            raw.extend(handles.iter().map(|handle| RawStatusEntry::new(*handle, status)));

            let out = correlate(&roster, &raw).expect("pass should succeed");
            let mut identities: Vec<_> = out.iter().map(CorrelatedEntry::identity).collect();
            let total = identities.len();
            identities.sort_unstable();
            identities.dedup();
            prop_assert_eq!(identities.len(), total);
        }
    }
}
