use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelatedEntry;

/// Players who had not answered "ready" when a check ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotReadyReport {
    pub names: Vec<String>,
    pub at: DateTime<Utc>,
}

impl NotReadyReport {
    pub fn message(&self, max_listed: usize) -> Option<String> {
        format_not_ready_message(&self.names, max_listed)
    }
}

/// Names of players that answered "not ready" or were not present, in result
/// order.
pub fn project_not_ready(entries: &[CorrelatedEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| entry.ready_state.is_not_ready())
        .map(|entry| entry.name.clone())
        .collect()
}

/// Buckets results by group in ascending group order. Result order is kept
/// inside each bucket.
pub fn group_by_party(entries: &[CorrelatedEntry]) -> Vec<(u8, Vec<CorrelatedEntry>)> {
    let mut groups: BTreeMap<u8, Vec<CorrelatedEntry>> = BTreeMap::new();
    for entry in entries {
        groups
            .entry(entry.group_index)
            .or_default()
            .push(entry.clone());
    }
    groups.into_iter().collect()
}

/// English chat line for a not-ready list, naming at most `max_listed`
/// players.
pub fn format_not_ready_message(names: &[String], max_listed: usize) -> Option<String> {
    let total = names.len();
    if total == 0 {
        return None;
    }
    if max_listed == 0 {
        return Some(if total == 1 {
            "1 player is not ready.".to_owned()
        } else {
            format!("{total} players are not ready.")
        });
    }

    let listed = &names[..total.min(max_listed)];
    let mut parts = listed.to_vec();
    match total - listed.len() {
        0 => {}
        1 => parts.push("1 other".to_owned()),
        others => parts.push(format!("{others} others")),
    }
    let verb = if total == 1 { "is" } else { "are" };
    Some(format!("{} {verb} not ready.", join_series(&parts)))
}

fn join_series(parts: &[String]) -> String {
    match parts {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}
