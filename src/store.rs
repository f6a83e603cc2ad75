use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::correlation::CorrelatedEntry;

/// Latest published correlation result.
///
/// Writers build the whole list first and publish it with a single pointer
/// swap, so readers on other threads see either the previous list or the new
/// one and never a list under construction.
#[derive(Debug, Default)]
pub struct ResultStore {
    current: ArcSwapOption<Vec<CorrelatedEntry>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, entries: Vec<CorrelatedEntry>) {
        self.current.store(Some(Arc::new(entries)));
    }

    /// Owned copy of the latest list, `None` if nothing is published.
    pub fn get(&self) -> Option<Vec<CorrelatedEntry>> {
        self.snapshot().map(|entries| entries.as_ref().clone())
    }

    /// Shared immutable view of the latest list.
    pub fn snapshot(&self) -> Option<Arc<Vec<CorrelatedEntry>>> {
        self.current.load_full()
    }

    pub fn clear(&self) {
        self.current.store(None);
    }
}
