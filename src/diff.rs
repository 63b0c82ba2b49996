use serde::Serialize;
use std::collections::BTreeSet;

use crate::types::PortEntry;

/// Added/removed entries between two port lists of one host.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PortDiff {
    pub added: Vec<PortEntry>,
    pub removed: Vec<PortEntry>,
}

impl PortDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Set difference of two port lists.
///
/// Duplicates collapse and input order is irrelevant. Both result lists are
/// sorted so output is reproducible.
pub fn diff_ports(old: &[PortEntry], new: &[PortEntry]) -> PortDiff {
    let old_set: BTreeSet<&PortEntry> = old.iter().collect();
    let new_set: BTreeSet<&PortEntry> = new.iter().collect();

    PortDiff {
        added: new_set.difference(&old_set).map(|e| (*e).clone()).collect(),
        removed: old_set.difference(&new_set).map(|e| (*e).clone()).collect(),
    }
}
