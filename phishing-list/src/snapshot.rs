/*!
Baseline of flagged identifiers that each fetch is compared against
*/

use std::collections::{BTreeSet, HashSet};

/// Identifiers currently on the list, in no particular order
pub type FlaggedSet = HashSet<String>;

/// Identifiers that appeared since the last commit, sorted for stable output
pub type NewItems = BTreeSet<String>;

/// The last committed view of the flagged set.
///
/// A fresh snapshot is empty and uninitialized. The first [`Snapshot::commit`]
/// establishes the baseline; later commits replace the items wholesale.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    items: FlaggedSet,
    initialized: bool,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifiers in `current` that are not in the committed items.
    ///
    /// Does not modify the snapshot.
    pub fn diff(&self, current: &FlaggedSet) -> NewItems {
        current
            .iter()
            .filter(|item| !self.items.contains(*item))
            .cloned()
            .collect()
    }

    /// Replace the committed items with `current` and mark the snapshot initialized
    pub fn commit(&mut self, current: FlaggedSet) {
        self.items = current;
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.items.contains(identifier)
    }

    /// Whether `current` holds exactly the committed items
    pub fn matches(&self, current: &FlaggedSet) -> bool {
        self.initialized && self.items == *current
    }

    /// BLAKE3 digest of the committed items, independent of insertion order
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.items)
    }
}

/// BLAKE3 digest of a flagged set, independent of insertion order
pub fn fingerprint(items: &FlaggedSet) -> String {
    let sorted: BTreeSet<&str> = items.iter().map(String::as_str).collect();
    let mut hasher = blake3::Hasher::new();
    for item in sorted {
        hasher.update(item.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}
