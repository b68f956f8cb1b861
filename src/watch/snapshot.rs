use std::collections::HashMap;
use std::collections::HashSet;

use super::WatchEvent;
use super::Watchable;
use crate::ResourceIndex;

#[derive(Debug, Clone)]
struct SnapshotEntry<T> {
    entry: T,
    modify_index: u64,
    last_seen_at: ResourceIndex,
}

/// Last known state of a watched list, keyed by identity.
///
/// Keys keep their insertion order so removals come out deterministically.
#[derive(Debug, Clone)]
pub struct WatchedSnapshot<T> {
    entries: HashMap<String, SnapshotEntry<T>>,
    order: Vec<String>,
}

impl<T> Default for WatchedSnapshot<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T: Watchable + Clone> WatchedSnapshot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(
        &self,
        id: &str,
    ) -> Option<&T> {
        self.entries.get(id).map(|e| &e.entry)
    }

    /// Index of the last read that contained `id`
    pub fn last_seen_at(
        &self,
        id: &str,
    ) -> Option<ResourceIndex> {
        self.entries.get(id).map(|e| e.last_seen_at)
    }

    /// Identities in insertion order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Folds a fresh read taken at `at` into the snapshot and returns what
    /// changed.
    ///
    /// Adds and changes come first, in `current` order; removals follow in
    /// snapshot insertion order. Each identity yields at most one event; a
    /// repeated identity inside `current` is ignored after its first
    /// occurrence. Entries with an unchanged modify index are not reported
    /// even if other fields differ.
    pub fn diff(
        &mut self,
        current: Vec<T>,
        at: ResourceIndex,
    ) -> Vec<WatchEvent<T>> {
        let mut events = Vec::new();
        let mut seen = HashSet::with_capacity(current.len());

        for entry in current {
            let id = entry.identity().to_string();
            if !seen.insert(id.clone()) {
                continue;
            }
            let modify_index = entry.modify_index();

            match self.entries.get_mut(&id) {
                Some(known) => {
                    if known.modify_index != modify_index {
                        known.entry = entry.clone();
                        known.modify_index = modify_index;
                        events.push(WatchEvent::Change { id, entry });
                    }
                    known.last_seen_at = at;
                }
                None => {
                    self.order.push(id.clone());
                    self.entries.insert(
                        id.clone(),
                        SnapshotEntry {
                            entry: entry.clone(),
                            modify_index,
                            last_seen_at: at,
                        },
                    );
                    events.push(WatchEvent::Add { id, entry });
                }
            }
        }

        let mut stale = Vec::new();
        self.order.retain(|id| {
            if seen.contains(id) {
                true
            } else {
                stale.push(id.clone());
                false
            }
        });
        for id in stale {
            if let Some(known) = self.entries.remove(&id) {
                events.push(WatchEvent::Remove { id, entry: known.entry });
            }
        }

        events
    }
}
