//! Blocking-query watch engine.
//!
//! A [`Watcher`] long-polls one resource, detects index movement and turns
//! every change into callbacks. List resources (catalog services, KV
//! prefixes) are diffed against a [`WatchedSnapshot`] into ordered
//! [`WatchEvent`]s; single keys are compared as whole values.
mod snapshot;
mod watcher;
pub use snapshot::*;
pub use watcher::*;


use crate::CatalogService;
use crate::KVPair;

/// Entry of a watched list: an identity key plus a per-entry version.
pub trait Watchable {
    fn identity(&self) -> &str;

    fn modify_index(&self) -> u64;
}

impl Watchable for CatalogService {
    fn identity(&self) -> &str {
        &self.service_id
    }

    fn modify_index(&self) -> u64 {
        self.modify_index
    }
}

impl Watchable for KVPair {
    fn identity(&self) -> &str {
        &self.key
    }

    fn modify_index(&self) -> u64 {
        self.modify_index
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent<T> {
    /// Identity appeared
    Add { id: String, entry: T },
    /// Identity still present with a different modify index
    Change { id: String, entry: T },
    /// Identity vanished; `entry` is its last known value
    Remove { id: String, entry: T },
}

impl<T> WatchEvent<T> {
    pub fn id(&self) -> &str {
        match self {
            WatchEvent::Add { id, .. } | WatchEvent::Change { id, .. } | WatchEvent::Remove { id, .. } => id,
        }
    }

    pub fn entry(&self) -> &T {
        match self {
            WatchEvent::Add { entry, .. } | WatchEvent::Change { entry, .. } | WatchEvent::Remove { entry, .. } => {
                entry
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WatchEvent::Add { .. } => "add",
            WatchEvent::Change { .. } => "change",
            WatchEvent::Remove { .. } => "remove",
        }
    }
}
