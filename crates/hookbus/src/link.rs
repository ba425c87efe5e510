//! Link table — ordered outbound federation relationships.
//!
//! Appending is the only way in; removal matches by instance identity and
//! takes every entry for that target. No uniqueness constraint: linking the
//! same target twice yields two entries, both consulted at resolution time.

use parking_lot::RwLock;

use crate::emitter::Emitter;

/// One outbound link.
#[derive(Clone)]
pub(crate) struct LinkEntry {
    /// The linked instance whose listeners are pulled into chains.
    pub(crate) target: Emitter,
    /// Prefix prepended to the event name when reading the target's
    /// registry.
    pub(crate) prefix: Option<String>,
}

/// Ordered list of outbound links.
pub(crate) struct LinkTable {
    links: RwLock<Vec<LinkEntry>>,
}

impl LinkTable {
    pub(crate) fn new() -> Self {
        Self {
            links: RwLock::new(Vec::new()),
        }
    }

    /// Appends a link.
    pub(crate) fn add(&self, target: Emitter, prefix: Option<String>) {
        self.links.write().push(LinkEntry { target, prefix });
    }

    /// Removes every link whose target is the given instance. No-op if none
    /// match.
    pub(crate) fn remove_all(&self, target: &Emitter) {
        self.links
            .write()
            .retain(|entry| !entry.target.same_instance(target));
    }

    /// Returns a copy of the links in insertion order.
    pub(crate) fn snapshot(&self) -> Vec<LinkEntry> {
        self.links.read().clone()
    }
}
