//! Per-interface ordered member lists.

use crate::registry::StreamKey;
use fancast_core::{InterfaceId, Stream};
use std::collections::HashMap;
use std::sync::Arc;

struct Entry {
    key: StreamKey,
    stream: Arc<dyn Stream>,
}

/// The ordered set of streams registered for one interface.
///
/// Lives inside the registry lock, so no synchronization of its own.
/// Order is descending priority with insertion order preserved on ties.
/// Resorting is lazy: a priority change (or an add while any nonzero
/// priority is outstanding) marks the list dirty, and the sort
/// materializes on the next snapshot.
///
/// Members are held strongly: registration keeps the stream alive until
/// it is unregistered, so a registrant keeps receiving dispatches even
/// after its owner dropped every other handle to it.
pub(crate) struct StreamHolder {
    interface: InterfaceId,
    members: Vec<Entry>,
    /// Members with a nonzero priority.
    prioritized: HashMap<StreamKey, i32>,
    needs_sort: bool,
}

impl StreamHolder {
    pub(crate) fn new(interface: InterfaceId) -> Self {
        Self {
            interface,
            members: Vec::new(),
            prioritized: HashMap::new(),
            needs_sort: false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns false when the stream was already present.
    pub(crate) fn add(&mut self, key: StreamKey, stream: Arc<dyn Stream>) -> bool {
        if self.members.iter().any(|entry| entry.key == key) {
            return false;
        }
        self.members.push(Entry { key, stream });
        if !self.prioritized.is_empty() {
            // A prioritized member exists, so the newcomer must be slotted in.
            self.needs_sort = true;
        }
        true
    }

    pub(crate) fn remove(&mut self, key: StreamKey) -> bool {
        self.prioritized.remove(&key);
        let before = self.members.len();
        self.members.retain(|entry| entry.key != key);
        self.members.len() != before
    }

    pub(crate) fn priority_changed(&mut self, key: StreamKey, priority: i32) {
        if !self.members.iter().any(|entry| entry.key == key) {
            return;
        }
        if priority == 0 {
            self.prioritized.remove(&key);
        } else {
            self.prioritized.insert(key, priority);
        }
        self.needs_sort = !self.prioritized.is_empty();
    }

    /// Ordered snapshot of the members.
    pub(crate) fn snapshot(&mut self, debug: bool) -> Vec<Arc<dyn Stream>> {
        self.sort(debug);
        self.members
            .iter()
            .map(|entry| entry.stream.clone())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn needs_sort(&self) -> bool {
        self.needs_sort
    }

    fn sort(&mut self, debug: bool) {
        if !self.needs_sort || self.members.len() <= 1 {
            return;
        }
        let prioritized = &self.prioritized;
        // Vec::sort_by is stable: equal priorities keep insertion order.
        self.members.sort_by(|a, b| {
            let pa = prioritized.get(&a.key).copied().unwrap_or(0);
            let pb = prioritized.get(&b.key).copied().unwrap_or(0);
            pb.cmp(&pa)
        });
        self.needs_sort = false;
        if debug {
            tracing::debug!(interface = %self.interface, size = self.members.len(), "sorted streams");
        }
    }
}
