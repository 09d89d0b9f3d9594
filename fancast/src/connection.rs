//! Per-stream connection state.

use crate::registry::{Registry, StreamKey};
use fancast_core::{ConnectionError, InterfaceId, Stream};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Per-(stream, interface) dispatch state.
///
/// Priority and the break flag are atomics rather than lock-guarded so a
/// stream may adjust them from inside its own invocation, while the
/// dispatcher already holds the call lock on the same thread.
pub(crate) struct ConnectionItem {
    interface: InterfaceId,
    priority: AtomicI32,
    break_dispatch: AtomicBool,
    /// Serializes invocations of the owning stream on this interface.
    call_lock: Mutex<()>,
}

impl ConnectionItem {
    fn new(interface: InterfaceId) -> Self {
        Self {
            interface,
            priority: AtomicI32::new(0),
            break_dispatch: AtomicBool::new(false),
            call_lock: Mutex::new(()),
        }
    }

    pub(crate) fn interface(&self) -> InterfaceId {
        self.interface
    }

    pub(crate) fn priority(&self) -> i32 {
        self.priority.load(Ordering::Acquire)
    }

    /// Returns true when the stored priority actually changed.
    pub(crate) fn set_priority(&self, priority: i32) -> bool {
        self.priority.swap(priority, Ordering::AcqRel) != priority
    }

    pub(crate) fn request_break(&self) {
        self.break_dispatch.store(true, Ordering::Release);
    }

    pub(crate) fn break_requested(&self) -> bool {
        self.break_dispatch.load(Ordering::Acquire)
    }

    pub(crate) fn clear_break(&self) {
        self.break_dispatch.store(false, Ordering::Release);
    }

    pub(crate) fn lock_call(&self) -> MutexGuard<'_, ()> {
        self.call_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the break flag on construction and again on drop, so the flag
/// only covers the turn in between and is reset even when the invocation
/// errors out.
pub(crate) struct BreakScope<'a> {
    item: &'a ConnectionItem,
}

impl<'a> BreakScope<'a> {
    pub(crate) fn new(item: &'a ConnectionItem) -> Self {
        item.clear_break();
        Self { item }
    }

    pub(crate) fn requested(&self) -> bool {
        self.item.break_requested()
    }
}

impl Drop for BreakScope<'_> {
    fn drop(&mut self) {
        self.item.clear_break();
    }
}

/// Handle to one live registration, returned by [`Registry::register`].
///
/// Holds one [`ConnectionItem`] per interface the stream declared. The
/// per-interface operations take `Option<InterfaceId>`: `None` is accepted
/// only when the stream declared exactly one interface, otherwise
/// [`ConnectionError::AmbiguousInterface`] is returned.
///
/// A connection kept across re-registration of the same stream turns
/// stale: [`StreamConnection::is_connected`] reports false and stale
/// priority updates are ignored by the registry.
pub struct StreamConnection {
    stream: Arc<dyn Stream>,
    key: StreamKey,
    registry: Weak<Registry>,
    items: HashMap<InterfaceId, Arc<ConnectionItem>>,
}

impl std::fmt::Debug for StreamConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConnection")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl StreamConnection {
    pub(crate) fn new(
        stream: &Arc<dyn Stream>,
        interfaces: &[InterfaceId],
        registry: &Arc<Registry>,
    ) -> Self {
        let items = interfaces
            .iter()
            .map(|&interface| (interface, Arc::new(ConnectionItem::new(interface))))
            .collect();
        Self {
            stream: stream.clone(),
            key: StreamKey::of(stream),
            registry: Arc::downgrade(registry),
            items,
        }
    }

    pub(crate) fn key(&self) -> StreamKey {
        self.key
    }

    pub(crate) fn interfaces(&self) -> impl Iterator<Item = InterfaceId> + '_ {
        self.items.keys().copied()
    }

    pub(crate) fn item(&self, interface: InterfaceId) -> Option<&Arc<ConnectionItem>> {
        self.items.get(&interface)
    }

    /// The stream behind this connection.
    pub fn stream(&self) -> Arc<dyn Stream> {
        self.stream.clone()
    }

    /// Priority of the stream for `interface` (or for its only interface).
    pub fn priority(&self, interface: Option<InterfaceId>) -> Result<i32, ConnectionError> {
        Ok(self.resolve(interface)?.priority())
    }

    /// Set the priority of the stream for `interface` (or for its only
    /// interface). Writing the current value is a no-op; an actual change
    /// marks the interface's member list for resorting, provided this
    /// connection is still current.
    pub fn set_priority(
        &self,
        priority: i32,
        interface: Option<InterfaceId>,
    ) -> Result<(), ConnectionError> {
        let item = self.resolve(interface)?;
        if item.set_priority(priority) {
            if let Some(registry) = self.registry.upgrade() {
                registry.notify_priority_changed(self, item.interface(), priority);
            }
        }
        Ok(())
    }

    /// Stop the in-flight dispatch after this stream's turn.
    ///
    /// Only meaningful while called from inside the stream's own invoked
    /// method; the flag is reset around every turn.
    pub fn break_dispatch(&self, interface: Option<InterfaceId>) -> Result<(), ConnectionError> {
        self.resolve(interface)?.request_break();
        Ok(())
    }

    /// True while the registry's current connection for the stream is this
    /// very instance.
    pub fn is_connected(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        registry.is_current(self)
    }

    fn resolve(
        &self,
        interface: Option<InterfaceId>,
    ) -> Result<&Arc<ConnectionItem>, ConnectionError> {
        match interface {
            Some(interface) => self
                .items
                .get(&interface)
                .ok_or(ConnectionError::UnknownInterface(interface)),
            None => match self.items.values().next() {
                Some(item) if self.items.len() == 1 => Ok(item),
                _ => Err(ConnectionError::AmbiguousInterface(self.items.len())),
            },
        }
    }
}
