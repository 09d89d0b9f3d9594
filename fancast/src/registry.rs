//! The registry manager: the single source of truth for live registrations.

use crate::connection::StreamConnection;
use crate::defaults::DefaultStreamCache;
use crate::holder::StreamHolder;
use crate::proxy::ProxyBuilder;
use fancast_core::{InterfaceId, RegistryError, Stream};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identity key for a registered stream: the address of its allocation.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct StreamKey(usize);

impl StreamKey {
    pub(crate) fn of(stream: &Arc<dyn Stream>) -> Self {
        Self(Arc::as_ptr(stream) as *const () as usize)
    }
}

impl fmt::Debug for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamKey({:#x})", self.0)
    }
}

struct RegistryState {
    holders: HashMap<InterfaceId, StreamHolder>,
    connections: HashMap<StreamKey, Arc<StreamConnection>>,
}

/// The registration table: stream ↔ connection and interface ↔ members.
///
/// All membership mutations run under one internal lock, preserving the
/// bidirectional invariant that a connection exists exactly while its
/// stream appears in at least one interface's member list. Dispatch never
/// holds this lock while a stream's method body runs, so stream code may
/// freely call back into `register`/`unregister`/`set_priority`.
pub struct Registry {
    state: Mutex<RegistryState>,
    defaults: DefaultStreamCache,
    debug: AtomicBool,
}

impl Registry {
    /// Create a fresh registry.
    ///
    /// Shared by `Arc`; connections keep a weak back-reference for
    /// priority notifications.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(RegistryState {
                holders: HashMap::new(),
                connections: HashMap::new(),
            }),
            defaults: DefaultStreamCache::new(),
            debug: AtomicBool::new(false),
        })
    }

    /// Toggle trace logging of register/unregister/dispatch events.
    /// Purely observational; no behavioral effect.
    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Release);
    }

    /// Whether debug trace logging is enabled.
    pub fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::Acquire)
    }

    /// Register `stream` under every dispatch interface it declares.
    ///
    /// Idempotent while the stream stays registered: a second call returns
    /// the existing connection unchanged. Fails with
    /// [`RegistryError::NoInterface`] when the stream declares no dispatch
    /// interfaces (the control interface does not count).
    pub fn register(
        self: &Arc<Self>,
        stream: Arc<dyn Stream>,
    ) -> Result<Arc<StreamConnection>, RegistryError> {
        let key = StreamKey::of(&stream);

        // Query the stream outside the lock; its implementation may call
        // back into the registry.
        let mut interfaces: Vec<InterfaceId> = Vec::new();
        for interface in stream.interfaces() {
            if interface.is_control() || interfaces.contains(&interface) {
                continue;
            }
            interfaces.push(interface);
        }

        let mut state = self.lock_state();
        if let Some(existing) = state.connections.get(&key) {
            return Ok(existing.clone());
        }
        if interfaces.is_empty() {
            return Err(RegistryError::NoInterface);
        }

        for &interface in &interfaces {
            let holder = state
                .holders
                .entry(interface)
                .or_insert_with(|| StreamHolder::new(interface));
            if holder.add(key, stream.clone()) && self.debug_enabled() {
                tracing::debug!(
                    interface = %interface,
                    stream = ?key,
                    size = holder.len(),
                    "stream registered"
                );
            }
        }

        let connection = Arc::new(StreamConnection::new(&stream, &interfaces, self));
        state.connections.insert(key, connection.clone());
        Ok(connection)
    }

    /// Remove `stream` from every interface it was registered under.
    /// No-op when the stream is not currently registered.
    pub fn unregister(&self, stream: &Arc<dyn Stream>) {
        let key = StreamKey::of(stream);
        let mut state = self.lock_state();
        let Some(connection) = state.connections.remove(&key) else {
            return;
        };
        for interface in connection.interfaces() {
            let Some(holder) = state.holders.get_mut(&interface) else {
                continue;
            };
            if holder.remove(key) {
                if self.debug_enabled() {
                    tracing::debug!(
                        interface = %interface,
                        stream = ?key,
                        size = holder.len(),
                        "stream unregistered"
                    );
                }
                if holder.is_empty() {
                    state.holders.remove(&interface);
                }
            }
        }
    }

    /// Current connection for `stream`, if registered.
    pub fn connection_of(&self, stream: &Arc<dyn Stream>) -> Option<Arc<StreamConnection>> {
        self.lock_state()
            .connections
            .get(&StreamKey::of(stream))
            .cloned()
    }

    /// Ordered snapshot of the live streams registered for `interface`.
    /// Triggers the deferred resort when priorities changed since the last
    /// read.
    pub fn members_of(&self, interface: InterfaceId) -> Vec<Arc<dyn Stream>> {
        let debug = self.debug_enabled();
        let mut state = self.lock_state();
        state
            .holders
            .get_mut(&interface)
            .map(|holder| holder.snapshot(debug))
            .unwrap_or_default()
    }

    /// Fallback configuration for interfaces with no live registrants.
    /// Guarded by its own lock, independent of the registration table.
    pub fn defaults(&self) -> &DefaultStreamCache {
        &self.defaults
    }

    /// Start building a dispatch proxy bound to this registry.
    pub fn proxy(self: &Arc<Self>) -> ProxyBuilder {
        ProxyBuilder::new(self.clone())
    }

    /// Drop every registration and default-stream binding.
    ///
    /// Teardown for test isolation; outstanding connections all turn
    /// stale.
    pub fn reset(&self) {
        let mut state = self.lock_state();
        state.connections.clear();
        state.holders.clear();
        drop(state);
        self.defaults.reset();
    }

    pub(crate) fn is_current(&self, connection: &StreamConnection) -> bool {
        is_current(&self.lock_state(), connection)
    }

    /// Apply a priority change, unless `connection` went stale (a late
    /// callback from a handle kept across re-registration).
    pub(crate) fn notify_priority_changed(
        &self,
        connection: &StreamConnection,
        interface: InterfaceId,
        priority: i32,
    ) {
        let mut state = self.lock_state();
        if !is_current(&state, connection) {
            return;
        }
        if let Some(holder) = state.holders.get_mut(&interface) {
            holder.priority_changed(connection.key(), priority);
            if self.debug_enabled() {
                tracing::debug!(
                    interface = %interface,
                    stream = ?connection.key(),
                    priority,
                    "priority changed"
                );
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn holder_needs_sort(&self, interface: InterfaceId) -> bool {
        self.lock_state()
            .holders
            .get(&interface)
            .is_some_and(|holder| holder.needs_sort())
    }
}

fn is_current(state: &RegistryState, connection: &StreamConnection) -> bool {
    state
        .connections
        .get(&connection.key())
        .is_some_and(|current| std::ptr::eq(Arc::as_ptr(current), connection))
}
