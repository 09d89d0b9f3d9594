//! The dispatch proxy: per-proxy configuration and the multicast
//! algorithm.

use crate::connection::{BreakScope, ConnectionItem};
use crate::registry::Registry;
use fancast_core::{DispatchError, InterfaceId, MethodCall, MethodId, ReturnKind, Stream, Tag, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hook invoked before each stream is notified; returning `true` stops the
/// dispatch with no further streams notified.
pub type BeforeDispatch = dyn Fn(&dyn Stream, &MethodId, &[Value]) -> bool + Send + Sync;

/// Hook invoked after each stream returned; receives that stream's result
/// and stops the dispatch when it returns `true`.
pub type AfterDispatch = dyn Fn(&dyn Stream, &MethodId, &[Value], Option<&Value>) -> bool + Send + Sync;

/// Folds the ordered results of all visited streams into the final
/// dispatch result.
pub type ResultFilter = dyn Fn(&MethodId, &[Value], &[Option<Value>]) -> Option<Value> + Send + Sync;

/// Correlates the trace events of one dispatch when debug logging is on.
static DISPATCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Configures and builds a [`StreamProxy`].
///
/// Obtained from [`Registry::proxy`]. Proxies targeting the same interface
/// are fully independent of each other: registry state is shared, the
/// configuration here is not.
pub struct ProxyBuilder {
    registry: Arc<Registry>,
    tag: Option<Tag>,
    before: Option<Box<BeforeDispatch>>,
    after: Option<Box<AfterDispatch>>,
    filter: Option<Box<ResultFilter>>,
}

impl ProxyBuilder {
    pub(crate) fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            tag: None,
            before: None,
            after: None,
            filter: None,
        }
    }

    /// Tag pairing this proxy with streams whose [`Stream::tag_for`]
    /// returns the same value. Without a tag, only untagged streams are
    /// notified.
    pub fn tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Hook called before each stream is notified.
    pub fn before_dispatch<F>(mut self, hook: F) -> Self
    where
        F: Fn(&dyn Stream, &MethodId, &[Value]) -> bool + Send + Sync + 'static,
    {
        self.before = Some(Box::new(hook));
        self
    }

    /// Hook called after each stream returned.
    pub fn after_dispatch<F>(mut self, hook: F) -> Self
    where
        F: Fn(&dyn Stream, &MethodId, &[Value], Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.after = Some(Box::new(hook));
        self
    }

    /// Filter folding the collected per-stream results into the dispatch
    /// result. Without a filter the last visited stream's result wins.
    pub fn result_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&MethodId, &[Value], &[Option<Value>]) -> Option<Value> + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Bind the configuration to `interface`.
    pub fn build(self, interface: InterfaceId) -> Result<StreamProxy, DispatchError> {
        if interface.is_control() {
            return Err(DispatchError::ControlInterface);
        }
        Ok(StreamProxy {
            registry: self.registry,
            interface,
            tag: self.tag,
            before: self.before,
            after: self.after,
            filter: self.filter,
        })
    }
}

/// The caller-facing dispatch handle for one interface.
pub struct StreamProxy {
    registry: Arc<Registry>,
    interface: InterfaceId,
    tag: Option<Tag>,
    before: Option<Box<BeforeDispatch>>,
    after: Option<Box<AfterDispatch>>,
    filter: Option<Box<ResultFilter>>,
}

impl std::fmt::Debug for StreamProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamProxy")
            .field("interface", &self.interface)
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

impl StreamProxy {
    /// The interface this proxy dispatches to.
    pub fn interface(&self) -> InterfaceId {
        self.interface
    }

    /// Broadcast `call` to every live, tag-matching stream in priority
    /// order.
    ///
    /// The result is the last visited stream's return value, or the
    /// configured filter's fold of all collected values, coerced per the
    /// method's [`ReturnKind`]. With no registrants the registered default
    /// stream (if any) is invoked directly, bypassing hooks and filter.
    pub fn dispatch(&self, call: &MethodCall) -> Result<Option<Value>, DispatchError> {
        let debug = self.registry.debug_enabled();
        let seq = if debug {
            DISPATCH_SEQ.fetch_add(1, Ordering::Relaxed)
        } else {
            0
        };

        let result = self.run(call, debug, seq)?;

        let result = match call.method.returns {
            ReturnKind::Void => None,
            kind => {
                if debug && result.is_none() && kind.zero_value().is_some() {
                    tracing::debug!(seq, method = %call.method, ?kind, "absent result coerced to zero value");
                }
                result.or_else(|| kind.zero_value())
            }
        };

        if debug {
            tracing::debug!(seq, method = %call.method, ?result, "dispatch finished");
        }
        Ok(result)
    }

    fn run(&self, call: &MethodCall, debug: bool, seq: u64) -> Result<Option<Value>, DispatchError> {
        let streams = self.registry.members_of(self.interface);
        if debug {
            tracing::debug!(
                seq,
                interface = %self.interface,
                method = %call.method,
                tag = ?self.tag,
                count = streams.len(),
                "dispatch started"
            );
        }

        if streams.is_empty() {
            let Some(fallback) = self.registry.defaults().get(self.interface)? else {
                return Ok(None);
            };
            if debug {
                tracing::debug!(seq, interface = %self.interface, "notifying default stream");
            }
            return fallback
                .invoke(self.interface, call)
                .map_err(DispatchError::Stream);
        }

        let collect = self.filter.is_some() && call.method.returns != ReturnKind::Void;
        let mut collected: Vec<Option<Value>> = Vec::new();
        let mut last: Option<Value> = None;

        for (index, stream) in streams.iter().enumerate() {
            // The registry may have changed under the snapshot; stragglers
            // without a current connection are skipped.
            let Some(connection) = self.registry.connection_of(stream) else {
                continue;
            };
            let Some(item) = connection.item(self.interface) else {
                continue;
            };

            if stream.tag_for(self.interface) != self.tag {
                continue;
            }

            if let Some(before) = &self.before {
                if before(stream.as_ref(), &call.method, &call.args) {
                    if debug {
                        tracing::debug!(seq, index, "dispatch stopped by before hook");
                    }
                    break;
                }
            }

            let (result, break_requested) = invoke_one(item, stream, self.interface, call)?;
            if debug {
                tracing::debug!(seq, index, ?result, break_requested, "stream notified");
            }

            last = result.clone();
            if collect {
                collected.push(result);
            }

            if let Some(after) = &self.after {
                if after(stream.as_ref(), &call.method, &call.args, last.as_ref()) {
                    if debug {
                        tracing::debug!(seq, index, "dispatch stopped by after hook");
                    }
                    break;
                }
            }

            if break_requested {
                if debug {
                    tracing::debug!(seq, index, "dispatch stopped by stream");
                }
                break;
            }
        }

        if collect && !collected.is_empty() {
            if let Some(filter) = &self.filter {
                last = filter(&call.method, &call.args, &collected);
                if debug {
                    tracing::debug!(seq, result = ?last, "result filter applied");
                }
            }
        }
        Ok(last)
    }
}

/// One stream's turn: serialized by the item's call lock, with the break
/// flag cleared on both sides of the invocation even when it errors.
fn invoke_one(
    item: &ConnectionItem,
    stream: &Arc<dyn Stream>,
    interface: InterfaceId,
    call: &MethodCall,
) -> Result<(Option<Value>, bool), DispatchError> {
    let _serial = item.lock_call();
    let scope = BreakScope::new(item);
    let result = stream
        .invoke(interface, call)
        .map_err(DispatchError::Stream)?;
    Ok((result, scope.requested()))
}
