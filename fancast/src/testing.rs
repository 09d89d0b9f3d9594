//! Testing utilities for fancast.
//!
//! Instrumented [`Stream`] implementations for exercising registries and
//! dispatch setups:
//!
//! - [`RecordingStream`]: records every invocation, answers with a canned
//!   reply
//! - [`FnStream`]: delegates invocations to a closure
//! - [`FailingStream`]: fails every invocation

use fancast_core::{BoxError, InterfaceId, MethodCall, Stream, Tag, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// A stream that records every invocation and answers with a canned reply.
///
/// # Example
///
/// ```rust,ignore
/// let stream = Arc::new(
///     RecordingStream::new(vec![speech()]).with_reply("hello"),
/// );
/// registry.register(stream.clone())?;
///
/// proxy.dispatch(&call)?;
/// assert_eq!(stream.count(), 1);
/// ```
pub struct RecordingStream {
    interfaces: Vec<InterfaceId>,
    tag: Option<Tag>,
    reply: Option<Value>,
    calls: Mutex<Vec<MethodCall>>,
    count: AtomicUsize,
}

impl RecordingStream {
    /// A stream participating in `interfaces`, untagged, replying with
    /// nothing.
    pub fn new(interfaces: Vec<InterfaceId>) -> Self {
        Self {
            interfaces,
            tag: None,
            reply: None,
            calls: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
        }
    }

    /// Report `tag` for every interface.
    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Return `reply` from every invocation.
    pub fn with_reply(mut self, reply: impl Into<Value>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Recorded calls, in invocation order.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of invocations received.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Stream for RecordingStream {
    fn interfaces(&self) -> Vec<InterfaceId> {
        self.interfaces.clone()
    }

    fn tag_for(&self, _interface: InterfaceId) -> Option<Tag> {
        self.tag.clone()
    }

    fn invoke(
        &self,
        _interface: InterfaceId,
        call: &MethodCall,
    ) -> Result<Option<Value>, BoxError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.clone());
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// A stream delegating invocations to a closure.
///
/// Handy for streams that need to call back into the registry from inside
/// their own turn (break-dispatch, self-unregistration, priority changes).
pub struct FnStream<F> {
    interfaces: Vec<InterfaceId>,
    tag: Option<Tag>,
    body: F,
}

impl<F> FnStream<F>
where
    F: Fn(InterfaceId, &MethodCall) -> Result<Option<Value>, BoxError> + Send + Sync + 'static,
{
    /// A stream participating in `interfaces` whose invocations run
    /// `body`.
    pub fn new(interfaces: Vec<InterfaceId>, body: F) -> Self {
        Self {
            interfaces,
            tag: None,
            body,
        }
    }

    /// Report `tag` for every interface.
    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

impl<F> Stream for FnStream<F>
where
    F: Fn(InterfaceId, &MethodCall) -> Result<Option<Value>, BoxError> + Send + Sync + 'static,
{
    fn interfaces(&self) -> Vec<InterfaceId> {
        self.interfaces.clone()
    }

    fn tag_for(&self, _interface: InterfaceId) -> Option<Tag> {
        self.tag.clone()
    }

    fn invoke(&self, interface: InterfaceId, call: &MethodCall) -> Result<Option<Value>, BoxError> {
        (self.body)(interface, call)
    }
}

/// A stream that fails every invocation with the given message.
pub struct FailingStream {
    interfaces: Vec<InterfaceId>,
    message: &'static str,
}

impl FailingStream {
    /// A stream participating in `interfaces` that always fails.
    pub fn new(interfaces: Vec<InterfaceId>, message: &'static str) -> Self {
        Self {
            interfaces,
            message,
        }
    }
}

impl Stream for FailingStream {
    fn interfaces(&self) -> Vec<InterfaceId> {
        self.interfaces.clone()
    }

    fn invoke(
        &self,
        _interface: InterfaceId,
        _call: &MethodCall,
    ) -> Result<Option<Value>, BoxError> {
        Err(self.message.into())
    }
}
