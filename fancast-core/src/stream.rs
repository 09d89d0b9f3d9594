//! The registrant contract and interface identities.

use crate::call::{MethodCall, Value};
use crate::error::BoxError;
use crate::tag::Tag;
use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable identity naming a dispatch interface.
///
/// Usually constructed from the trait object type of the interface, e.g.
/// `InterfaceId::of::<dyn Greeter>()`, but any `'static` type works as a
/// marker. Equality and hashing use the underlying [`TypeId`]; the type
/// name is carried for diagnostics only.
#[derive(Copy, Clone)]
pub struct InterfaceId {
    id: TypeId,
    name: &'static str,
}

impl InterfaceId {
    /// Identity of the interface named by the type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Human-readable name of the interface type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True for the [`Stream`] control trait itself, which is never a
    /// dispatch target.
    pub fn is_control(&self) -> bool {
        self.id == TypeId::of::<dyn Stream>()
    }
}

impl PartialEq for InterfaceId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for InterfaceId {}

impl Hash for InterfaceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InterfaceId").field(&self.name).finish()
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A registrant: an object participating in multicast dispatch.
///
/// A stream declares the dispatch interfaces it implements and receives
/// every matching dispatch on those interfaces through [`Stream::invoke`].
/// Identity is by reference (the `Arc` allocation), so the same value
/// registered twice through distinct `Arc`s counts as two streams.
///
/// # Example
///
/// ```rust,ignore
/// struct Speaker;
///
/// impl Stream for Speaker {
///     fn interfaces(&self) -> Vec<InterfaceId> {
///         vec![InterfaceId::of::<dyn Speech>()]
///     }
///
///     fn invoke(&self, _interface: InterfaceId, call: &MethodCall)
///         -> Result<Option<Value>, BoxError>
///     {
///         match call.method.name {
///             "speak" => Ok(Some("hello".into())),
///             _ => Ok(None),
///         }
///     }
/// }
/// ```
pub trait Stream: Send + Sync + 'static {
    /// The dispatch interfaces this stream participates in.
    ///
    /// Registration fails when the set is empty; the control interface is
    /// ignored if listed.
    fn interfaces(&self) -> Vec<InterfaceId>;

    /// Tag compared against the proxy's configured tag when `interface` is
    /// dispatched; the stream is only notified when the two are equal.
    ///
    /// The default of `None` matches proxies configured without a tag.
    fn tag_for(&self, interface: InterfaceId) -> Option<Tag> {
        let _ = interface;
        None
    }

    /// Invoke one interface method on this stream.
    ///
    /// Errors propagate to the dispatch caller untouched and abort the
    /// in-flight dispatch.
    fn invoke(
        &self,
        interface: InterfaceId,
        call: &MethodCall,
    ) -> Result<Option<Value>, BoxError>;
}

impl fmt::Debug for dyn Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}
