//! # fancast - In-Process Multicast Interface Dispatcher
//!
//! Callers invoke a method through a [`StreamProxy`] bound to an interface
//! identity; the call is broadcast to every live [`Stream`] registered for
//! that interface, in priority order, with tag filtering, before/after
//! interception hooks, break-dispatch early termination, result
//! aggregation, and a weakly cached default-stream fallback when no
//! registrants exist.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fancast::{InterfaceId, MethodCall, MethodId, Registry, ReturnKind};
//!
//! let registry = Registry::new();
//! let connection = registry.register(my_stream)?;
//!
//! let proxy = registry.proxy().build(InterfaceId::of::<dyn Speech>())?;
//! let result = proxy.dispatch(&MethodCall::new(SPEAK))?;
//!
//! registry.unregister(&my_stream);
//! ```
//!
//! The registry is an explicitly constructed, `Arc`-shared state object:
//! there is no process-wide singleton, and tests get isolation by creating
//! their own registry (or calling [`Registry::reset`]).

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod connection;
mod defaults;
mod holder;
mod proxy;
mod registry;
pub mod testing;

pub use fancast_core::{
    BoxError, ConnectionError, DispatchError, FancastError, InterfaceId, MethodCall, MethodId,
    RegistryError, ReturnKind, Stream, Tag, Value,
};

pub use connection::StreamConnection;
pub use defaults::{DefaultStreamCache, DefaultStreamFactory};
pub use proxy::{AfterDispatch, BeforeDispatch, ProxyBuilder, ResultFilter, StreamProxy};
pub use registry::Registry;
