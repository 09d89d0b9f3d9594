//! # fancast-core
//!
//! Core contracts for the fancast multicast dispatch library.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! code that only needs to implement or describe dispatch interfaces,
//! without pulling in the full `fancast` registry and dispatcher.
//!
//! # Concepts
//!
//! - [`Stream`] — the registrant contract: an object declaring the dispatch
//!   interfaces it participates in and an `invoke` entry point for them.
//! - [`InterfaceId`] — a stable identity naming a dispatch interface.
//! - [`MethodId`] / [`MethodCall`] — the identity and argument list of one
//!   interface method invocation.
//! - [`Value`] — the dynamic argument/result model.
//! - [`Tag`] — an opaque filter value pairing dispatch proxies with the
//!   streams they are allowed to notify.
//!
//! # Error Types
//!
//! - [`FancastError`] - Top-level error type
//! - [`RegistryError`] - Registration-shape errors
//! - [`ConnectionError`] - Connection operation errors
//! - [`DispatchError`] - Dispatch-path errors

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod call;
mod error;
mod stream;
mod tag;

// Re-exports
pub use call::{MethodCall, MethodId, ReturnKind, Value};
pub use error::{BoxError, ConnectionError, DispatchError, FancastError, RegistryError};
pub use stream::{InterfaceId, Stream};
pub use tag::Tag;
