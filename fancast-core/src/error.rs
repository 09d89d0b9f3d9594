//! Error types for fancast.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`FancastError`] - Top-level error type for all fancast operations
//! - [`RegistryError`] - Registration-shape errors
//! - [`ConnectionError`] - Connection operation errors
//! - [`DispatchError`] - Dispatch-path errors
//!
//! Registry-shape errors abort only the offending call and never corrupt
//! registry state. Failures raised by a stream's own method body surface
//! through the transparent [`DispatchError::Stream`] variant, unwrapped.

use crate::stream::InterfaceId;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all fancast operations.
#[derive(Error, Debug)]
pub enum FancastError {
    /// An error occurred during registration.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// An error occurred in a connection operation.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// An error occurred during dispatch.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Errors raised by registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The stream declared no dispatch interfaces; registration did not
    /// occur.
    #[error("no dispatch interface declared by the stream")]
    NoInterface,
}

/// Errors raised by connection operations.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The stream implements more than one interface, so the operation
    /// needs an explicit interface argument.
    #[error("stream implements {0} interfaces, an explicit interface is required")]
    AmbiguousInterface(usize),

    /// The named interface is not one of the stream's dispatch interfaces.
    #[error("stream does not implement `{0}`")]
    UnknownInterface(InterfaceId),
}

/// Errors surfaced by a dispatch call.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The `Stream` control interface was used as a dispatch target.
    #[error("the stream control interface is not a dispatch target")]
    ControlInterface,

    /// The registered default-stream factory failed to construct an
    /// instance.
    #[error("failed to construct the default stream for `{interface}`")]
    DefaultConstruction {
        /// The interface whose fallback was requested.
        interface: InterfaceId,
        /// The factory's failure.
        #[source]
        source: BoxError,
    },

    /// A stream's own method body failed; propagated unwrapped.
    #[error(transparent)]
    Stream(BoxError),
}
