//! Errors for registration, cancellation and dispatch.
//!
//! Registration and stop failures surface synchronously to the caller as
//! [`RegistryError`]. [`DispatchError`] is different in kind: it is raised
//! by the callback sink when a delivery has no registered consumer, which
//! indicates a caller/registry desynchronization rather than bad input.

use std::fmt;

/// Error returned by registration and stop operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A local registration (or text update) named an element id with no
    /// matching element.
    ElementNotFound {
        /// The operation that performed the lookup, for the message.
        operation: &'static str,
        element_id: String,
    },
    /// `stop` was called with a handle that is not live: never issued, or
    /// already stopped.
    UnknownHandle { handle: u32 },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::ElementNotFound {
                operation,
                element_id,
            } => {
                write!(f, "{operation} was given an invalid element id ({element_id})")
            }
            RegistryError::UnknownHandle { handle } => {
                write!(f, "stop was given an unknown event handle ({handle})")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Error raised when a callback is posted for a correlation id with no
/// registered consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchError {
    pub correlation: u32,
    pub detail: String,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no consumer registered for event callback {}: {}",
            self.correlation, self.detail
        )
    }
}

impl std::error::Error for DispatchError {}
