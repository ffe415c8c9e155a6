//! Common types for the hostbridge UI event bridge.
//!
//! This crate provides the leaf types shared by the registry core and the
//! browser backend:
//! - UI event kinds and their DOM names (`UiEventKind`, `EventFamily`)
//! - Normalized event payloads (`KeyStroke`, `MouseReport`, `WheelReport`)
//! - Key-to-code-point mapping (`KeyCodePointMap`, `StandardKeyMap`)
//! - The error taxonomy (`RegistryError`, `DispatchError`)

// Event kinds and normalized payloads
pub mod events;
pub use events::{EventFamily, KeyStroke, MouseReport, UiEventKind, UiEventPayload, WheelReport};

// Key-to-code-point mapping
pub mod keymap;
pub use keymap::{KeyCodePointMap, StandardKeyMap};

// Errors for registration, cancellation and dispatch
pub mod errors;
pub use errors::{DispatchError, RegistryError};
