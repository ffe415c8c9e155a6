//! Event handle registry and dispatcher.
//!
//! The core of hostbridge: a WASM guest registers interest in host UI
//! events (keyboard, mouse, wheel, animation frames) and gets back an
//! integer [`EventHandle`]. When a matching host event fires, the registry
//! translates it into positional numeric arguments and posts them through
//! the guest's callback sink together with the caller-chosen
//! [`CorrelationId`]. A handle stays live until `stop`/`stop_all` removes
//! it.
//!
//! The registry reaches the outside world only through the collaborator
//! traits in [`host`] — element lookup, listener attach/detach, frame
//! scheduling, and callback dispatch — so the whole crate runs unchanged
//! against a browser backend or a scripted test host.

// Integer handle newtypes
pub mod handle;
pub use handle::{CorrelationId, EventHandle};

// Collaborator traits the registry consumes
pub mod host;
pub use host::{EventHandler, EventSink, HostElement, HostEnv, Unsubscribe};

// One live registration
pub mod subscription;
pub use subscription::Subscription;

// The registry itself
pub mod registry;
pub use registry::{EventRegistry, RegistryStats};
