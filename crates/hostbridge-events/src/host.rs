//! Collaborator traits the registry consumes.
//!
//! Everything the registry needs from its surroundings passes through these
//! seams: element lookup, listener attach/detach, frame scheduling, and
//! callback dispatch. The browser backend implements them over the DOM; the
//! test suite implements them over scripted state.

use std::rc::Rc;

use hostbridge_common::errors::DispatchError;
use hostbridge_common::{UiEventKind, UiEventPayload};

use crate::handle::CorrelationId;

/// Thunk that removes a previously attached host listener. Runs at most
/// once; the registry guarantees it is invoked exactly once per live
/// Global/Local handle, on explicit stop.
pub type Unsubscribe = Box<dyn FnOnce()>;

/// Handler the host invokes with a normalized payload when a subscribed
/// event fires.
pub type EventHandler = Box<dyn FnMut(&UiEventPayload)>;

/// The UI environment a registry is bound to.
pub trait HostEnv {
    /// Resolve an element id. Absent when no element matches.
    fn element_by_id(&self, id: &str) -> Option<Rc<dyn HostElement>>;

    /// Attach a listener at the document/root scope.
    fn listen_root(&self, kind: UiEventKind, handler: EventHandler) -> Unsubscribe;

    /// Run `callback` once on the next display refresh, with the tick
    /// timestamp in milliseconds.
    fn request_frame(&self, callback: Box<dyn FnOnce(f64)>);
}

/// One resolved UI element.
pub trait HostElement {
    /// Attach a listener scoped to this element.
    fn listen(&self, kind: UiEventKind, handler: EventHandler) -> Unsubscribe;

    /// Top-left corner of the element in page coordinates (bounding box
    /// plus current scroll position).
    fn page_origin(&self) -> (f64, f64);

    /// Replace the element's text content.
    fn set_text(&self, text: &str);
}

/// Delivery channel back into the guest.
pub trait EventSink {
    /// Post one callback: the subscription's correlation id followed by the
    /// translated positional arguments. Fails when no consumer is
    /// registered for `correlation` — a caller/registry desynchronization.
    fn post_event(&self, correlation: CorrelationId, args: &[f64]) -> Result<(), DispatchError>;
}
