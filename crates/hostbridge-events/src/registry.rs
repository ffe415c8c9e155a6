//! The event handle registry and dispatcher.
//!
//! One [`EventRegistry`] owns the table of live subscriptions for one guest
//! module. Registration binds a host listener (or arms a frame loop) and
//! returns a fresh [`EventHandle`]; every delivered callback carries the
//! subscription's [`CorrelationId`] followed by the family's positional
//! arguments:
//!
//! - keyboard: `(code_point)`
//! - mouse move: `(x, y)`
//! - mouse down/up/click/double-click: `(x, y, button)`
//! - wheel: `(delta_x, delta_y, delta_z, delta_mode)`
//! - animation loop: `(timestamp)`
//!
//! The registry is an explicit object passed by reference — there is no
//! process-wide table. All sharing with listener closures goes through
//! `Rc<RefCell<…>>`; borrows never span a callback invocation, so a
//! callback may re-enter `stop` safely.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, error, trace};

use hostbridge_common::errors::RegistryError;
use hostbridge_common::{KeyCodePointMap, StandardKeyMap, UiEventKind, UiEventPayload};

use crate::handle::{CorrelationId, EventHandle};
use crate::host::{EventHandler, EventSink, HostElement, HostEnv};
use crate::subscription::Subscription;

/// Sparse handle table: absence of a key means "not live", and deleting a
/// key is the only destructor.
struct HandleTable {
    next: u32,
    live: FxHashMap<u32, Subscription>,
    total_registered: u64,
}

impl HandleTable {
    fn new() -> Self {
        HandleTable {
            next: 0,
            live: FxHashMap::default(),
            total_registered: 0,
        }
    }

    fn allocate(&mut self, subscription: Subscription) -> EventHandle {
        let handle = EventHandle(self.next);
        self.next += 1;
        self.total_registered += 1;
        self.live.insert(handle.index(), subscription);
        handle
    }

    fn is_live(&self, handle: EventHandle) -> bool {
        self.live.contains_key(&handle.index())
    }
}

/// Point-in-time counts of the registry's contents.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryStats {
    pub live_handles: usize,
    pub global_listeners: usize,
    pub local_listeners: usize,
    pub frame_loops: usize,
    pub total_registered: u64,
}

/// The event handle registry and dispatcher.
pub struct EventRegistry {
    host: Rc<dyn HostEnv>,
    sink: Rc<dyn EventSink>,
    key_map: Rc<dyn KeyCodePointMap>,
    table: Rc<RefCell<HandleTable>>,
}

impl EventRegistry {
    /// Create a registry bound to `host`, delivering through `sink`, with
    /// the standard key-to-code-point mapping.
    pub fn new(host: Rc<dyn HostEnv>, sink: Rc<dyn EventSink>) -> Self {
        Self::with_key_map(host, sink, Rc::new(StandardKeyMap))
    }

    /// Create a registry with a caller-supplied key mapping.
    pub fn with_key_map(
        host: Rc<dyn HostEnv>,
        sink: Rc<dyn EventSink>,
        key_map: Rc<dyn KeyCodePointMap>,
    ) -> Self {
        EventRegistry {
            host,
            sink,
            key_map,
            table: Rc::new(RefCell::new(HandleTable::new())),
        }
    }

    // ---- keyboard ----------------------------------------------------

    pub fn register_global_key_up(&self, correlation: CorrelationId) -> EventHandle {
        self.register_global(UiEventKind::KeyUp, self.key_handler(correlation))
    }

    pub fn register_global_key_down(&self, correlation: CorrelationId) -> EventHandle {
        self.register_global(UiEventKind::KeyDown, self.key_handler(correlation))
    }

    pub fn register_local_key_up(
        &self,
        correlation: CorrelationId,
        element_id: &str,
    ) -> Result<EventHandle, RegistryError> {
        self.register_local("register_local_key_up", element_id, UiEventKind::KeyUp, |_| {
            self.key_handler(correlation)
        })
    }

    pub fn register_local_key_down(
        &self,
        correlation: CorrelationId,
        element_id: &str,
    ) -> Result<EventHandle, RegistryError> {
        self.register_local(
            "register_local_key_down",
            element_id,
            UiEventKind::KeyDown,
            |_| self.key_handler(correlation),
        )
    }

    // ---- animation loop ----------------------------------------------

    /// Register a recurring per-frame callback. The loop re-arms itself
    /// after every tick for as long as its handle stays in the table;
    /// removing the entry is the sole stop signal.
    pub fn register_animation_loop(&self, correlation: CorrelationId) -> EventHandle {
        let handle = self.table.borrow_mut().allocate(Subscription::FrameLoop);
        debug!(handle = handle.index(), "registered animation loop");
        FrameLoop {
            table: Rc::clone(&self.table),
            host: Rc::clone(&self.host),
            sink: Rc::clone(&self.sink),
            handle,
            correlation,
        }
        .arm();
        handle
    }

    // ---- mouse -------------------------------------------------------

    pub fn register_global_mouse_move(&self, correlation: CorrelationId) -> EventHandle {
        self.register_global(
            UiEventKind::MouseMove,
            self.mouse_handler(correlation, (0.0, 0.0), UiEventKind::MouseMove),
        )
    }

    pub fn register_global_mouse_down(&self, correlation: CorrelationId) -> EventHandle {
        self.register_global(
            UiEventKind::MouseDown,
            self.mouse_handler(correlation, (0.0, 0.0), UiEventKind::MouseDown),
        )
    }

    pub fn register_global_mouse_up(&self, correlation: CorrelationId) -> EventHandle {
        self.register_global(
            UiEventKind::MouseUp,
            self.mouse_handler(correlation, (0.0, 0.0), UiEventKind::MouseUp),
        )
    }

    pub fn register_global_mouse_click(&self, correlation: CorrelationId) -> EventHandle {
        self.register_global(
            UiEventKind::Click,
            self.mouse_handler(correlation, (0.0, 0.0), UiEventKind::Click),
        )
    }

    pub fn register_global_mouse_double_click(&self, correlation: CorrelationId) -> EventHandle {
        self.register_global(
            UiEventKind::DoubleClick,
            self.mouse_handler(correlation, (0.0, 0.0), UiEventKind::DoubleClick),
        )
    }

    pub fn register_local_mouse_move(
        &self,
        correlation: CorrelationId,
        element_id: &str,
        relative: bool,
    ) -> Result<EventHandle, RegistryError> {
        self.register_local_mouse(
            "register_local_mouse_move",
            UiEventKind::MouseMove,
            correlation,
            element_id,
            relative,
        )
    }

    pub fn register_local_mouse_down(
        &self,
        correlation: CorrelationId,
        element_id: &str,
        relative: bool,
    ) -> Result<EventHandle, RegistryError> {
        self.register_local_mouse(
            "register_local_mouse_down",
            UiEventKind::MouseDown,
            correlation,
            element_id,
            relative,
        )
    }

    pub fn register_local_mouse_up(
        &self,
        correlation: CorrelationId,
        element_id: &str,
        relative: bool,
    ) -> Result<EventHandle, RegistryError> {
        self.register_local_mouse(
            "register_local_mouse_up",
            UiEventKind::MouseUp,
            correlation,
            element_id,
            relative,
        )
    }

    pub fn register_local_mouse_click(
        &self,
        correlation: CorrelationId,
        element_id: &str,
        relative: bool,
    ) -> Result<EventHandle, RegistryError> {
        self.register_local_mouse(
            "register_local_mouse_click",
            UiEventKind::Click,
            correlation,
            element_id,
            relative,
        )
    }

    pub fn register_local_mouse_double_click(
        &self,
        correlation: CorrelationId,
        element_id: &str,
        relative: bool,
    ) -> Result<EventHandle, RegistryError> {
        self.register_local_mouse(
            "register_local_mouse_double_click",
            UiEventKind::DoubleClick,
            correlation,
            element_id,
            relative,
        )
    }

    // ---- wheel -------------------------------------------------------

    pub fn register_global_wheel(&self, correlation: CorrelationId) -> EventHandle {
        self.register_global(UiEventKind::Wheel, self.wheel_handler(correlation))
    }

    pub fn register_local_wheel(
        &self,
        correlation: CorrelationId,
        element_id: &str,
    ) -> Result<EventHandle, RegistryError> {
        self.register_local("register_local_wheel", element_id, UiEventKind::Wheel, |_| {
            self.wheel_handler(correlation)
        })
    }

    // ---- teardown ----------------------------------------------------

    /// Stop a live subscription.
    ///
    /// For Global/Local entries the stored unsubscribe thunk runs exactly
    /// once, detaching the host listener; a frame loop needs no host call.
    /// The table entry is removed unconditionally as the final step. After
    /// return, no further callback fires for this handle — except a frame
    /// tick already mid-flight, which completes and then self-cancels on
    /// its next scheduling check.
    pub fn stop(&self, handle: EventHandle) -> Result<(), RegistryError> {
        let unsubscribe = {
            let mut table = self.table.borrow_mut();
            let Some(subscription) = table.live.get_mut(&handle.index()) else {
                return Err(RegistryError::UnknownHandle {
                    handle: handle.index(),
                });
            };
            trace!(
                handle = handle.index(),
                variant = subscription.variant_name(),
                "stopping subscription"
            );
            subscription.take_unsubscribe()
        };
        // The host call runs with no table borrow held, so it may re-enter.
        if let Some(unsubscribe) = unsubscribe {
            unsubscribe();
        }
        self.table.borrow_mut().live.remove(&handle.index());
        debug!(handle = handle.index(), "stopped subscription");
        Ok(())
    }

    /// Stop every live subscription, in unspecified order. Handles that
    /// become not-live mid-iteration are skipped.
    pub fn stop_all(&self) {
        let handles: Vec<u32> = self.table.borrow().live.keys().copied().collect();
        debug!(count = handles.len(), "stopping all subscriptions");
        for handle in handles {
            let _ = self.stop(EventHandle(handle));
        }
    }

    // ---- element helpers ---------------------------------------------

    /// Replace the text content of an identified element.
    pub fn set_element_text(&self, element_id: &str, text: &str) -> Result<(), RegistryError> {
        let element = self.resolve_element("set_element_text", element_id)?;
        element.set_text(text);
        Ok(())
    }

    // ---- introspection -----------------------------------------------

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.table.borrow().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.borrow().live.is_empty()
    }

    /// Point-in-time counts by subscription variant.
    pub fn stats(&self) -> RegistryStats {
        let table = self.table.borrow();
        let mut stats = RegistryStats {
            live_handles: table.live.len(),
            total_registered: table.total_registered,
            ..RegistryStats::default()
        };
        for subscription in table.live.values() {
            match subscription {
                Subscription::Global { .. } => stats.global_listeners += 1,
                Subscription::Local { .. } => stats.local_listeners += 1,
                Subscription::FrameLoop => stats.frame_loops += 1,
            }
        }
        stats
    }

    // ---- internals ---------------------------------------------------

    fn register_global(&self, kind: UiEventKind, handler: EventHandler) -> EventHandle {
        let unsubscribe = self.host.listen_root(kind, handler);
        let handle = self.table.borrow_mut().allocate(Subscription::Global {
            kind,
            unsubscribe: Some(unsubscribe),
        });
        debug!(
            handle = handle.index(),
            kind = kind.dom_name(),
            "registered global listener"
        );
        handle
    }

    /// Resolve, bind, and record a local subscription. The element id is
    /// resolved before any handle is allocated, so a failed registration
    /// leaves the counter untouched.
    fn register_local(
        &self,
        operation: &'static str,
        element_id: &str,
        kind: UiEventKind,
        make_handler: impl FnOnce(&Rc<dyn HostElement>) -> EventHandler,
    ) -> Result<EventHandle, RegistryError> {
        let element = self.resolve_element(operation, element_id)?;
        let handler = make_handler(&element);
        let unsubscribe = element.listen(kind, handler);
        let handle = self.table.borrow_mut().allocate(Subscription::Local {
            element_id: element_id.to_string(),
            kind,
            unsubscribe: Some(unsubscribe),
        });
        debug!(
            handle = handle.index(),
            kind = kind.dom_name(),
            element_id,
            "registered local listener"
        );
        Ok(handle)
    }

    fn register_local_mouse(
        &self,
        operation: &'static str,
        kind: UiEventKind,
        correlation: CorrelationId,
        element_id: &str,
        relative: bool,
    ) -> Result<EventHandle, RegistryError> {
        self.register_local(operation, element_id, kind, |element| {
            // Offset snapshot taken once at subscribe time; not recomputed
            // on scroll or resize.
            let origin = if relative {
                element.page_origin()
            } else {
                (0.0, 0.0)
            };
            self.mouse_handler(correlation, origin, kind)
        })
    }

    fn resolve_element(
        &self,
        operation: &'static str,
        element_id: &str,
    ) -> Result<Rc<dyn HostElement>, RegistryError> {
        self.host.element_by_id(element_id).ok_or_else(|| {
            error!(operation, element_id, "element lookup failed");
            RegistryError::ElementNotFound {
                operation,
                element_id: element_id.to_string(),
            }
        })
    }

    fn key_handler(&self, correlation: CorrelationId) -> EventHandler {
        let sink = Rc::clone(&self.sink);
        let key_map = Rc::clone(&self.key_map);
        Box::new(move |payload| {
            let UiEventPayload::Key(stroke) = payload else {
                return;
            };
            // A stroke with no code point (pure modifier, composition)
            // produces no callback at all.
            if let Some(code_point) = key_map.code_point(stroke) {
                deliver(&sink, correlation, &[f64::from(code_point)]);
            }
        })
    }

    fn mouse_handler(
        &self,
        correlation: CorrelationId,
        origin: (f64, f64),
        kind: UiEventKind,
    ) -> EventHandler {
        let sink = Rc::clone(&self.sink);
        let include_button = kind != UiEventKind::MouseMove;
        Box::new(move |payload| {
            let UiEventPayload::Mouse(report) = payload else {
                return;
            };
            let mut args: SmallVec<[f64; 4]> =
                SmallVec::from_slice(&[report.page_x - origin.0, report.page_y - origin.1]);
            if include_button {
                args.push(f64::from(report.button));
            }
            deliver(&sink, correlation, &args);
        })
    }

    fn wheel_handler(&self, correlation: CorrelationId) -> EventHandler {
        let sink = Rc::clone(&self.sink);
        Box::new(move |payload| {
            let UiEventPayload::Wheel(report) = payload else {
                return;
            };
            deliver(
                &sink,
                correlation,
                &[
                    report.delta_x,
                    report.delta_y,
                    report.delta_z,
                    f64::from(report.delta_mode),
                ],
            );
        })
    }
}

/// A self-rescheduling frame callback. Each tick checks table membership,
/// posts, and re-arms; ticks are strictly sequential, one in flight at a
/// time, in refresh order.
struct FrameLoop {
    table: Rc<RefCell<HandleTable>>,
    host: Rc<dyn HostEnv>,
    sink: Rc<dyn EventSink>,
    handle: EventHandle,
    correlation: CorrelationId,
}

impl FrameLoop {
    fn arm(self) {
        let host = Rc::clone(&self.host);
        host.request_frame(Box::new(move |timestamp| self.tick(timestamp)));
    }

    fn tick(self, timestamp: f64) {
        // The borrow ends before the callback runs, so the callback may
        // re-enter the registry.
        let live = self.table.borrow().is_live(self.handle);
        if !live {
            trace!(handle = self.handle.index(), "animation loop retired");
            return;
        }
        deliver(&self.sink, self.correlation, &[timestamp]);
        self.arm();
    }
}

/// Post one callback through the sink. A dispatch failure means the guest
/// lost track of a correlation id it registered — a programming error, so
/// the delivery path fails loudly.
fn deliver(sink: &Rc<dyn EventSink>, correlation: CorrelationId, args: &[f64]) {
    if let Err(err) = sink.post_event(correlation, args) {
        error!(correlation = correlation.value(), %err, "event dispatch failed");
        panic!("event dispatch failed: {err}");
    }
}
