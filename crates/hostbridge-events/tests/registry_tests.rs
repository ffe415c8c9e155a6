//! Integration tests for the event handle registry.
//!
//! These tests drive the registry end to end against a scripted mock host
//! and a recording sink:
//! - registering subscriptions of every family
//! - firing synthetic root/element events and frame ticks
//! - stopping handles and observing that deliveries cease

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use hostbridge_common::errors::{DispatchError, RegistryError};
use hostbridge_common::{KeyStroke, MouseReport, UiEventKind, UiEventPayload, WheelReport};
use hostbridge_events::handle::CorrelationId;
use hostbridge_events::host::{EventHandler, EventSink, HostElement, HostEnv, Unsubscribe};
use hostbridge_events::registry::EventRegistry;

/// One attached listener. The handler lives behind an `Rc<RefCell<Option>>`
/// so the unsubscribe thunk can tombstone it.
struct ListenerSlot {
    kind: UiEventKind,
    handler: Rc<RefCell<Option<EventHandler>>>,
}

fn attach(
    slots: &RefCell<Vec<ListenerSlot>>,
    removed: &Rc<Cell<usize>>,
    kind: UiEventKind,
    handler: EventHandler,
) -> Unsubscribe {
    let cell = Rc::new(RefCell::new(Some(handler)));
    slots.borrow_mut().push(ListenerSlot {
        kind,
        handler: Rc::clone(&cell),
    });
    let removed = Rc::clone(removed);
    Box::new(move || {
        if cell.borrow_mut().take().is_some() {
            removed.set(removed.get() + 1);
        }
    })
}

fn fire(slots: &RefCell<Vec<ListenerSlot>>, kind: UiEventKind, payload: &UiEventPayload) {
    // Collect the live handlers first so a handler may attach/detach
    // without a borrow panic.
    let handlers: Vec<Rc<RefCell<Option<EventHandler>>>> = slots
        .borrow()
        .iter()
        .filter(|slot| slot.kind == kind)
        .map(|slot| Rc::clone(&slot.handler))
        .collect();
    for handler in handlers {
        if let Some(handler) = handler.borrow_mut().as_mut() {
            handler(payload);
        }
    }
}

/// A scripted stand-in for one DOM element.
struct MockElement {
    origin: Cell<(f64, f64)>,
    text: RefCell<String>,
    listeners: RefCell<Vec<ListenerSlot>>,
    removed: Rc<Cell<usize>>,
}

impl MockElement {
    fn new(origin: (f64, f64), removed: &Rc<Cell<usize>>) -> Rc<Self> {
        Rc::new(MockElement {
            origin: Cell::new(origin),
            text: RefCell::new(String::new()),
            listeners: RefCell::new(Vec::new()),
            removed: Rc::clone(removed),
        })
    }

    fn fire(&self, kind: UiEventKind, payload: &UiEventPayload) {
        fire(&self.listeners, kind, payload);
    }
}

impl HostElement for MockElement {
    fn listen(&self, kind: UiEventKind, handler: EventHandler) -> Unsubscribe {
        attach(&self.listeners, &self.removed, kind, handler)
    }

    fn page_origin(&self) -> (f64, f64) {
        self.origin.get()
    }

    fn set_text(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
    }
}

/// A scripted stand-in for the browser environment: root listeners, a
/// frame queue drained by `tick`, and a set of known elements.
struct MockHost {
    root_listeners: RefCell<Vec<ListenerSlot>>,
    frame_queue: RefCell<Vec<Box<dyn FnOnce(f64)>>>,
    elements: RefCell<HashMap<String, Rc<MockElement>>>,
    removed_listeners: Rc<Cell<usize>>,
}

impl MockHost {
    fn new() -> Rc<Self> {
        Rc::new(MockHost {
            root_listeners: RefCell::new(Vec::new()),
            frame_queue: RefCell::new(Vec::new()),
            elements: RefCell::new(HashMap::new()),
            removed_listeners: Rc::new(Cell::new(0)),
        })
    }

    fn add_element(&self, id: &str, origin: (f64, f64)) -> Rc<MockElement> {
        let element = MockElement::new(origin, &self.removed_listeners);
        self.elements
            .borrow_mut()
            .insert(id.to_string(), Rc::clone(&element));
        element
    }

    fn fire_root(&self, kind: UiEventKind, payload: &UiEventPayload) {
        fire(&self.root_listeners, kind, payload);
    }

    /// Deliver one display refresh: drain the queued frame callbacks. A
    /// callback that re-arms lands in the queue for the *next* tick.
    fn tick(&self, timestamp: f64) {
        let queued = self.frame_queue.replace(Vec::new());
        for callback in queued {
            callback(timestamp);
        }
    }

    fn removed_listener_count(&self) -> usize {
        self.removed_listeners.get()
    }
}

impl HostEnv for MockHost {
    fn element_by_id(&self, id: &str) -> Option<Rc<dyn HostElement>> {
        self.elements
            .borrow()
            .get(id)
            .map(|element| Rc::clone(element) as Rc<dyn HostElement>)
    }

    fn listen_root(&self, kind: UiEventKind, handler: EventHandler) -> Unsubscribe {
        attach(&self.root_listeners, &self.removed_listeners, kind, handler)
    }

    fn request_frame(&self, callback: Box<dyn FnOnce(f64)>) {
        self.frame_queue.borrow_mut().push(callback);
    }
}

/// Records every post: `(correlation, args)`.
#[derive(Default)]
struct RecordingSink {
    posts: RefCell<Vec<(u32, Vec<f64>)>>,
}

impl RecordingSink {
    fn new() -> Rc<Self> {
        Rc::new(RecordingSink::default())
    }

    fn posts(&self) -> Vec<(u32, Vec<f64>)> {
        self.posts.borrow().clone()
    }
}

impl EventSink for RecordingSink {
    fn post_event(&self, correlation: CorrelationId, args: &[f64]) -> Result<(), DispatchError> {
        self.posts
            .borrow_mut()
            .push((correlation.value(), args.to_vec()));
        Ok(())
    }
}

/// Always reports a missing consumer.
struct FailingSink;

impl EventSink for FailingSink {
    fn post_event(&self, correlation: CorrelationId, _args: &[f64]) -> Result<(), DispatchError> {
        Err(DispatchError {
            correlation: correlation.value(),
            detail: "no consumer registered".to_string(),
        })
    }
}

fn setup() -> (Rc<MockHost>, Rc<RecordingSink>, EventRegistry) {
    let host = MockHost::new();
    let sink = RecordingSink::new();
    let registry = EventRegistry::new(
        Rc::clone(&host) as Rc<dyn HostEnv>,
        Rc::clone(&sink) as Rc<dyn EventSink>,
    );
    (host, sink, registry)
}

fn key_event(key: &str) -> UiEventPayload {
    UiEventPayload::Key(KeyStroke::new(key))
}

fn mouse_event(page_x: f64, page_y: f64, button: i16) -> UiEventPayload {
    UiEventPayload::Mouse(MouseReport {
        page_x,
        page_y,
        button,
    })
}

fn wheel_event(delta_x: f64, delta_y: f64, delta_z: f64, delta_mode: u32) -> UiEventPayload {
    UiEventPayload::Wheel(WheelReport {
        delta_x,
        delta_y,
        delta_z,
        delta_mode,
    })
}

#[test]
fn test_handles_are_unique_across_register_and_stop() {
    let (host, _sink, registry) = setup();
    host.add_element("panel", (0.0, 0.0));

    let mut handles = vec![
        registry.register_global_key_down(CorrelationId(1)),
        registry.register_global_mouse_move(CorrelationId(2)),
        registry.register_animation_loop(CorrelationId(3)),
        registry
            .register_local_wheel(CorrelationId(4), "panel")
            .unwrap(),
    ];
    registry.stop(handles[1]).unwrap();
    handles.push(registry.register_global_mouse_move(CorrelationId(5)));

    let mut indices: Vec<u32> = handles.iter().map(|handle| handle.index()).collect();
    indices.sort_unstable();
    indices.dedup();
    assert_eq!(indices.len(), handles.len(), "handles must never collide");
    assert_eq!(registry.len(), 4);
}

#[test]
fn test_keyboard_event_delivers_code_point() {
    let (host, sink, registry) = setup();
    registry.register_global_key_down(CorrelationId(9));

    host.fire_root(UiEventKind::KeyDown, &key_event("a"));

    assert_eq!(sink.posts(), vec![(9, vec![f64::from(b'a')])]);
}

#[test]
fn test_stop_silences_future_events() {
    let (host, sink, registry) = setup();
    let handle = registry.register_global_key_down(CorrelationId(9));

    host.fire_root(UiEventKind::KeyDown, &key_event("a"));
    registry.stop(handle).unwrap();
    host.fire_root(UiEventKind::KeyDown, &key_event("a"));

    assert_eq!(sink.posts().len(), 1, "no dispatch after stop");
    assert!(registry.is_empty());
}

#[test]
fn test_stop_detaches_the_host_listener_exactly_once() {
    let (host, _sink, registry) = setup();
    let handle = registry.register_global_key_up(CorrelationId(1));

    registry.stop(handle).unwrap();
    assert_eq!(host.removed_listener_count(), 1);

    // A second stop fails and must not detach anything again.
    assert_eq!(
        registry.stop(handle),
        Err(RegistryError::UnknownHandle {
            handle: handle.index()
        })
    );
    assert_eq!(host.removed_listener_count(), 1);
}

#[test]
fn test_stop_unknown_handle_fails() {
    let (_host, _sink, registry) = setup();
    let err = registry
        .stop(hostbridge_events::EventHandle(42))
        .unwrap_err();
    assert_eq!(err, RegistryError::UnknownHandle { handle: 42 });
}

#[test]
fn test_stop_all_empties_the_registry() {
    let (host, sink, registry) = setup();
    host.add_element("panel", (0.0, 0.0));
    let key = registry.register_global_key_down(CorrelationId(1));
    let wheel = registry
        .register_local_wheel(CorrelationId(2), "panel")
        .unwrap();
    registry.register_animation_loop(CorrelationId(3));

    registry.stop_all();

    assert!(registry.is_empty());
    // Both listener-backed subscriptions were detached from the host.
    assert_eq!(host.removed_listener_count(), 2);
    // Every previously-live handle is now unknown.
    for handle in [key, wheel] {
        assert!(matches!(
            registry.stop(handle),
            Err(RegistryError::UnknownHandle { .. })
        ));
    }
    host.fire_root(UiEventKind::KeyDown, &key_event("a"));
    host.tick(16.0);
    assert!(sink.posts().is_empty());
}

#[test]
fn test_stop_all_tolerates_already_stopped_handles() {
    let (_host, _sink, registry) = setup();
    let a = registry.register_global_key_down(CorrelationId(1));
    registry.register_global_key_up(CorrelationId(2));
    registry.stop(a).unwrap();

    registry.stop_all();
    assert!(registry.is_empty());
}

#[test]
fn test_local_registration_with_unknown_element_fails() {
    let (_host, _sink, registry) = setup();
    let err = registry
        .register_local_key_down(CorrelationId(1), "nope")
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::ElementNotFound {
            operation: "register_local_key_down",
            element_id: "nope".to_string(),
        }
    );
    assert!(registry.is_empty());
}

#[test]
fn test_failed_registration_leaves_the_handle_counter_untouched() {
    let (host, _sink, registry) = setup();
    host.add_element("panel", (0.0, 0.0));

    let before = registry.register_global_key_down(CorrelationId(1));
    assert!(registry
        .register_local_mouse_move(CorrelationId(2), "nope", false)
        .is_err());
    let after = registry.register_global_key_down(CorrelationId(3));

    assert_eq!(
        after.index(),
        before.index() + 1,
        "a failed registration must not consume a handle"
    );
}

#[test]
fn test_unmappable_key_produces_no_dispatch() {
    let (host, sink, registry) = setup();
    registry.register_global_key_down(CorrelationId(1));

    host.fire_root(UiEventKind::KeyDown, &key_event("Shift"));
    host.fire_root(UiEventKind::KeyDown, &key_event("F5"));

    assert!(sink.posts().is_empty(), "modifier keys are silently dropped");
}

#[test]
fn test_local_key_event_fires_on_the_element_only() {
    let (host, sink, registry) = setup();
    let element = host.add_element("input", (0.0, 0.0));
    registry
        .register_local_key_up(CorrelationId(7), "input")
        .unwrap();

    // A root event must not reach an element-scoped listener.
    host.fire_root(UiEventKind::KeyUp, &key_event("x"));
    assert!(sink.posts().is_empty());

    element.fire(UiEventKind::KeyUp, &key_event("x"));
    assert_eq!(sink.posts(), vec![(7, vec![f64::from(b'x')])]);
}

#[test]
fn test_global_mouse_move_reports_page_coordinates() {
    let (host, sink, registry) = setup();
    registry.register_global_mouse_move(CorrelationId(5));

    host.fire_root(UiEventKind::MouseMove, &mouse_event(120.0, 80.0, 0));

    assert_eq!(sink.posts(), vec![(5, vec![120.0, 80.0])]);
}

#[test]
fn test_relative_mouse_move_translates_into_element_space() {
    let (host, sink, registry) = setup();
    let element = host.add_element("canvas", (10.0, 5.0));
    registry
        .register_local_mouse_move(CorrelationId(5), "canvas", true)
        .unwrap();

    element.fire(UiEventKind::MouseMove, &mouse_event(50.0, 40.0, 0));

    assert_eq!(sink.posts(), vec![(5, vec![40.0, 35.0])]);
}

#[test]
fn test_non_relative_local_mouse_move_keeps_page_coordinates() {
    let (host, sink, registry) = setup();
    let element = host.add_element("canvas", (10.0, 5.0));
    registry
        .register_local_mouse_move(CorrelationId(5), "canvas", false)
        .unwrap();

    element.fire(UiEventKind::MouseMove, &mouse_event(50.0, 40.0, 0));

    assert_eq!(sink.posts(), vec![(5, vec![50.0, 40.0])]);
}

#[test]
fn test_relative_offset_is_a_subscribe_time_snapshot() {
    let (host, sink, registry) = setup();
    let element = host.add_element("canvas", (10.0, 5.0));
    registry
        .register_local_mouse_move(CorrelationId(5), "canvas", true)
        .unwrap();

    // The element moves after subscription; the offset must not follow.
    element.origin.set((100.0, 100.0));
    element.fire(UiEventKind::MouseMove, &mouse_event(50.0, 40.0, 0));

    assert_eq!(sink.posts(), vec![(5, vec![40.0, 35.0])]);
}

#[test]
fn test_mouse_press_events_include_the_button() {
    let (host, sink, registry) = setup();
    registry.register_global_mouse_down(CorrelationId(3));

    host.fire_root(UiEventKind::MouseDown, &mouse_event(15.0, 25.0, 2));

    assert_eq!(sink.posts(), vec![(3, vec![15.0, 25.0, 2.0])]);
}

#[test]
fn test_click_kinds_are_distinct_subscriptions() {
    let (host, sink, registry) = setup();
    registry.register_global_mouse_click(CorrelationId(1));
    registry.register_global_mouse_double_click(CorrelationId(2));

    host.fire_root(UiEventKind::DoubleClick, &mouse_event(1.0, 2.0, 0));

    assert_eq!(sink.posts(), vec![(2, vec![1.0, 2.0, 0.0])]);
}

#[test]
fn test_wheel_deltas_pass_through_unchanged() {
    let (host, sink, registry) = setup();
    registry.register_global_wheel(CorrelationId(8));

    host.fire_root(UiEventKind::Wheel, &wheel_event(1.0, 2.0, 0.0, 0));

    assert_eq!(sink.posts(), vec![(8, vec![1.0, 2.0, 0.0, 0.0])]);
}

#[test]
fn test_frame_loop_fires_every_tick_until_stopped() {
    let (host, sink, registry) = setup();
    let handle = registry.register_animation_loop(CorrelationId(6));

    host.tick(16.0);
    host.tick(33.0);
    host.tick(50.0);
    registry.stop(handle).unwrap();
    host.tick(67.0);

    assert_eq!(
        sink.posts(),
        vec![(6, vec![16.0]), (6, vec![33.0]), (6, vec![50.0])],
        "exactly one post per tick while live, none after stop"
    );
    // Stopping a frame loop detaches no host listener.
    assert_eq!(host.removed_listener_count(), 0);
}

#[test]
fn test_frame_loop_posts_are_strictly_sequential() {
    let (host, sink, registry) = setup();
    registry.register_animation_loop(CorrelationId(1));
    registry.register_animation_loop(CorrelationId(2));

    host.tick(10.0);
    host.tick(20.0);

    let timestamps: Vec<f64> = sink.posts().iter().map(|(_, args)| args[0]).collect();
    assert_eq!(timestamps, vec![10.0, 10.0, 20.0, 20.0]);
}

#[test]
fn test_set_element_text_updates_the_element() {
    let (host, _sink, registry) = setup();
    let element = host.add_element("status", (0.0, 0.0));

    registry.set_element_text("status", "ready").unwrap();
    assert_eq!(*element.text.borrow(), "ready");

    let err = registry.set_element_text("nope", "ready").unwrap_err();
    assert!(matches!(err, RegistryError::ElementNotFound { .. }));
}

#[test]
fn test_stats_count_live_subscriptions_by_variant() {
    let (host, _sink, registry) = setup();
    host.add_element("panel", (0.0, 0.0));
    registry.register_global_key_down(CorrelationId(1));
    registry.register_global_wheel(CorrelationId(2));
    let local = registry
        .register_local_mouse_move(CorrelationId(3), "panel", false)
        .unwrap();
    registry.register_animation_loop(CorrelationId(4));

    let stats = registry.stats();
    assert_eq!(stats.live_handles, 4);
    assert_eq!(stats.global_listeners, 2);
    assert_eq!(stats.local_listeners, 1);
    assert_eq!(stats.frame_loops, 1);
    assert_eq!(stats.total_registered, 4);

    registry.stop(local).unwrap();
    let stats = registry.stats();
    assert_eq!(stats.live_handles, 3);
    assert_eq!(stats.local_listeners, 0);
    assert_eq!(stats.total_registered, 4, "total counts ever registered");
}

#[test]
#[should_panic(expected = "event dispatch failed")]
fn test_dispatch_without_a_consumer_fails_loudly() {
    let host = MockHost::new();
    let registry = EventRegistry::new(
        Rc::clone(&host) as Rc<dyn HostEnv>,
        Rc::new(FailingSink) as Rc<dyn EventSink>,
    );
    registry.register_global_key_down(CorrelationId(1));

    host.fire_root(UiEventKind::KeyDown, &key_event("a"));
}
