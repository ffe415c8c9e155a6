//! DOM-backed implementations of the registry's collaborator traits.
//!
//! Listener closures are owned by the unsubscribe thunk the registry
//! stores, so a `wasm_bindgen::Closure` lives exactly as long as its
//! subscription and is dropped after `removeEventListener`.

use std::rc::Rc;

use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use hostbridge_common::errors::DispatchError;
use hostbridge_common::{
    EventFamily, KeyStroke, MouseReport, UiEventKind, UiEventPayload, WheelReport,
};
use hostbridge_events::handle::CorrelationId;
use hostbridge_events::host::{EventHandler, EventSink, HostElement, HostEnv, Unsubscribe};

/// Normalize a raw DOM event into the payload its kind's family carries.
/// Events that fail the downcast (a listener miswired by the browser)
/// produce no payload and therefore no callback.
fn translate(kind: UiEventKind, event: &web_sys::Event) -> Option<UiEventPayload> {
    match kind.family() {
        EventFamily::Keyboard => {
            let event = event.dyn_ref::<web_sys::KeyboardEvent>()?;
            Some(UiEventPayload::Key(KeyStroke {
                key: event.key(),
                composing: event.is_composing(),
            }))
        }
        EventFamily::Mouse => {
            let event = event.dyn_ref::<web_sys::MouseEvent>()?;
            Some(UiEventPayload::Mouse(MouseReport {
                page_x: f64::from(event.page_x()),
                page_y: f64::from(event.page_y()),
                button: event.button(),
            }))
        }
        EventFamily::Wheel => {
            let event = event.dyn_ref::<web_sys::WheelEvent>()?;
            Some(UiEventPayload::Wheel(WheelReport {
                delta_x: event.delta_x(),
                delta_y: event.delta_y(),
                delta_z: event.delta_z(),
                delta_mode: event.delta_mode(),
            }))
        }
    }
}

/// Attach `handler` to `target` for `kind`; the returned thunk detaches it
/// and drops the closure.
fn listen_on(
    target: &web_sys::EventTarget,
    kind: UiEventKind,
    mut handler: EventHandler,
) -> Unsubscribe {
    let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
        if let Some(payload) = translate(kind, &event) {
            handler(&payload);
        }
    }) as Box<dyn FnMut(web_sys::Event)>);

    if let Err(err) =
        target.add_event_listener_with_callback(kind.dom_name(), closure.as_ref().unchecked_ref())
    {
        warn!(kind = kind.dom_name(), ?err, "addEventListener failed");
    }

    let target = target.clone();
    Box::new(move || {
        if let Err(err) = target
            .remove_event_listener_with_callback(kind.dom_name(), closure.as_ref().unchecked_ref())
        {
            warn!(kind = kind.dom_name(), ?err, "removeEventListener failed");
        }
        drop(closure);
    })
}

/// The browser environment: document-scoped listeners, element lookup,
/// and `requestAnimationFrame` scheduling.
pub struct BrowserHost {
    window: web_sys::Window,
    document: web_sys::Document,
}

impl BrowserHost {
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window available"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document available"))?;
        Ok(BrowserHost { window, document })
    }
}

impl HostEnv for BrowserHost {
    fn element_by_id(&self, id: &str) -> Option<Rc<dyn HostElement>> {
        let element = self.document.get_element_by_id(id)?;
        Some(Rc::new(DomElement {
            element,
            window: self.window.clone(),
        }))
    }

    fn listen_root(&self, kind: UiEventKind, handler: EventHandler) -> Unsubscribe {
        listen_on(self.document.as_ref(), kind, handler)
    }

    fn request_frame(&self, callback: Box<dyn FnOnce(f64)>) {
        let closure = Closure::once_into_js(move |timestamp: f64| callback(timestamp));
        if let Err(err) = self.window.request_animation_frame(closure.unchecked_ref()) {
            warn!(?err, "requestAnimationFrame failed");
        }
    }
}

/// One resolved DOM element.
struct DomElement {
    element: web_sys::Element,
    window: web_sys::Window,
}

impl HostElement for DomElement {
    fn listen(&self, kind: UiEventKind, handler: EventHandler) -> Unsubscribe {
        listen_on(self.element.as_ref(), kind, handler)
    }

    fn page_origin(&self) -> (f64, f64) {
        let rect = self.element.get_bounding_client_rect();
        let scroll_x = self.window.scroll_x().unwrap_or(0.0);
        let scroll_y = self.window.scroll_y().unwrap_or(0.0);
        (rect.left() + scroll_x, rect.top() + scroll_y)
    }

    fn set_text(&self, text: &str) {
        self.element.set_text_content(Some(text));
    }
}

/// Delivers callbacks through the module loader's event-posting function.
pub struct CallbackSink {
    post: js_sys::Function,
}

impl CallbackSink {
    pub fn new(post: js_sys::Function) -> Self {
        CallbackSink { post }
    }
}

impl EventSink for CallbackSink {
    fn post_event(&self, correlation: CorrelationId, args: &[f64]) -> Result<(), DispatchError> {
        let call_args = js_sys::Array::new();
        call_args.push(&JsValue::from_f64(f64::from(correlation.value())));
        for &arg in args {
            call_args.push(&JsValue::from_f64(arg));
        }
        self.post
            .apply(&JsValue::NULL, &call_args)
            .map(|_| ())
            .map_err(|err| DispatchError {
                correlation: correlation.value(),
                detail: format!("{err:?}"),
            })
    }
}
