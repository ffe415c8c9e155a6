//! The guest-facing registration surface.
//!
//! A module loader constructs one [`UiEventBridge`] per guest instance,
//! passing the function that posts callbacks back into the guest, and
//! wires the bridge's methods into the guest's import table under the
//! exported names below. Element ids arrive here as strings — the
//! loader's memory accessor has already resolved them out of guest
//! linear memory.

use std::rc::Rc;

use wasm_bindgen::prelude::*;

use hostbridge_common::errors::RegistryError;
use hostbridge_events::handle::{CorrelationId, EventHandle};
use hostbridge_events::host::{EventSink, HostEnv};
use hostbridge_events::registry::EventRegistry;

use crate::dom::{BrowserHost, CallbackSink};

fn to_js<T>(result: Result<T, RegistryError>) -> Result<T, JsValue> {
    result.map_err(|err| JsError::new(&err.to_string()).into())
}

/// One guest module's UI event subscriptions.
#[wasm_bindgen]
pub struct UiEventBridge {
    registry: EventRegistry,
}

#[wasm_bindgen]
impl UiEventBridge {
    /// Create a bridge delivering callbacks through `post_event`, which is
    /// called as `postEvent(correlationId, ...numericArgs)` and must throw
    /// when no consumer is registered for the id.
    #[wasm_bindgen(constructor)]
    pub fn new(post_event: js_sys::Function) -> Result<UiEventBridge, JsValue> {
        let host = Rc::new(BrowserHost::new()?) as Rc<dyn HostEnv>;
        let sink = Rc::new(CallbackSink::new(post_event)) as Rc<dyn EventSink>;
        Ok(UiEventBridge {
            registry: EventRegistry::new(host, sink),
        })
    }

    // ---- keyboard ----------------------------------------------------

    #[wasm_bindgen(js_name = registerGlobalKeyUpEvent)]
    pub fn register_global_key_up_event(&self, event_id: u32) -> u32 {
        self.registry
            .register_global_key_up(CorrelationId(event_id))
            .index()
    }

    #[wasm_bindgen(js_name = registerGlobalKeyDownEvent)]
    pub fn register_global_key_down_event(&self, event_id: u32) -> u32 {
        self.registry
            .register_global_key_down(CorrelationId(event_id))
            .index()
    }

    #[wasm_bindgen(js_name = registerLocalKeyUpEvent)]
    pub fn register_local_key_up_event(
        &self,
        event_id: u32,
        element_id: &str,
    ) -> Result<u32, JsValue> {
        to_js(
            self.registry
                .register_local_key_up(CorrelationId(event_id), element_id)
                .map(EventHandle::index),
        )
    }

    #[wasm_bindgen(js_name = registerLocalKeyDownEvent)]
    pub fn register_local_key_down_event(
        &self,
        event_id: u32,
        element_id: &str,
    ) -> Result<u32, JsValue> {
        to_js(
            self.registry
                .register_local_key_down(CorrelationId(event_id), element_id)
                .map(EventHandle::index),
        )
    }

    // ---- animation loop ----------------------------------------------

    #[wasm_bindgen(js_name = registerAnimationLoop)]
    pub fn register_animation_loop(&self, event_id: u32) -> u32 {
        self.registry
            .register_animation_loop(CorrelationId(event_id))
            .index()
    }

    // ---- mouse -------------------------------------------------------

    #[wasm_bindgen(js_name = registerGlobalMouseMoveEvent)]
    pub fn register_global_mouse_move_event(&self, event_id: u32) -> u32 {
        self.registry
            .register_global_mouse_move(CorrelationId(event_id))
            .index()
    }

    #[wasm_bindgen(js_name = registerLocalMouseMoveEvent)]
    pub fn register_local_mouse_move_event(
        &self,
        event_id: u32,
        element_id: &str,
        relative: bool,
    ) -> Result<u32, JsValue> {
        to_js(
            self.registry
                .register_local_mouse_move(CorrelationId(event_id), element_id, relative)
                .map(EventHandle::index),
        )
    }

    #[wasm_bindgen(js_name = registerGlobalMouseDownEvent)]
    pub fn register_global_mouse_down_event(&self, event_id: u32) -> u32 {
        self.registry
            .register_global_mouse_down(CorrelationId(event_id))
            .index()
    }

    #[wasm_bindgen(js_name = registerLocalMouseDownEvent)]
    pub fn register_local_mouse_down_event(
        &self,
        event_id: u32,
        element_id: &str,
        relative: bool,
    ) -> Result<u32, JsValue> {
        to_js(
            self.registry
                .register_local_mouse_down(CorrelationId(event_id), element_id, relative)
                .map(EventHandle::index),
        )
    }

    #[wasm_bindgen(js_name = registerGlobalMouseUpEvent)]
    pub fn register_global_mouse_up_event(&self, event_id: u32) -> u32 {
        self.registry
            .register_global_mouse_up(CorrelationId(event_id))
            .index()
    }

    #[wasm_bindgen(js_name = registerLocalMouseUpEvent)]
    pub fn register_local_mouse_up_event(
        &self,
        event_id: u32,
        element_id: &str,
        relative: bool,
    ) -> Result<u32, JsValue> {
        to_js(
            self.registry
                .register_local_mouse_up(CorrelationId(event_id), element_id, relative)
                .map(EventHandle::index),
        )
    }

    #[wasm_bindgen(js_name = registerGlobalMouseClickEvent)]
    pub fn register_global_mouse_click_event(&self, event_id: u32) -> u32 {
        self.registry
            .register_global_mouse_click(CorrelationId(event_id))
            .index()
    }

    #[wasm_bindgen(js_name = registerLocalMouseClickEvent)]
    pub fn register_local_mouse_click_event(
        &self,
        event_id: u32,
        element_id: &str,
        relative: bool,
    ) -> Result<u32, JsValue> {
        to_js(
            self.registry
                .register_local_mouse_click(CorrelationId(event_id), element_id, relative)
                .map(EventHandle::index),
        )
    }

    #[wasm_bindgen(js_name = registerGlobalMouseDoubleClickEvent)]
    pub fn register_global_mouse_double_click_event(&self, event_id: u32) -> u32 {
        self.registry
            .register_global_mouse_double_click(CorrelationId(event_id))
            .index()
    }

    #[wasm_bindgen(js_name = registerLocalMouseDoubleClickEvent)]
    pub fn register_local_mouse_double_click_event(
        &self,
        event_id: u32,
        element_id: &str,
        relative: bool,
    ) -> Result<u32, JsValue> {
        to_js(
            self.registry
                .register_local_mouse_double_click(CorrelationId(event_id), element_id, relative)
                .map(EventHandle::index),
        )
    }

    // ---- wheel -------------------------------------------------------

    #[wasm_bindgen(js_name = registerGlobalWheelEvent)]
    pub fn register_global_wheel_event(&self, event_id: u32) -> u32 {
        self.registry
            .register_global_wheel(CorrelationId(event_id))
            .index()
    }

    #[wasm_bindgen(js_name = registerLocalWheelEvent)]
    pub fn register_local_wheel_event(
        &self,
        event_id: u32,
        element_id: &str,
    ) -> Result<u32, JsValue> {
        to_js(
            self.registry
                .register_local_wheel(CorrelationId(event_id), element_id)
                .map(EventHandle::index),
        )
    }

    // ---- teardown ----------------------------------------------------

    #[wasm_bindgen(js_name = stopUIEvent)]
    pub fn stop_ui_event(&self, event_handle: u32) -> Result<(), JsValue> {
        to_js(self.registry.stop(EventHandle(event_handle)))
    }

    #[wasm_bindgen(js_name = stopAllUIEvents)]
    pub fn stop_all_ui_events(&self) {
        self.registry.stop_all();
    }

    // ---- element helpers ---------------------------------------------

    #[wasm_bindgen(js_name = setElementText)]
    pub fn set_element_text(&self, element_id: &str, text: &str) -> Result<(), JsValue> {
        to_js(self.registry.set_element_text(element_id, text))
    }

    // ---- introspection -----------------------------------------------

    /// Current registry counts as a JSON string.
    #[wasm_bindgen(js_name = registryStats)]
    pub fn registry_stats(&self) -> String {
        serde_json::to_string(&self.registry.stats()).unwrap_or_else(|_| "{}".to_string())
    }
}
