//! Browser backend for the hostbridge UI event bridge.
//!
//! Implements the registry's collaborator traits over the DOM via
//! `web-sys` ([`BrowserHost`], [`CallbackSink`]) and exposes the
//! registration surface a guest module imports ([`UiEventBridge`]).

use wasm_bindgen::prelude::*;

// Set panic hook so a Rust panic surfaces in the browser console instead
// of silently killing the worker.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_init() {
    console_error_panic_hook::set_once();
}

// DOM-backed host environment and callback sink
pub mod dom;
pub use dom::{BrowserHost, CallbackSink};

// Guest-facing wasm-bindgen surface
pub mod api;
pub use api::UiEventBridge;
