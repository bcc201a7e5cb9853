//! WebAssembly bindings for CopyLift
//!
//! Compiled into the content script. The extension's JS glue stays thin:
//! it loads the per-site configuration, calls [`init_page`], and wires
//! `chrome.runtime.onMessage` to [`handle_message`]. The background glue
//! uses [`page_hostname`] to validate tab URLs.
//!
//! One engine instance exists per page context; the host runtime
//! dispatches one message at a time, so re-initialization never
//! interleaves.

mod host;
mod probe;

use std::cell::RefCell;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::console;

use cl_core::protocol::{DetectionInfo, Pong, Request, Response, UpdateAck};
use cl_core::restorer::{Disposition, Restorer};
use cl_core::types::{FeatureSet, ListenerKind, MouseButton};
use cl_core::Detector;

use host::PageHost;
use probe::DomProbe;

struct Engine {
    hostname: String,
    detector: Detector,
    restorer: Restorer<PageHost>,
}

thread_local! {
    static ENGINE: RefCell<Option<Engine>> = const { RefCell::new(None) };
}

/// Initialize (or re-initialize) the page engine with the stored
/// per-site state. `features` is a plain JS object or null/undefined for
/// defaults.
///
/// The detection pass runs on first call, strictly before any override
/// is applied; later calls reuse the cached snapshot.
#[wasm_bindgen]
pub fn init_page(enabled: bool, features: JsValue) -> Result<(), JsValue> {
    let features: Option<FeatureSet> = from_js(&features);

    let created = ENGINE.with(|cell| -> Result<bool, JsValue> {
        let mut slot = cell.borrow_mut();
        let created = slot.is_none();

        if created {
            let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
            let document = window
                .document()
                .ok_or_else(|| JsValue::from_str("no document"))?;
            let hostname = window.location().hostname().unwrap_or_default();

            // Detection must complete before the restorer injects
            // anything, or the scan would see our own overrides.
            let mut detector = Detector::new();
            detector.detect(&DomProbe::new(window.clone(), document.clone()));

            let restorer = Restorer::new(PageHost::new(window, document));
            *slot = Some(Engine {
                hostname,
                detector,
                restorer,
            });
        }

        if let Some(engine) = slot.as_mut() {
            engine.restorer.initialize(enabled, features);
        }
        Ok(created)
    })?;

    if created {
        install_visibility_hook();
    }
    Ok(())
}

/// True once [`init_page`] has run in this page context.
#[wasm_bindgen]
pub fn is_initialized() -> bool {
    ENGINE.with(|engine| engine.borrow().is_some())
}

/// Handle a popup/background request. Returns the response object, or
/// `null` for requests that do not apply here (foreign hostname, unknown
/// action, malformed message) — never throws past this boundary.
#[wasm_bindgen]
pub fn handle_message(request: JsValue) -> JsValue {
    let Some(request) = from_js::<Request>(&request) else {
        return JsValue::NULL;
    };

    match request {
        Request::Ping => to_js(&Response::Pong(Pong { pong: true })),

        Request::GetDetectionInfo => ENGINE.with(|engine| {
            let engine = engine.borrow();
            let Some(engine) = engine.as_ref() else {
                return JsValue::NULL;
            };
            to_js(&Response::DetectionInfo(DetectionInfo {
                detection_results: engine.detector.snapshot(),
                is_enabled: engine.restorer.enabled(),
                features: engine.restorer.features(),
            }))
        }),

        Request::ToggleSite {
            hostname,
            enabled,
            features,
        } => ENGINE.with(|engine| {
            let mut engine = engine.borrow_mut();
            if let Some(engine) = engine.as_mut() {
                if engine.hostname == hostname {
                    engine.restorer.initialize(enabled, features);
                }
            }
            JsValue::NULL
        }),

        Request::UpdateFeatures { hostname, features } => ENGINE.with(|engine| {
            let mut engine = engine.borrow_mut();
            let Some(engine) = engine.as_mut() else {
                return JsValue::NULL;
            };
            if engine.hostname != hostname || !engine.restorer.enabled() {
                return JsValue::NULL;
            }
            engine.restorer.initialize(true, Some(features));
            to_js(&Response::UpdateAck(UpdateAck { success: true }))
        }),
    }
}

/// Normalized hostname of a page URL; `None` for non-http(s) schemes.
/// Used by the background glue for badge and injection decisions.
#[wasm_bindgen]
pub fn page_hostname(url: &str) -> Option<String> {
    cl_core::page_hostname(url)
}

// =============================================================================
// Event Dispatch
// =============================================================================

pub(crate) fn dispatch_event(kind: ListenerKind, event: &web_sys::Event) {
    let button = if kind.is_mouse() {
        event
            .dyn_ref::<web_sys::MouseEvent>()
            .and_then(|mouse| MouseButton::from_code(mouse.button()))
    } else {
        None
    };

    let disposition = ENGINE.with(|engine| {
        engine
            .borrow_mut()
            .as_mut()
            .map(|engine| engine.restorer.on_event(kind, button))
            .unwrap_or(Disposition::NONE)
    });

    if disposition.stop_propagation {
        event.stop_propagation();
        event.stop_immediate_propagation();
    }
    if disposition.prevent_default {
        event.prevent_default();
    }
}

pub(crate) fn dispatch_head_mutation() {
    ENGINE.with(|engine| {
        if let Some(engine) = engine.borrow_mut().as_mut() {
            engine.restorer.on_head_mutation();
        }
    });
}

pub(crate) fn dispatch_recheck() {
    ENGINE.with(|engine| {
        if let Some(engine) = engine.borrow_mut().as_mut() {
            engine.restorer.on_recheck();
        }
    });
}

pub(crate) fn dispatch_dom_ready() {
    ENGINE.with(|engine| {
        if let Some(engine) = engine.borrow_mut().as_mut() {
            engine.restorer.on_dom_ready();
        }
    });
}

/// Gate for deferred host work (head-wait retries) that must not run
/// once the engine was disabled. Called from animation-frame callbacks,
/// never while the engine is borrowed.
pub(crate) fn engine_enabled() -> bool {
    ENGINE.with(|engine| {
        engine
            .try_borrow()
            .map(|engine| engine.as_ref().map(|e| e.restorer.enabled()).unwrap_or(false))
            .unwrap_or(false)
    })
}

/// Session-lifetime visibilitychange hook feeding the right-click
/// navigation heuristic. Installed once per page; leaked deliberately.
fn install_visibility_hook() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    let hook_document = document.clone();
    let callback = Closure::wrap(Box::new(move || {
        if hook_document.hidden() {
            ENGINE.with(|engine| {
                if let Some(engine) = engine.borrow_mut().as_mut() {
                    engine.restorer.on_visibility_hidden();
                }
            });
        }
    }) as Box<dyn FnMut()>);

    if document
        .add_event_listener_with_callback("visibilitychange", callback.as_ref().unchecked_ref())
        .is_err()
    {
        console::warn_1(&"CopyLift: could not install visibility hook".into());
    }
    callback.forget();
}

// =============================================================================
// JsValue Conversion
// =============================================================================

fn from_js<T: serde::de::DeserializeOwned>(value: &JsValue) -> Option<T> {
    if value.is_null() || value.is_undefined() {
        return None;
    }
    let json = js_sys::JSON::stringify(value).ok()?.as_string()?;
    serde_json::from_str(&json).ok()
}

fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    match serde_json::to_string(value) {
        Ok(json) => js_sys::JSON::parse(&json).unwrap_or(JsValue::NULL),
        Err(_) => JsValue::NULL,
    }
}
