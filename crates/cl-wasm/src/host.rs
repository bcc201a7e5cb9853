//! Real-DOM implementation of the engine's host traits.
//!
//! One [`PageHost`] exists per page context. Listener closures route
//! fired events back into the engine through the dispatch functions in
//! `lib.rs`; they never borrow the engine synchronously while a
//! restorer call is on the stack (events, timers and animation frames
//! all arrive from the JS event loop between tasks).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::{Function, Object, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{console, Document, HtmlElement, MutationObserver, MutationObserverInit, Window};

use cl_core::heuristic::SessionFlag;
use cl_core::restorer::{DomHost, HostError};
use cl_core::retry::{RetryBudget, HEAD_WAIT_MAX_ATTEMPTS};
use cl_core::types::{DocumentProperty, ListenerKind, SESSION_FLAG_KEY, STYLE_ELEMENT_ID};

pub struct PageHost {
    window: Window,
    document: Document,
    listeners: HashMap<ListenerKind, Closure<dyn FnMut(web_sys::Event)>>,
    observer: Option<MutationObserver>,
    observer_cb: Option<Closure<dyn FnMut(js_sys::Array, MutationObserver)>>,
    recheck_timer: Option<i32>,
    recheck_cb: Option<Closure<dyn FnMut()>>,
    dom_ready_cb: Option<Closure<dyn FnMut()>>,
}

impl PageHost {
    pub fn new(window: Window, document: Document) -> Self {
        Self {
            window,
            document,
            listeners: HashMap::new(),
            observer: None,
            observer_cb: None,
            recheck_timer: None,
            recheck_cb: None,
            dom_ready_cb: None,
        }
    }
}

fn remove_style_element(document: &Document) {
    if let Some(existing) = document.get_element_by_id(STYLE_ELEMENT_ID) {
        existing.remove();
    }
}

fn insert_style_element(document: &Document, head: &web_sys::HtmlHeadElement, css: &str) {
    remove_style_element(document);
    let style = match document.create_element("style") {
        Ok(style) => style,
        Err(_) => return,
    };
    style.set_id(STYLE_ELEMENT_ID);
    style.set_text_content(Some(css));
    let _ = head.append_child(&style);
}

/// Bounded animation-frame wait for `document.head`. The immediate case
/// is handled by callers; this only runs the retry loop.
fn retry_until_head<F>(window: &Window, document: &Document, what: &'static str, mut action: F)
where
    F: FnMut(&web_sys::HtmlHeadElement) + 'static,
{
    let mut budget = RetryBudget::new(HEAD_WAIT_MAX_ATTEMPTS);
    let window = window.clone();
    let document = document.clone();

    let cell: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let cell_inner = cell.clone();
    let raf_window = window.clone();

    *cell.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        if let Some(head) = document.head() {
            action(&head);
            return;
        }
        if budget.try_attempt() {
            if let Some(cb) = cell_inner.borrow().as_ref() {
                let _ = raf_window.request_animation_frame(cb.as_ref().unchecked_ref());
            }
        } else {
            console::log_1(&format!("CopyLift: document.head not available, skipping {what}").into());
        }
    }) as Box<dyn FnMut()>));

    if let Some(cb) = cell.borrow().as_ref() {
        let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
    };
}

impl DomHost for PageHost {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }

    fn install_listener(&mut self, kind: ListenerKind) {
        let cb = Closure::wrap(Box::new(move |event: web_sys::Event| {
            crate::dispatch_event(kind, &event);
        }) as Box<dyn FnMut(web_sys::Event)>);

        // Capturing phase at the document root, ahead of page handlers.
        let _ = self.document.add_event_listener_with_callback_and_bool(
            kind.dom_name(),
            cb.as_ref().unchecked_ref(),
            true,
        );
        self.listeners.insert(kind, cb);
    }

    fn remove_listener(&mut self, kind: ListenerKind) {
        if let Some(cb) = self.listeners.remove(&kind) {
            let _ = self.document.remove_event_listener_with_callback_and_bool(
                kind.dom_name(),
                cb.as_ref().unchecked_ref(),
                true,
            );
        }
    }

    fn inject_style(&mut self, css: &str) {
        if let Some(head) = self.document.head() {
            insert_style_element(&self.document, &head, css);
            // Force a layout flush so the override takes effect before
            // any immediately-following interaction.
            if let Some(root) = self.document.document_element() {
                if let Some(root) = root.dyn_ref::<HtmlElement>() {
                    let _ = root.offset_height();
                }
            }
            return;
        }

        // head not parsed yet; retry on animation frames, re-checking
        // that the engine was not disabled in the meantime.
        let css = css.to_string();
        let document = self.document.clone();
        retry_until_head(&self.window, &self.document, "style injection", move |head| {
            if crate::engine_enabled() {
                insert_style_element(&document, head, &css);
            }
        });
    }

    fn remove_style(&mut self) {
        remove_style_element(&self.document);
    }

    fn style_present(&self) -> bool {
        self.document.get_element_by_id(STYLE_ELEMENT_ID).is_some()
    }

    fn override_property(&mut self, prop: DocumentProperty) -> Result<(), HostError> {
        let descriptor = Object::new();
        let getter = Function::new_no_args("return null;");
        let setter = Function::new_with_args("_value", "");
        let _ = Reflect::set(&descriptor, &"get".into(), &JsValue::from(getter));
        let _ = Reflect::set(&descriptor, &"set".into(), &JsValue::from(setter));

        let target: &Object = self.document.unchecked_ref();
        match Reflect::define_property(target, &JsValue::from_str(prop.name()), &descriptor) {
            Ok(true) => Ok(()),
            _ => Err(HostError::PropertyNotConfigurable(prop.name())),
        }
    }

    fn observe_head(&mut self) {
        let cb = Closure::wrap(Box::new(move |_records: js_sys::Array, _obs: MutationObserver| {
            crate::dispatch_head_mutation();
        })
            as Box<dyn FnMut(js_sys::Array, MutationObserver)>);

        let observer = match MutationObserver::new(cb.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(_) => return,
        };

        let start = {
            let observer = observer.clone();
            move |head: &web_sys::HtmlHeadElement| {
                let init = MutationObserverInit::new();
                // Direct children only; a subtree watch on a busy page
                // would fire constantly.
                init.set_child_list(true);
                let _ = observer.observe_with_options(head, &init);
            }
        };

        if let Some(head) = self.document.head() {
            start(&head);
        } else {
            retry_until_head(&self.window, &self.document, "observer setup", move |head| {
                if crate::engine_enabled() {
                    start(head);
                }
            });
        }

        self.observer = Some(observer);
        self.observer_cb = Some(cb);
    }

    fn disconnect_observer(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        self.observer_cb = None;
    }

    fn schedule_recheck(&mut self, delay_ms: u32) {
        self.cancel_recheck();

        let cb = Closure::wrap(Box::new(move || {
            crate::dispatch_recheck();
        }) as Box<dyn FnMut()>);

        match self.window.set_timeout_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            delay_ms as i32,
        ) {
            Ok(id) => {
                self.recheck_timer = Some(id);
                self.recheck_cb = Some(cb);
            }
            Err(_) => console::warn_1(&"CopyLift: failed to schedule recheck".into()),
        }
    }

    fn cancel_recheck(&mut self) {
        if let Some(id) = self.recheck_timer.take() {
            self.window.clear_timeout_with_handle(id);
        }
        self.recheck_cb = None;
    }

    fn clear_selection(&mut self) {
        if let Ok(Some(selection)) = self.window.get_selection() {
            let _ = selection.remove_all_ranges();
        }
    }

    fn document_loading(&self) -> bool {
        self.document.ready_state() == "loading"
    }

    fn arm_dom_ready_hook(&mut self) {
        if self.dom_ready_cb.is_some() {
            return;
        }
        let cb = Closure::wrap(Box::new(move || {
            crate::dispatch_dom_ready();
        }) as Box<dyn FnMut()>);
        let _ = self.document.add_event_listener_with_callback(
            "DOMContentLoaded",
            cb.as_ref().unchecked_ref(),
        );
        self.dom_ready_cb = Some(cb);
    }

    fn load_session_flag(&self) -> Option<SessionFlag> {
        let storage = self.window.session_storage().ok()??;
        let raw = storage.get_item(SESSION_FLAG_KEY).ok()??;
        serde_json::from_str(&raw).ok()
    }

    fn save_session_flag(&mut self, flag: &SessionFlag) {
        // Restricted contexts may deny sessionStorage; reduced effect.
        let Ok(Some(storage)) = self.window.session_storage() else {
            return;
        };
        if let Ok(raw) = serde_json::to_string(flag) {
            let _ = storage.set_item(SESSION_FLAG_KEY, &raw);
        }
    }
}
