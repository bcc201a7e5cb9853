//! Computed-style page probe for the restriction detector.

use wasm_bindgen::JsCast;
use web_sys::{CssStyleDeclaration, Document, Element, Window};

use cl_core::detect::{ElementSample, HandlerSample, PageProbe, SAMPLE_LIMIT, SAMPLE_SELECTOR};
use cl_core::types::DOCUMENT_PROPERTIES;

const USER_SELECT_PROPERTIES: [&str; 4] = [
    "user-select",
    "-webkit-user-select",
    "-moz-user-select",
    "-ms-user-select",
];

pub struct DomProbe {
    window: Window,
    document: Document,
}

impl DomProbe {
    pub fn new(window: Window, document: Document) -> Self {
        Self { window, document }
    }

    fn sample_targets(&self) -> Vec<Element> {
        let mut targets: Vec<Element> = Vec::new();
        if let Some(body) = self.document.body() {
            targets.push(body.into());
        }
        if let Some(root) = self.document.document_element() {
            targets.push(root);
        }
        if let Ok(nodes) = self.document.query_selector_all(SAMPLE_SELECTOR) {
            let count = nodes.length().min(SAMPLE_LIMIT as u32);
            for i in 0..count {
                if let Some(node) = nodes.item(i) {
                    if let Some(element) = node.dyn_ref::<Element>() {
                        targets.push(element.clone());
                    }
                }
            }
        }
        targets
    }
}

fn read_property(style: &CssStyleDeclaration, name: &str) -> Option<String> {
    style
        .get_property_value(name)
        .ok()
        .filter(|value| !value.is_empty())
}

/// Effective user-select: the standard property, else the first
/// vendor-prefixed variant that yields a value.
fn effective_user_select(style: &CssStyleDeclaration) -> Option<String> {
    USER_SELECT_PROPERTIES
        .iter()
        .find_map(|name| read_property(style, name))
}

impl PageProbe for DomProbe {
    fn sample_elements(&self) -> Vec<ElementSample> {
        self.sample_targets()
            .iter()
            .filter_map(|element| {
                let style = self.window.get_computed_style(element).ok()??;
                Some(ElementSample {
                    user_select: effective_user_select(&style),
                    pointer_events: read_property(&style, "pointer-events"),
                    cursor: read_property(&style, "cursor"),
                })
            })
            .collect()
    }

    fn sample_handlers(&self) -> HandlerSample {
        let mut sample = HandlerSample::default();
        let target = self.document.as_ref();

        for prop in DOCUMENT_PROPERTIES {
            let value = js_sys::Reflect::get(target, &prop.name().into()).unwrap_or_default();
            let present = !value.is_null() && !value.is_undefined();
            match prop.name() {
                "oncontextmenu" => sample.contextmenu = present,
                "onselectstart" => sample.selectstart = present,
                "oncopy" => sample.copy = present,
                "oncut" => sample.cut = present,
                "onpaste" => sample.paste = present,
                _ => {}
            }
        }
        sample
    }
}
