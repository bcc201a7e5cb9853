//! Core type definitions for CopyLift
//!
//! These types map directly to the persisted configuration shape and the
//! popup message protocol, and are used throughout the engine.

use serde::{Deserialize, Serialize};

/// Element id of the injected override stylesheet.
pub const STYLE_ELEMENT_ID: &str = "copylift-style";

/// sessionStorage key for the right-click-navigation flag.
pub const SESSION_FLAG_KEY: &str = "copylift.rightClickNav";

// =============================================================================
// Feature Set
// =============================================================================

/// Per-site feature toggles.
///
/// Always fully populated once normalized: every field missing from a
/// stored or partial JSON object defaults to `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    #[serde(default = "yes")]
    pub text_selection: bool,
    #[serde(default = "yes")]
    pub context_menu: bool,
    #[serde(default = "yes")]
    pub copy_paste: bool,
    #[serde(default = "yes")]
    pub cursor: bool,
}

fn yes() -> bool {
    true
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            text_selection: true,
            context_menu: true,
            copy_paste: true,
            cursor: true,
        }
    }
}

// =============================================================================
// Mouse Buttons
// =============================================================================

/// Mouse button as reported by `MouseEvent.button`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum MouseButton {
    Left = 0,
    Middle = 1,
    Right = 2,
}

impl MouseButton {
    /// Map a raw `MouseEvent.button` code. Unknown codes (back/forward
    /// buttons and beyond) return `None` and are left alone.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Left),
            1 => Some(Self::Middle),
            2 => Some(Self::Right),
            _ => None,
        }
    }
}

// =============================================================================
// Listener Kinds
// =============================================================================

/// Document-level capturing listeners the restorer may install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    MouseDown,
    MouseUp,
    Click,
    ContextMenu,
    SelectStart,
    Copy,
    Cut,
}

impl ListenerKind {
    /// DOM event type string for `addEventListener`.
    pub fn dom_name(&self) -> &'static str {
        match self {
            Self::MouseDown => "mousedown",
            Self::MouseUp => "mouseup",
            Self::Click => "click",
            Self::ContextMenu => "contextmenu",
            Self::SelectStart => "selectstart",
            Self::Copy => "copy",
            Self::Cut => "cut",
        }
    }

    /// True for the three plain mouse-button events.
    pub fn is_mouse(&self) -> bool {
        matches!(self, Self::MouseDown | Self::MouseUp | Self::Click)
    }
}

// =============================================================================
// Document Handler Properties
// =============================================================================

/// Inline handler properties the restorer overrides on `document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentProperty {
    OnContextMenu,
    OnSelectStart,
    OnCopy,
    OnCut,
    OnPaste,
}

/// All tracked properties, in override order.
pub const DOCUMENT_PROPERTIES: [DocumentProperty; 5] = [
    DocumentProperty::OnContextMenu,
    DocumentProperty::OnSelectStart,
    DocumentProperty::OnCopy,
    DocumentProperty::OnCut,
    DocumentProperty::OnPaste,
];

impl DocumentProperty {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OnContextMenu => "oncontextmenu",
            Self::OnSelectStart => "onselectstart",
            Self::OnCopy => "oncopy",
            Self::OnCut => "oncut",
            Self::OnPaste => "onpaste",
        }
    }

    /// Feature that owns this property; it is only overridden while that
    /// feature is on.
    pub fn feature_enabled(&self, features: &FeatureSet) -> bool {
        match self {
            Self::OnContextMenu => features.context_menu,
            Self::OnSelectStart => features.text_selection,
            Self::OnCopy | Self::OnCut | Self::OnPaste => features.copy_paste,
        }
    }
}

// =============================================================================
// Detection Snapshot
// =============================================================================

bitflags::bitflags! {
    /// Restriction bits aggregated with OR across sampled elements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RestrictionFlags: u8 {
        const USER_SELECT = 1 << 0;
        const POINTER_EVENTS = 1 << 1;
        const CURSOR = 1 << 2;
        const CONTEXTMENU = 1 << 3;
        const SELECTSTART = 1 << 4;
        const COPY = 1 << 5;
    }
}

/// CSS-based restrictions found by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CssRestrictions {
    pub user_select: bool,
    pub pointer_events: bool,
    pub cursor: bool,
}

/// JS handler-property restrictions found by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsRestrictions {
    pub contextmenu: bool,
    pub selectstart: bool,
    pub copy: bool,
}

/// Result of the one-shot restriction scan. Computed once per page
/// lifetime and cached verbatim afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSnapshot {
    pub css_restrictions: CssRestrictions,
    pub js_restrictions: JsRestrictions,
}

impl From<RestrictionFlags> for DetectionSnapshot {
    fn from(flags: RestrictionFlags) -> Self {
        Self {
            css_restrictions: CssRestrictions {
                user_select: flags.contains(RestrictionFlags::USER_SELECT),
                pointer_events: flags.contains(RestrictionFlags::POINTER_EVENTS),
                cursor: flags.contains(RestrictionFlags::CURSOR),
            },
            js_restrictions: JsRestrictions {
                contextmenu: flags.contains(RestrictionFlags::CONTEXTMENU),
                selectstart: flags.contains(RestrictionFlags::SELECTSTART),
                copy: flags.contains(RestrictionFlags::COPY),
            },
        }
    }
}

impl DetectionSnapshot {
    /// True if any CSS or JS restriction bit is set.
    pub fn any(&self) -> bool {
        let css = self.css_restrictions;
        let js = self.js_restrictions;
        css.user_select
            || css.pointer_events
            || css.cursor
            || js.contextmenu
            || js.selectstart
            || js.copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_set_partial_json_defaults_true() {
        let f: FeatureSet = serde_json::from_str(r#"{"cursor":false}"#).unwrap();
        assert!(f.text_selection);
        assert!(f.context_menu);
        assert!(f.copy_paste);
        assert!(!f.cursor);
    }

    #[test]
    fn test_feature_set_camel_case_wire_names() {
        let json = serde_json::to_value(FeatureSet::default()).unwrap();
        assert_eq!(json["textSelection"], true);
        assert_eq!(json["contextMenu"], true);
        assert_eq!(json["copyPaste"], true);
        assert_eq!(json["cursor"], true);
    }

    #[test]
    fn test_mouse_button_codes() {
        assert_eq!(MouseButton::from_code(0), Some(MouseButton::Left));
        assert_eq!(MouseButton::from_code(2), Some(MouseButton::Right));
        assert_eq!(MouseButton::from_code(3), None);
    }

    #[test]
    fn test_snapshot_from_flags() {
        let snap = DetectionSnapshot::from(RestrictionFlags::USER_SELECT | RestrictionFlags::COPY);
        assert!(snap.css_restrictions.user_select);
        assert!(!snap.css_restrictions.cursor);
        assert!(snap.js_restrictions.copy);
        assert!(snap.any());

        let none = DetectionSnapshot::from(RestrictionFlags::empty());
        assert!(!none.any());
    }
}
