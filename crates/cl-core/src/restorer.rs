//! Interaction Restorer
//!
//! Makes a page behave as if no copy/selection/right-click restrictions
//! exist, scoped to the features that are enabled. The restorer is a
//! per-page state machine; every DOM side effect goes through the
//! [`DomHost`] trait so the same logic runs against the real document
//! (wasm crate) and a mock host (tests).
//!
//! Re-initialization is always idempotent: prior listeners, the injected
//! stylesheet, the head observer and any pending recheck are torn down
//! before the new feature set is installed. The listener registry is the
//! single source of truth for what is currently installed, so teardown
//! is exact.

use crate::heuristic::{NavTrapHeuristic, SessionFlag};
use crate::types::{
    DocumentProperty, FeatureSet, ListenerKind, MouseButton, DOCUMENT_PROPERTIES,
};

/// Recheck delay after a head mutation. Naive per-mutation reinjection
/// is CPU-prohibitive on pages with frequent DOM churn, so mutations
/// within this window coalesce into one check.
pub const RECHECK_THROTTLE_MS: u32 = 100;

/// Error type for host-side failures the restorer tolerates.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("document property {0} is not configurable")]
    PropertyNotConfigurable(&'static str),
    #[error("document.head did not appear within the retry budget")]
    HeadUnavailable,
}

// =============================================================================
// Host Abstraction
// =============================================================================

/// Side-effect surface of the page. One instance per page context.
///
/// Listener installs are capturing-phase at the document root; the host
/// routes fired events back into [`Restorer::on_event`] and applies the
/// returned [`Disposition`]. `inject_style` replaces any prior instance
/// of the override stylesheet and is responsible for waiting on
/// `document.head` (bounded animation-frame retry).
pub trait DomHost {
    fn now_ms(&self) -> f64;

    fn install_listener(&mut self, kind: ListenerKind);
    fn remove_listener(&mut self, kind: ListenerKind);

    fn inject_style(&mut self, css: &str);
    fn remove_style(&mut self);
    fn style_present(&self) -> bool;

    fn override_property(&mut self, prop: DocumentProperty) -> Result<(), HostError>;

    fn observe_head(&mut self);
    fn disconnect_observer(&mut self);

    fn schedule_recheck(&mut self, delay_ms: u32);
    fn cancel_recheck(&mut self);

    fn clear_selection(&mut self);

    fn document_loading(&self) -> bool;
    /// Arrange for [`Restorer::on_dom_ready`] to be called once the
    /// document finishes loading.
    fn arm_dom_ready_hook(&mut self);

    fn load_session_flag(&self) -> Option<SessionFlag>;
    fn save_session_flag(&mut self, flag: &SessionFlag);
}

/// What a fired event should do, decided per event kind and button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Disposition {
    /// Stop propagation, including other capturing listeners.
    pub stop_propagation: bool,
    /// Cancel the default action. Never set for `contextmenu` or
    /// left-button events.
    pub prevent_default: bool,
}

impl Disposition {
    pub const NONE: Self = Self {
        stop_propagation: false,
        prevent_default: false,
    };
    pub const STOP: Self = Self {
        stop_propagation: true,
        prevent_default: false,
    };
}

// =============================================================================
// Override Stylesheet
// =============================================================================

/// Build the override stylesheet for the given features. `None` when no
/// feature contributes a rule, in which case nothing is inserted.
pub fn build_override_css(features: &FeatureSet) -> Option<String> {
    if !features.text_selection && !features.cursor {
        return None;
    }

    let mut rules = String::new();
    if features.text_selection {
        for prefix in ["-webkit-", "-moz-", "-ms-", ""] {
            rules.push_str("  ");
            rules.push_str(prefix);
            rules.push_str("user-select: text !important;\n");
        }
    }
    if features.cursor {
        rules.push_str("  cursor: auto !important;\n");
    }
    Some(format!("* {{\n{rules}}}\n"))
}

/// Listeners to install for a feature set, in install order.
pub fn listener_plan(features: &FeatureSet) -> Vec<ListenerKind> {
    let mut plan = Vec::new();
    if features.text_selection || features.context_menu {
        plan.extend([
            ListenerKind::MouseDown,
            ListenerKind::MouseUp,
            ListenerKind::Click,
        ]);
    }
    if features.context_menu {
        plan.push(ListenerKind::ContextMenu);
    }
    if features.text_selection {
        plan.push(ListenerKind::SelectStart);
    }
    if features.copy_paste {
        plan.extend([ListenerKind::Copy, ListenerKind::Cut]);
    }
    plan
}

// =============================================================================
// Restorer
// =============================================================================

/// Per-page interaction restorer. Constructed once per script injection.
pub struct Restorer<H: DomHost> {
    host: H,
    enabled: bool,
    features: FeatureSet,
    registry: Vec<ListenerKind>,
    observing: bool,
    nav: NavTrapHeuristic,
}

impl<H: DomHost> Restorer<H> {
    /// Create a restorer in the disabled state, arming the right-click
    /// heuristic from any still-valid session flag.
    pub fn new(host: H) -> Self {
        let mut nav = NavTrapHeuristic::new();
        if let Some(flag) = host.load_session_flag() {
            nav.arm_from(flag, host.now_ms());
        }
        Self {
            host,
            enabled: false,
            features: FeatureSet::default(),
            registry: Vec::new(),
            observing: false,
            nav,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn features(&self) -> FeatureSet {
        self.features
    }

    pub fn installed_listeners(&self) -> usize {
        self.registry.len()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Idempotent entry point: apply a new enabled/feature state.
    ///
    /// Absent features mean defaults (all on). Turning off a previously
    /// active textSelection feature proactively clears any live
    /// selection.
    pub fn initialize(&mut self, enabled: bool, features: Option<FeatureSet>) {
        let features = features.unwrap_or_default();

        if self.enabled && self.features.text_selection && !features.text_selection {
            self.host.clear_selection();
        }

        self.enabled = enabled;
        self.features = features;

        if enabled {
            // Full teardown first so repeated calls never double-register.
            self.remove_cleanup();
            self.disable_interactions();

            self.enable_interactions();
            self.apply_overrides();

            // Some sites attach their restrictions on DOMContentLoaded;
            // re-apply once the document finishes loading.
            if self.host.document_loading() {
                self.host.arm_dom_ready_hook();
            }

            self.host.observe_head();
            self.observing = true;
        } else {
            self.disable_interactions();
            self.remove_cleanup();
        }
    }

    /// Decide what a fired document-level event should do. The host
    /// applies the returned disposition to the live event.
    pub fn on_event(&mut self, kind: ListenerKind, button: Option<MouseButton>) -> Disposition {
        if !self.enabled {
            return Disposition::NONE;
        }

        if kind.is_mouse() {
            return match button {
                Some(MouseButton::Left) if self.features.text_selection => Disposition::STOP,
                Some(MouseButton::Right) => {
                    let now = self.host.now_ms();
                    self.nav.note_right_button(now);

                    if !self.features.context_menu {
                        return Disposition::NONE;
                    }
                    // preventDefault only where the navigation trap fires
                    // (mousedown/mouseup) and only once the session
                    // heuristic has seen the pattern; the contextmenu
                    // event itself is never cancelled so the browser menu
                    // still renders.
                    Disposition {
                        stop_propagation: true,
                        prevent_default: kind != ListenerKind::Click && self.nav.armed(),
                    }
                }
                _ => Disposition::NONE,
            };
        }

        // contextmenu, selectstart, copy, cut: installed only while their
        // owning feature is on; stop propagation, keep the default.
        Disposition::STOP
    }

    /// Page became hidden: persist the navigation flag if a right-click
    /// just happened.
    pub fn on_visibility_hidden(&mut self) {
        let now = self.host.now_ms();
        if let Some(flag) = self.nav.flag_on_hidden(now) {
            self.host.save_session_flag(&flag);
        }
    }

    /// A direct child of document.head was added or removed. Coalesce
    /// into one pending recheck per throttle window.
    pub fn on_head_mutation(&mut self) {
        if !self.enabled {
            return;
        }
        self.host.cancel_recheck();
        self.host.schedule_recheck(RECHECK_THROTTLE_MS);
    }

    /// The throttled recheck fired: re-inject the stylesheet if the page
    /// removed it.
    pub fn on_recheck(&mut self) {
        if !self.enabled || self.host.style_present() {
            return;
        }
        if let Some(css) = build_override_css(&self.features) {
            self.host.inject_style(&css);
        }
    }

    /// DOMContentLoaded on a page that was still loading at initialize
    /// time: re-apply the overrides.
    pub fn on_dom_ready(&mut self) {
        if self.enabled {
            self.apply_overrides();
        }
    }

    fn enable_interactions(&mut self) {
        for kind in listener_plan(&self.features) {
            self.host.install_listener(kind);
            self.registry.push(kind);
        }
    }

    /// Remove every registered listener exactly once.
    fn disable_interactions(&mut self) {
        for kind in std::mem::take(&mut self.registry) {
            self.host.remove_listener(kind);
        }
    }

    /// Remove injected artifacts: pending recheck, stylesheet, observer.
    fn remove_cleanup(&mut self) {
        self.host.cancel_recheck();
        self.host.remove_style();
        if self.observing {
            self.host.disconnect_observer();
            self.observing = false;
        }
    }

    fn apply_overrides(&mut self) {
        if let Some(css) = build_override_css(&self.features) {
            self.host.inject_style(&css);
        }
        for prop in DOCUMENT_PROPERTIES {
            if !prop.feature_enabled(&self.features) {
                continue;
            }
            // Pages may have frozen a property; skip it and keep going.
            if let Err(e) = self.host.override_property(prop) {
                log::debug!("property override skipped: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Default)]
    struct MockHost {
        now_ms: f64,
        active: Vec<ListenerKind>,
        installs: usize,
        removes: usize,
        style: Option<String>,
        overridden: Vec<DocumentProperty>,
        failing_props: HashSet<&'static str>,
        observing: bool,
        pending_recheck: Option<u32>,
        overlapping_rechecks: bool,
        selections_cleared: usize,
        loading: bool,
        dom_ready_armed: bool,
        session_flag: Option<SessionFlag>,
    }

    impl DomHost for MockHost {
        fn now_ms(&self) -> f64 {
            self.now_ms
        }

        fn install_listener(&mut self, kind: ListenerKind) {
            self.active.push(kind);
            self.installs += 1;
        }

        fn remove_listener(&mut self, kind: ListenerKind) {
            if let Some(pos) = self.active.iter().position(|&k| k == kind) {
                self.active.remove(pos);
            }
            self.removes += 1;
        }

        fn inject_style(&mut self, css: &str) {
            self.style = Some(css.to_string());
        }

        fn remove_style(&mut self) {
            self.style = None;
        }

        fn style_present(&self) -> bool {
            self.style.is_some()
        }

        fn override_property(&mut self, prop: DocumentProperty) -> Result<(), HostError> {
            if self.failing_props.contains(prop.name()) {
                return Err(HostError::PropertyNotConfigurable(prop.name()));
            }
            self.overridden.push(prop);
            Ok(())
        }

        fn observe_head(&mut self) {
            self.observing = true;
        }

        fn disconnect_observer(&mut self) {
            self.observing = false;
        }

        fn schedule_recheck(&mut self, delay_ms: u32) {
            if self.pending_recheck.is_some() {
                self.overlapping_rechecks = true;
            }
            self.pending_recheck = Some(delay_ms);
        }

        fn cancel_recheck(&mut self) {
            self.pending_recheck = None;
        }

        fn clear_selection(&mut self) {
            self.selections_cleared += 1;
        }

        fn document_loading(&self) -> bool {
            self.loading
        }

        fn arm_dom_ready_hook(&mut self) {
            self.dom_ready_armed = true;
        }

        fn load_session_flag(&self) -> Option<SessionFlag> {
            self.session_flag
        }

        fn save_session_flag(&mut self, flag: &SessionFlag) {
            self.session_flag = Some(*flag);
        }
    }

    fn enabled_restorer() -> Restorer<MockHost> {
        let mut r = Restorer::new(MockHost::default());
        r.initialize(true, None);
        r
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut once = Restorer::new(MockHost::default());
        once.initialize(true, None);
        let count_once = once.installed_listeners();

        let mut twice = Restorer::new(MockHost::default());
        twice.initialize(true, None);
        twice.initialize(true, None);

        assert_eq!(twice.installed_listeners(), count_once);
        assert_eq!(twice.host().active.len(), count_once);
    }

    #[test]
    fn test_disable_tears_down_exactly() {
        let mut r = enabled_restorer();
        r.on_head_mutation(); // leave a pending recheck behind

        r.initialize(false, None);

        assert_eq!(r.installed_listeners(), 0);
        assert!(r.host().active.is_empty());
        assert!(!r.host().style_present());
        assert!(!r.host().observing);
        assert!(r.host().pending_recheck.is_none());
        // Every install was matched by exactly one remove.
        assert_eq!(r.host().installs, r.host().removes);
    }

    #[test]
    fn test_listener_plan_per_feature() {
        let all = listener_plan(&FeatureSet::default());
        assert_eq!(all.len(), 7);

        let no_clipboard = listener_plan(&FeatureSet {
            copy_paste: false,
            ..FeatureSet::default()
        });
        assert!(!no_clipboard.contains(&ListenerKind::Copy));
        assert!(!no_clipboard.contains(&ListenerKind::Cut));

        let selection_only = listener_plan(&FeatureSet {
            context_menu: false,
            copy_paste: false,
            cursor: false,
            ..FeatureSet::default()
        });
        assert!(selection_only.contains(&ListenerKind::MouseDown));
        assert!(selection_only.contains(&ListenerKind::SelectStart));
        assert!(!selection_only.contains(&ListenerKind::ContextMenu));

        let nothing = listener_plan(&FeatureSet {
            text_selection: false,
            context_menu: false,
            copy_paste: false,
            cursor: false,
        });
        assert!(nothing.is_empty());
    }

    #[test]
    fn test_left_click_passthrough() {
        let mut r = enabled_restorer();
        let d = r.on_event(ListenerKind::Click, Some(MouseButton::Left));
        assert!(d.stop_propagation);
        assert!(!d.prevent_default);
    }

    #[test]
    fn test_contextmenu_never_cancelled() {
        let mut r = enabled_restorer();
        let d = r.on_event(ListenerKind::ContextMenu, None);
        assert!(d.stop_propagation);
        assert!(!d.prevent_default);
    }

    #[test]
    fn test_right_click_not_cancelled_without_heuristic() {
        let mut r = enabled_restorer();
        let d = r.on_event(ListenerKind::MouseDown, Some(MouseButton::Right));
        assert!(d.stop_propagation);
        assert!(!d.prevent_default);
    }

    #[test]
    fn test_right_click_cancelled_once_heuristic_armed() {
        let host = MockHost {
            session_flag: Some(SessionFlag {
                detected: true,
                timestamp_ms: 0.0,
            }),
            now_ms: 1_000.0,
            ..MockHost::default()
        };
        let mut r = Restorer::new(host);
        r.initialize(true, None);

        let down = r.on_event(ListenerKind::MouseDown, Some(MouseButton::Right));
        assert!(down.prevent_default);
        let up = r.on_event(ListenerKind::MouseUp, Some(MouseButton::Right));
        assert!(up.prevent_default);
        // click is never cancelled, armed or not
        let click = r.on_event(ListenerKind::Click, Some(MouseButton::Right));
        assert!(click.stop_propagation);
        assert!(!click.prevent_default);
    }

    #[test]
    fn test_right_click_then_hidden_persists_flag() {
        let mut r = enabled_restorer();
        r.on_event(ListenerKind::MouseDown, Some(MouseButton::Right));
        r.on_visibility_hidden();
        assert!(r.host().session_flag.is_some());

        // From now on right-button mousedown is cancelled.
        let d = r.on_event(ListenerKind::MouseDown, Some(MouseButton::Right));
        assert!(d.prevent_default);
    }

    #[test]
    fn test_middle_button_is_left_alone() {
        let mut r = enabled_restorer();
        let d = r.on_event(ListenerKind::MouseDown, Some(MouseButton::Middle));
        assert_eq!(d, Disposition::NONE);
    }

    #[test]
    fn test_mutations_coalesce_into_one_recheck() {
        let mut r = enabled_restorer();
        for _ in 0..20 {
            r.on_head_mutation();
        }
        assert!(r.host().pending_recheck.is_some());
        assert!(!r.host().overlapping_rechecks);
    }

    #[test]
    fn test_recheck_reinjects_removed_style() {
        let mut r = enabled_restorer();
        assert!(r.host().style_present());

        // Page fights back and strips the stylesheet.
        r.host.remove_style();
        r.on_recheck();
        assert!(r.host().style_present());
    }

    #[test]
    fn test_recheck_leaves_intact_style_alone() {
        let mut r = enabled_restorer();
        let before = r.host().style.clone();
        r.on_recheck();
        assert_eq!(r.host().style, before);
    }

    #[test]
    fn test_css_rules_follow_features() {
        let full = build_override_css(&FeatureSet::default()).unwrap();
        assert!(full.contains("user-select: text !important"));
        assert!(full.contains("-webkit-user-select"));
        assert!(full.contains("cursor: auto !important"));

        let selection_only = build_override_css(&FeatureSet {
            cursor: false,
            ..FeatureSet::default()
        })
        .unwrap();
        assert!(!selection_only.contains("cursor: auto"));

        let none = build_override_css(&FeatureSet {
            text_selection: false,
            cursor: false,
            ..FeatureSet::default()
        });
        assert!(none.is_none());
    }

    #[test]
    fn test_property_overrides_follow_features() {
        let mut r = Restorer::new(MockHost::default());
        r.initialize(
            true,
            Some(FeatureSet {
                copy_paste: false,
                ..FeatureSet::default()
            }),
        );

        let overridden = &r.host().overridden;
        assert!(overridden.contains(&DocumentProperty::OnContextMenu));
        assert!(overridden.contains(&DocumentProperty::OnSelectStart));
        assert!(!overridden.contains(&DocumentProperty::OnCopy));
        assert!(!overridden.contains(&DocumentProperty::OnPaste));
    }

    #[test]
    fn test_frozen_property_does_not_abort_the_rest() {
        let mut host = MockHost::default();
        host.failing_props.insert("oncontextmenu");

        let mut r = Restorer::new(host);
        r.initialize(true, None);

        assert!(!r.host().overridden.contains(&DocumentProperty::OnContextMenu));
        assert_eq!(r.host().overridden.len(), 4);
    }

    #[test]
    fn test_disabling_text_selection_clears_selection() {
        let mut r = enabled_restorer();
        r.initialize(
            true,
            Some(FeatureSet {
                text_selection: false,
                ..FeatureSet::default()
            }),
        );
        assert_eq!(r.host().selections_cleared, 1);

        // Re-applying the same state does not clear again.
        r.initialize(
            true,
            Some(FeatureSet {
                text_selection: false,
                ..FeatureSet::default()
            }),
        );
        assert_eq!(r.host().selections_cleared, 1);
    }

    #[test]
    fn test_loading_document_arms_dom_ready_reapply() {
        let host = MockHost {
            loading: true,
            ..MockHost::default()
        };
        let mut r = Restorer::new(host);
        r.initialize(true, None);
        assert!(r.host().dom_ready_armed);

        r.host.remove_style();
        r.on_dom_ready();
        assert!(r.host().style_present());
    }

    #[test]
    fn test_events_ignored_while_disabled() {
        let mut r = Restorer::new(MockHost::default());
        let d = r.on_event(ListenerKind::Click, Some(MouseButton::Left));
        assert_eq!(d, Disposition::NONE);
    }
}
