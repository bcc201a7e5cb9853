//! Restriction Detector
//!
//! One-shot scan of a page for CSS/JS anti-copy restrictions. The scan
//! runs exactly once per page lifetime and the snapshot is cached
//! verbatim: the restorer's own stylesheet injection would make any
//! rescan report false negatives, so detection must run before any
//! override is applied and never again after.

use crate::types::{DetectionSnapshot, RestrictionFlags};

/// Tag selector for the bounded element sample.
pub const SAMPLE_SELECTOR: &str = "p, div, span, article, section, main";

/// How many selector matches to sample, beyond body/documentElement.
pub const SAMPLE_LIMIT: usize = 10;

/// Computed cursor values that are not treated as a restriction.
pub const CURSOR_ALLOWLIST: [&str; 8] = [
    "auto", "default", "text", "pointer", "help", "wait", "move", "crosshair",
];

// =============================================================================
// Page Probe
// =============================================================================

/// Computed-style readings for one sampled element. `None` means the
/// property could not be read (detached element, no computed style).
#[derive(Debug, Clone, Default)]
pub struct ElementSample {
    /// Effective user-select, vendor-prefixed variants already resolved.
    pub user_select: Option<String>,
    pub pointer_events: Option<String>,
    pub cursor: Option<String>,
}

/// Non-null state of the tracked document handler properties. `cut` and
/// `paste` are read for override purposes but not surfaced in the
/// snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandlerSample {
    pub contextmenu: bool,
    pub selectstart: bool,
    pub copy: bool,
    pub cut: bool,
    pub paste: bool,
}

/// Read-only view of the page used by the detector. The wasm crate
/// implements this over `getComputedStyle`; tests use fixed samples.
pub trait PageProbe {
    /// body, documentElement, then the first [`SAMPLE_LIMIT`] matches of
    /// [`SAMPLE_SELECTOR`], in document order.
    fn sample_elements(&self) -> Vec<ElementSample>;

    fn sample_handlers(&self) -> HandlerSample;
}

// =============================================================================
// Detector
// =============================================================================

/// Caching restriction detector: not-yet-detected → detected.
#[derive(Debug, Default)]
pub struct Detector {
    cached: Option<DetectionSnapshot>,
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the scan on first call; return the cached snapshot afterwards
    /// even if the page has since changed.
    pub fn detect(&mut self, probe: &impl PageProbe) -> DetectionSnapshot {
        if let Some(cached) = self.cached {
            return cached;
        }
        let snapshot = scan(probe);
        self.cached = Some(snapshot);
        snapshot
    }

    /// Cached snapshot, if the scan has run.
    pub fn snapshot(&self) -> Option<DetectionSnapshot> {
        self.cached
    }
}

fn scan(probe: &impl PageProbe) -> DetectionSnapshot {
    let mut flags = RestrictionFlags::empty();

    for sample in probe.sample_elements() {
        if sample.user_select.as_deref() == Some("none") {
            flags |= RestrictionFlags::USER_SELECT;
        }
        if sample.pointer_events.as_deref() == Some("none") {
            flags |= RestrictionFlags::POINTER_EVENTS;
        }
        if let Some(cursor) = sample.cursor.as_deref() {
            if cursor_restricted(cursor) {
                flags |= RestrictionFlags::CURSOR;
            }
        }
    }

    let handlers = probe.sample_handlers();
    if handlers.contextmenu {
        flags |= RestrictionFlags::CONTEXTMENU;
    }
    if handlers.selectstart {
        flags |= RestrictionFlags::SELECTSTART;
    }
    if handlers.copy {
        flags |= RestrictionFlags::COPY;
    }

    DetectionSnapshot::from(flags)
}

/// A cursor value is a restriction when it is set and not on the
/// allow-list.
fn cursor_restricted(cursor: &str) -> bool {
    let cursor = cursor.trim();
    !cursor.is_empty()
        && !CURSOR_ALLOWLIST
            .iter()
            .any(|allowed| cursor.eq_ignore_ascii_case(allowed))
}
