//! Right-Click-Navigation Heuristic
//!
//! Some sites use right-click as a disguised navigation trigger (via the
//! default action of mousedown/mouseup) instead of showing a context
//! menu. Blanket preventDefault on every right-click would break the
//! native menu on compliant sites, so suppression opts in per session,
//! only after the pattern has been observed once: a right-click followed
//! within [`RIGHT_CLICK_NAV_WINDOW_MS`] by the page becoming hidden.
//!
//! This is a best-effort signal, not a proof; coincidental navigation
//! shortly after an unrelated right-click is an accepted false positive.
//! Both thresholds are tunable policy, not contract.

use serde::{Deserialize, Serialize};

/// How close a right-click must precede the hidden transition to count.
pub const RIGHT_CLICK_NAV_WINDOW_MS: f64 = 200.0;

/// Persisted flag validity. Stale flags are ignored on load.
pub const SESSION_FLAG_TTL_MS: f64 = 10.0 * 60.0 * 1000.0;

/// Flag persisted in session storage under
/// [`crate::types::SESSION_FLAG_KEY`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFlag {
    pub detected: bool,
    pub timestamp_ms: f64,
}

/// Session-scoped right-click-navigation detector.
#[derive(Debug, Default)]
pub struct NavTrapHeuristic {
    last_right_ms: Option<f64>,
    armed: bool,
}

impl NavTrapHeuristic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Once armed, right-button mousedown/mouseup get preventDefault for
    /// the rest of the session.
    pub fn armed(&self) -> bool {
        self.armed
    }

    /// Record the most recent right-button mouse event.
    pub fn note_right_button(&mut self, now_ms: f64) {
        self.last_right_ms = Some(now_ms);
    }

    /// Called when the page transitions to hidden. Returns the flag to
    /// persist (and arms in place) iff a right-click landed within the
    /// detection window.
    pub fn flag_on_hidden(&mut self, now_ms: f64) -> Option<SessionFlag> {
        let last = self.last_right_ms?;
        if now_ms - last > RIGHT_CLICK_NAV_WINDOW_MS {
            return None;
        }
        self.armed = true;
        Some(SessionFlag {
            detected: true,
            timestamp_ms: now_ms,
        })
    }

    /// Arm from a flag loaded on page load, only while it is still
    /// within its TTL.
    pub fn arm_from(&mut self, flag: SessionFlag, now_ms: f64) {
        if flag.detected && now_ms - flag.timestamp_ms < SESSION_FLAG_TTL_MS {
            self.armed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_armed_by_default() {
        assert!(!NavTrapHeuristic::new().armed());
    }

    #[test]
    fn test_hidden_shortly_after_right_click_flags() {
        let mut nav = NavTrapHeuristic::new();
        nav.note_right_button(1_000.0);

        let flag = nav.flag_on_hidden(1_150.0).expect("within window");
        assert!(flag.detected);
        assert_eq!(flag.timestamp_ms, 1_150.0);
        assert!(nav.armed());
    }

    #[test]
    fn test_hidden_long_after_right_click_does_not_flag() {
        let mut nav = NavTrapHeuristic::new();
        nav.note_right_button(1_000.0);

        assert!(nav.flag_on_hidden(1_000.0 + RIGHT_CLICK_NAV_WINDOW_MS + 1.0).is_none());
        assert!(!nav.armed());
    }

    #[test]
    fn test_hidden_without_any_right_click_does_not_flag() {
        let mut nav = NavTrapHeuristic::new();
        assert!(nav.flag_on_hidden(5_000.0).is_none());
    }

    #[test]
    fn test_fresh_flag_arms_stale_flag_does_not() {
        let flag = SessionFlag {
            detected: true,
            timestamp_ms: 0.0,
        };

        let mut fresh = NavTrapHeuristic::new();
        fresh.arm_from(flag, SESSION_FLAG_TTL_MS - 1.0);
        assert!(fresh.armed());

        let mut stale = NavTrapHeuristic::new();
        stale.arm_from(flag, SESSION_FLAG_TTL_MS);
        assert!(!stale.armed());
    }

    #[test]
    fn test_session_flag_wire_shape() {
        let json = serde_json::to_value(SessionFlag {
            detected: true,
            timestamp_ms: 42.0,
        })
        .unwrap();
        assert_eq!(json["detected"], true);
        assert_eq!(json["timestampMs"], 42.0);
    }
}
