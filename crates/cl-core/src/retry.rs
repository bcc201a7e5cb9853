//! Bounded retry primitive
//!
//! Used where the engine has to wait for a DOM precondition (typically
//! `document.head` appearing): attempt the action; if the precondition
//! is unmet and attempts remain, yield an animation frame and retry;
//! otherwise give up and report. Retrying yields control between
//! attempts, never blocking the event loop.

/// Animation-frame attempts to wait for `document.head` (~1 second at
/// 50 frames).
pub const HEAD_WAIT_MAX_ATTEMPTS: u32 = 50;

/// Counted retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    attempts: u32,
    max: u32,
}

impl RetryBudget {
    pub fn new(max: u32) -> Self {
        Self { attempts: 0, max }
    }

    /// Consume one attempt. Returns false once the budget is exhausted.
    pub fn try_attempt(&mut self) -> bool {
        if self.attempts >= self.max {
            return false;
        }
        self.attempts += 1;
        true
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_exhausts_after_max() {
        let mut budget = RetryBudget::new(3);
        assert!(budget.try_attempt());
        assert!(budget.try_attempt());
        assert!(budget.try_attempt());
        assert!(!budget.try_attempt());
        assert!(budget.exhausted());
    }

    #[test]
    fn test_zero_budget_never_attempts() {
        let mut budget = RetryBudget::new(0);
        assert!(!budget.try_attempt());
    }
}
