//! Step position state machine.
//!
//! Positions are `0..total`; with `total == 0` the walker sits at 0 and every
//! transition is disabled. Transitions that would leave the range are no-ops.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Walker {
    total: usize,
    current: usize,
}

impl Walker {
    /// Start at the first step of a lesson with `total` steps.
    pub fn new(total: usize) -> Self {
        Self { total, current: 0 }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// 0-based index of the active step.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn can_previous(&self) -> bool {
        self.current > 0
    }

    pub fn can_next(&self) -> bool {
        self.total > 0 && self.current < self.total - 1
    }

    /// Move back one step. Returns false (and does nothing) at the first step.
    pub fn previous(&mut self) -> bool {
        if !self.can_previous() {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Move forward one step. Returns false (and does nothing) at the last step.
    pub fn next(&mut self) -> bool {
        if !self.can_next() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Set the position from a 1-based step number.
    ///
    /// Accepts `1..=total` regardless of the current position. Anything else
    /// is rejected and leaves the state unchanged.
    pub fn jump(&mut self, step: usize) -> bool {
        if step == 0 || step > self.total {
            return false;
        }
        self.current = step - 1;
        true
    }

    /// Adopt a new step count for the same lesson, clamping the position.
    pub fn resize(&mut self, total: usize) {
        self.total = total;
        if total == 0 {
            self.current = 0;
        } else if self.current >= total {
            self.current = total - 1;
        }
    }
}

/// Display-ready position summary ("step X of N" plus completion fraction).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    /// 1-based step number.
    pub step: usize,
    pub total: usize,
    /// `(current + 1) / total`, or 0 for an empty lesson.
    pub fraction: f64,
}

impl Progress {
    pub fn of(walker: &Walker) -> Self {
        if walker.is_empty() {
            return Self {
                step: 0,
                total: 0,
                fraction: 0.0,
            };
        }
        let step = walker.current() + 1;
        Self {
            step,
            total: walker.total(),
            fraction: step as f64 / walker.total() as f64,
        }
    }

    pub fn percent(&self) -> u32 {
        (self.fraction * 100.0).round() as u32
    }
}
