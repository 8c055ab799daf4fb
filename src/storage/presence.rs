//! Deterministic medium-presence simulation
//!
//! A countdown decides, per gated operation, whether the medium is present.
//! Arming with a negative budget disables removal, zero removes the medium
//! immediately, and a positive budget lets that many operations through
//! before the medium disappears. Absence is sticky until the next `arm`.

use log::{debug, info};

/// Explicit form of the removal countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// Medium permanently present, no counting
    Disabled,
    /// Medium absent for every check until rearmed
    AbsentNow,
    /// Medium present for exactly this many more checks (always > 0)
    PresentFor(u64),
}

impl PresenceState {
    pub fn from_budget(budget: i64) -> Self {
        match budget {
            b if b < 0 => PresenceState::Disabled,
            0 => PresenceState::AbsentNow,
            b => PresenceState::PresentFor(b as u64),
        }
    }

    /// The signed countdown this state corresponds to
    pub fn as_budget(&self) -> i64 {
        match self {
            PresenceState::Disabled => -1,
            PresenceState::AbsentNow => 0,
            PresenceState::PresentFor(n) => i64::try_from(*n).unwrap_or(i64::MAX),
        }
    }
}

impl Default for PresenceState {
    fn default() -> Self {
        PresenceState::Disabled
    }
}

#[derive(Debug, Default)]
pub struct PresenceSimulator {
    state: PresenceState,
    checks: u64,
    absences: u64,
}

impl PresenceSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// Number of gated operations seen so far
    pub fn checks(&self) -> u64 {
        self.checks
    }

    /// Number of gated operations that observed the medium as absent
    pub fn absences(&self) -> u64 {
        self.absences
    }

    pub fn arm(&mut self, budget: i64) {
        self.state = PresenceState::from_budget(budget);
        info!("Removal countdown armed with budget {} ({:?})", budget, self.state);
    }

    /// Decide presence for one gated operation, consuming one unit of budget.
    pub fn check_and_consume(&mut self) -> bool {
        self.checks += 1;
        let present = match self.state {
            PresenceState::Disabled => true,
            PresenceState::AbsentNow => false,
            PresenceState::PresentFor(n) => {
                self.state = if n == 1 {
                    PresenceState::AbsentNow
                } else {
                    PresenceState::PresentFor(n - 1)
                };
                true
            }
        };
        if !present {
            self.absences += 1;
            debug!("Medium absent on check #{}", self.checks);
        }
        present
    }
}
