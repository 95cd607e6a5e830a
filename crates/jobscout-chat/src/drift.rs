//! Off-topic drift policy.
//!
//! Pure state machine over the per-user counters; the engine applies
//! the side effects (history clearing, counter resets, replies).

use jobscout_core::config::DriftConfig;

/// What to do about an off-topic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftAction {
    /// Full conversation reset: clear history, zero both counters.
    Reset,
    /// Firm redirect back to job search.
    Redirect,
    /// Soft, context-aware nudge.
    Nudge,
}

/// Threshold policy over the (consecutive, total) counters.
#[derive(Debug, Clone, Copy)]
pub struct DriftPolicy {
    max_consecutive: u32,
    max_total: u32,
}

impl DriftPolicy {
    pub fn new(config: &DriftConfig) -> Self {
        Self {
            max_consecutive: config.max_consecutive,
            max_total: config.max_total,
        }
    }

    /// Decide the action for counters that already include the current
    /// off-topic message.
    pub fn assess(&self, consecutive: u32, total: u32) -> DriftAction {
        if consecutive >= self.max_consecutive && total >= self.max_total {
            DriftAction::Reset
        } else if consecutive >= self.max_consecutive {
            DriftAction::Redirect
        } else {
            DriftAction::Nudge
        }
    }
}

impl Default for DriftPolicy {
    fn default() -> Self {
        Self::new(&DriftConfig::default())
    }
}
