//! Telemetry and completion interfaces
//!
//! Both are injected capabilities: telemetry is fire-and-forget debug
//! reporting, the completion sink is notified exactly once when a joint
//! trajectory finishes (or unconditionally on a stop command). Neither may
//! block or reenter the controller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
use super::{AxisMode, AxisOrder};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Consumer of the controller's debug telemetry.
pub trait Telemetry: Send {
    /// Called on the tick in which either axis's mode changed
    /// (edge-triggered).
    fn mode_change(&mut self, delta: AxisMode, alpha: AxisMode);

    /// Called with both axes' current orders when a joint trajectory
    /// completes, and on demand for debugging.
    fn orders(&mut self, delta: &AxisOrder, alpha: &AxisOrder);
}

/// Single-method capability invoked when a trajectory completes.
pub trait CompletionSink: Send {
    fn trajectory_complete(&mut self);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Telemetry consumer which reports over the log facade.
#[derive(Default)]
pub struct LogTm;

/// Completion sink which does nothing, for callers that don't care.
#[derive(Default)]
pub struct NullCompletion;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Telemetry for LogTm {
    fn mode_change(&mut self, delta: AxisMode, alpha: AxisMode) {
        debug!("Mode change: delta {:?}, alpha {:?}", delta, alpha);
    }

    fn orders(&mut self, delta: &AxisOrder, alpha: &AxisOrder) {
        debug!(
            "Orders: delta ({:.4}, {:.4}, {:.4}), alpha ({:.4}, {:.4}, {:.4})",
            delta.pos, delta.vel, delta.acc, alpha.pos, alpha.vel, alpha.acc
        );
    }
}

impl CompletionSink for NullCompletion {
    fn trajectory_complete(&mut self) {}
}
