//! # Motion control module
//!
//! Motion control executes one trajectory request at a time over two
//! decoupled degrees of freedom: linear displacement ("delta") and rotation
//! ("alpha"). Each axis is driven through a trapezoidal ramp and a PID
//! servo, and the two control efforts are fused into left/right wheel
//! commands for the differential drive.
//!
//! The hard part is the per-tick orchestration: each axis runs a five-mode
//! state machine (`Off`, `Fixed`, `Ending`, `RampPosition`, `RampSpeed`)
//! and the two machines are coupled. A single request may move only one
//! axis with the other held fixed, or both together; whichever axis
//! finishes its ramp first must not stop on its own. It holds position
//! (`Fixed`) until its partner finishes, and is then promoted to `Ending`
//! so that both converge and power off together. A free-running axis
//! (`RampSpeed`) is never forced to stop by its partner completing.
//!
//! Commands arrive asynchronously from a separate context through a bounded
//! queue which is drained at the top of each tick, so all state mutation is
//! confined to the cyclic context.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod axis;
mod cmd;
mod combiner;
mod mode;
mod params;
mod state;
mod tm;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use axis::*;
pub use cmd::*;
pub use combiner::*;
pub use mode::*;
pub use params::*;
pub use state::*;
pub use tm::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Depth of the asynchronous command queue.
///
/// Commands overwrite one another within a single tick, so a small bound is
/// plenty for any sane caller.
pub const CMD_QUEUE_DEPTH: usize = 16;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during MotionCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum MotionCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    /// The heading divisor for a reach-absolute command is too close to zero
    /// for the required distance to be meaningful. Reaching an X coordinate
    /// is impossible while pointing along Y, and vice versa.
    #[error(
        "Cannot reach the target coordinate: heading {heading_rad} rad is \
         within the singular band for this manoeuvre"
    )]
    SingularHeading { heading_rad: f64 },
}
