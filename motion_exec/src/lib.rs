//! # Motion executable library
//!
//! This library implements the trajectory-execution core of a
//! differential-drive robot's motion controller. The main entry point is
//! [`motion_ctrl::MotionCtrl`], the cyclic orchestrator which turns
//! trajectory commands into left/right wheel commands.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod motion_ctrl;
pub mod odom;
pub mod ramp;
pub mod servo_ctrl;
pub mod sim;
