//! Main motion control demonstration executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and the MotionCtrl module
//!     - Run a scripted demonstration mission:
//!         - Issue the next trajectory command through the commander
//!         - Main loop:
//!             - Simulated plant execution (wheel commands -> encoder ticks)
//!             - Motion control processing
//!             - Archive write
//!         - Advance to the next mission phase on trajectory completion
//!     - Save a mission summary into the session
//!
//! The plant is the pure simulation model from `motion_lib::sim`, so the
//! executable runs anywhere without hardware and without pacing to wall
//! clock time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Internal
use motion_lib::{
    motion_ctrl::{CompletionSink, MotionCommand, MotionCtrl},
    sim::DiffDrivePlant,
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one control cycle.
///
/// Units: seconds
const CYCLE_PERIOD_S: f64 = 0.01;

/// Maximum number of cycles allowed for any single mission phase.
const PHASE_CYCLE_LIMIT: usize = 10_000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Completion sink which logs and raises a flag for the mission sequencer.
struct MissionCompletion {
    flag: Arc<AtomicBool>,
}

/// Summary of the demonstration mission, saved into the session on exit.
#[derive(Serialize)]
struct MissionSummary {
    phases_completed: usize,
    total_cycles: usize,
    final_x_m: f64,
    final_y_m: f64,
    final_heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CompletionSink for MissionCompletion {
    fn trajectory_complete(&mut self) {
        info!("Trajectory complete");
        self.flag.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    color_eyre::install()?;

    // Initialise session
    let session =
        Session::new("motion_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Motion Control Demonstration Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut motion_ctrl = MotionCtrl::default();
    motion_ctrl
        .init("motion_ctrl.toml", &session)
        .wrap_err("Failed to initialise MotionCtrl")?;
    info!("MotionCtrl init complete");

    let complete_flag = Arc::new(AtomicBool::new(false));
    motion_ctrl.set_completion_sink(Box::new(MissionCompletion {
        flag: complete_flag.clone(),
    }));

    let commander = motion_ctrl.commander();

    info!("Module initialisation complete\n");

    // ---- MISSION SCRIPT ----

    // Drive a 1 m by 1 m square-ish path, then demonstrate the held-speed
    // and absolute-target command families.
    let mission: Vec<(&str, MotionCommand)> = vec![
        (
            "Translate 1 m",
            MotionCommand::Translate {
                dist_m: 1.0,
                speed_ms: None,
                acc_mss: None,
            },
        ),
        (
            "Rotate 90 deg",
            MotionCommand::Rotate {
                rot_rad: std::f64::consts::FRAC_PI_2,
                rate_rads: None,
                acc_radss: None,
            },
        ),
        (
            "Arc: translate 1 m while rotating 90 deg",
            MotionCommand::TranslateRotate {
                dist_m: 1.0,
                rot_rad: std::f64::consts::FRAC_PI_2,
                speed_ms: None,
                acc_mss: None,
                rate_rads: None,
                acc_radss: None,
            },
        ),
        (
            "Face the -X direction",
            MotionCommand::ReachHeading {
                heading_rad: std::f64::consts::PI,
                rate_rads: None,
                acc_radss: None,
            },
        ),
        (
            "Return to x = 0",
            MotionCommand::ReachX {
                x_m: 0.0,
                speed_ms: None,
                acc_mss: None,
            },
        ),
    ];

    // ---- MAIN LOOP ----

    info!("Beginning mission, {} phases\n", mission.len());

    let mut plant = DiffDrivePlant::new();
    let mut wheel_cmds = Default::default();
    let mut total_cycles = 0usize;
    let mut phases_completed = 0usize;

    for (name, cmd) in &mission {
        info!("Phase {}: {}", phases_completed + 1, name);

        complete_flag.store(false, Ordering::SeqCst);
        commander
            .send(*cmd)
            .wrap_err("Failed to queue the phase command")?;

        let mut phase_cycles = 0usize;

        while !complete_flag.load(Ordering::SeqCst) {
            // Simulated plant execution
            let (left_ticks, right_ticks) = plant.step(CYCLE_PERIOD_S, &wheel_cmds);

            // Motion control processing
            let (output, _report) = motion_ctrl
                .proc(&motion_lib::motion_ctrl::InputData {
                    period_s: CYCLE_PERIOD_S,
                    left_ticks,
                    right_ticks,
                })
                .wrap_err("MotionCtrl processing failed")?;
            wheel_cmds = output.wheel_cmds;

            // Archive write
            if let Err(e) = motion_ctrl.write() {
                warn!("Could not write archives: {}", e);
            }

            phase_cycles += 1;
            total_cycles += 1;

            if phase_cycles > PHASE_CYCLE_LIMIT {
                return Err(eyre!(
                    "Phase \"{}\" did not complete within {} cycles",
                    name,
                    PHASE_CYCLE_LIMIT
                ));
            }
        }

        phases_completed += 1;
        motion_ctrl.report_orders();

        let (x_m, y_m, heading_rad) = motion_ctrl.pose();
        info!(
            "Phase complete after {} cycles, pose: ({:.3} m, {:.3} m, {:.3} rad)\n",
            phase_cycles, x_m, y_m, heading_rad
        );
    }

    // ---- SPEED-HOLD PHASE ----

    // Held-speed commands run until replaced, so this phase is timed rather
    // than completion-driven: cruise for three simulated seconds, then stop.
    info!("Phase {}: Hold 0.3 m/s, then stop", phases_completed + 1);

    complete_flag.store(false, Ordering::SeqCst);
    commander
        .send(MotionCommand::HoldSpeed {
            speed_ms: 0.3,
            acc_mss: None,
            dec_mss: None,
        })
        .wrap_err("Failed to queue the speed-hold command")?;

    for _ in 0..300 {
        let (left_ticks, right_ticks) = plant.step(CYCLE_PERIOD_S, &wheel_cmds);
        let (output, _report) = motion_ctrl
            .proc(&motion_lib::motion_ctrl::InputData {
                period_s: CYCLE_PERIOD_S,
                left_ticks,
                right_ticks,
            })
            .wrap_err("MotionCtrl processing failed")?;
        wheel_cmds = output.wheel_cmds;

        if let Err(e) = motion_ctrl.write() {
            warn!("Could not write archives: {}", e);
        }

        total_cycles += 1;
    }

    commander
        .send(MotionCommand::Stop)
        .wrap_err("Failed to queue the stop command")?;

    // One more cycle so the stop is adopted and fires the completion sink
    let (left_ticks, right_ticks) = plant.step(CYCLE_PERIOD_S, &wheel_cmds);
    motion_ctrl
        .proc(&motion_lib::motion_ctrl::InputData {
            period_s: CYCLE_PERIOD_S,
            left_ticks,
            right_ticks,
        })
        .wrap_err("MotionCtrl processing failed")?;
    total_cycles += 1;

    if complete_flag.load(Ordering::SeqCst) {
        phases_completed += 1;
    }

    // ---- SHUTDOWN ----

    let (final_x_m, final_y_m, final_heading_rad) = motion_ctrl.pose();
    let summary = MissionSummary {
        phases_completed,
        total_cycles,
        final_x_m,
        final_y_m,
        final_heading_rad,
    };
    session.save("mission_summary.json", &summary);

    info!(
        "Mission complete: {} phases in {} cycles ({:.1} s simulated)",
        phases_completed,
        total_cycles,
        total_cycles as f64 * CYCLE_PERIOD_S
    );

    Ok(())
}
