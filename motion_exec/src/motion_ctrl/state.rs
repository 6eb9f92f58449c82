//! Implementations for the MotionCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};
use serde::Serialize;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

// Internal
use super::{
    after_converged, after_ramp_reached, AxisFinalOrder, AxisLimits, AxisMode, AxisOrder,
    AxisState, CompletionSink, LogTm, ModeEdge, MotionCommand, MotionCommander,
    MotionCtrlError, NullCompletion, Params, Telemetry, WheelCombiner, WheelCommands,
    CMD_QUEUE_DEPTH,
};
use crate::odom::{Odometry, WheelOdometry};
use crate::ramp::{RampGenerator, TrapezoidRamp};
use crate::servo_ctrl::{AxisController, ControlErrors, PidServo};
use util::{
    archive::{Archived, Archiver},
    maths::wrap_angle_signed,
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Motion control module state
pub struct MotionCtrl {
    pub(crate) params: Params,

    // Collaborators
    odom: Box<dyn Odometry>,
    ramp: Box<dyn RampGenerator>,
    tm: Box<dyn Telemetry>,
    completion: Box<dyn CompletionSink>,

    // The two controlled axes
    pub(crate) delta: Axis,
    pub(crate) alpha: Axis,

    pub(crate) epsilons: Epsilons,
    combiner: WheelCombiner,
    mode_edge: ModeEdge,

    // Bounded queue carrying commands from other execution contexts,
    // drained at the top of each tick
    cmd_tx: SyncSender<MotionCommand>,
    cmd_rx: Receiver<MotionCommand>,

    output: OutputData,
    report: StatusReport,

    arch_report: Archiver,
    arch_orders: Archiver,
    arch_output: Archiver,
}

/// One controlled axis: measured state, ordered trajectory point, final
/// target, mode, active limits and servo.
pub(crate) struct Axis {
    pub(crate) state: AxisState,
    pub(crate) order: AxisOrder,
    pub(crate) final_order: AxisFinalOrder,
    pub(crate) mode: AxisMode,
    pub(crate) limits: AxisLimits,
    pub(crate) servo: Box<dyn AxisController>,
}

/// Input data to Motion Control for one tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputData {
    /// Length of the control period which produced the encoder increments.
    ///
    /// Units: seconds, must be positive
    pub period_s: f64,

    /// Left encoder increment over the period
    pub left_ticks: i32,

    /// Right encoder increment over the period
    pub right_ticks: i32,
}

/// Output of one tick of Motion Control.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct OutputData {
    /// Translation control effort
    pub delta_effort: f64,

    /// Rotation control effort
    pub alpha_effort: f64,

    /// Combined wheel commands the drive electronics must execute
    pub wheel_cmds: WheelCommands,
}

/// Status report for MotionCtrl processing.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct StatusReport {
    pub delta_mode: AxisMode,
    pub alpha_mode: AxisMode,

    /// True on the tick either axis changed mode
    pub mode_changed: bool,

    /// True on the tick a joint trajectory completed
    pub trajectory_complete: bool,

    /// Queued commands applied this tick
    pub cmds_applied: u8,

    /// Queued commands rejected this tick
    pub cmds_rejected: u8,
}

/// Convergence thresholds, per axis class.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Epsilons {
    /// Translation position epsilon, meters
    pub dist_m: f64,

    /// Translation speed epsilon, meters/second
    pub speed_ms: f64,

    /// Rotation position epsilon, radians
    pub theta_rad: f64,

    /// Rotation rate epsilon, radians/second
    pub omega_rads: f64,
}

/// Error terms of both axis servos.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct MotionErrors {
    pub delta: ControlErrors,
    pub alpha: ControlErrors,
}

/// Flat record of both axis orders for CSV archiving.
#[derive(Serialize)]
struct OrdersRecord {
    delta_pos: f64,
    delta_vel: f64,
    delta_acc: f64,
    alpha_pos: f64,
    alpha_vel: f64,
    alpha_acc: f64,
}

/// Flat record of the tick output for CSV archiving.
#[derive(Serialize)]
struct OutputRecord {
    delta_effort: f64,
    alpha_effort: f64,
    left_cmd: i32,
    right_cmd: i32,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Axis selector for the per-axis stages of the tick.
#[derive(Clone, Copy)]
enum AxisId {
    Delta,
    Alpha,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for MotionCtrl {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl State for MotionCtrl {
    type InitData = &'static str;
    type InitError = MotionCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = MotionCtrlError;

    /// Initialise the MotionCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        // Load the parameters
        let loaded: Params =
            params::load(init_data).map_err(MotionCtrlError::ParamLoadError)?;
        self.reconfigure(loaded);

        // Create the arch folder for motion_ctrl
        let mut arch_path = session.arch_root.clone();
        arch_path.push("motion_ctrl");
        std::fs::create_dir_all(arch_path).unwrap();

        // Initialise the archivers
        self.arch_report =
            Archiver::from_path(session, "motion_ctrl/status_report.csv").unwrap();
        self.arch_orders =
            Archiver::from_path(session, "motion_ctrl/orders.csv").unwrap();
        self.arch_output =
            Archiver::from_path(session, "motion_ctrl/output.csv").unwrap();

        Ok(())
    }

    /// Perform cyclic processing of Motion Control.
    ///
    /// The sequence within one tick is fixed: adopt queued commands,
    /// integrate odometry, report mode edges, advance ramps (delta then
    /// alpha), evaluate both servos, run the convergence checks (delta then
    /// alpha), combine the efforts into wheel commands. Nothing in this
    /// sequence blocks or fails in nominal operation.
    fn proc(&mut self, input: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();

        // Adopt pending commands at the tick boundary. Each command's
        // multi-field update completes before any motion processing, so a
        // tick can never observe a half-applied command.
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            match self.command(cmd) {
                Ok(()) => {
                    self.report.cmds_applied = self.report.cmds_applied.saturating_add(1)
                }
                Err(e) => {
                    warn!("Rejected queued command: {}", e);
                    self.report.cmds_rejected = self.report.cmds_rejected.saturating_add(1);
                }
            }
        }

        // Integrate odometry into the measured axis states
        let (delta_m, alpha_rad) = self.odom.step(input.left_ticks, input.right_ticks);
        self.delta.state.pos += delta_m;
        self.delta.state.vel = delta_m / input.period_s;
        self.alpha.state.pos += alpha_rad;
        self.alpha.state.vel = alpha_rad / input.period_s;

        // Edge-triggered mode telemetry
        if self.mode_edge.changed(self.delta.mode, self.alpha.mode) {
            self.tm.mode_change(self.delta.mode, self.alpha.mode);
            self.report.mode_changed = true;
        }

        // Advance the ramps and run the ramp-completion transitions
        self.ramp_stage(AxisId::Delta, input.period_s);
        self.ramp_stage(AxisId::Alpha, input.period_s);

        // Evaluate both servos against the measured states. An off axis
        // contributes a zero effort.
        let delta_effort =
            self.delta
                .servo
                .step(input.period_s, &self.delta.order, &self.delta.state);
        let alpha_effort =
            self.alpha
                .servo
                .step(input.period_s, &self.alpha.order, &self.alpha.state);

        // Convergence checks and cross-axis promotion
        self.ending_stage(AxisId::Delta);
        self.ending_stage(AxisId::Alpha);

        // Combine the efforts into wheel commands
        let wheel_cmds = self.combiner.combine(delta_effort, alpha_effort);

        let output = OutputData {
            delta_effort,
            alpha_effort,
            wheel_cmds,
        };
        self.output = output;

        self.report.delta_mode = self.delta.mode;
        self.report.alpha_mode = self.alpha.mode;

        trace!(
            "MotionCtrl output: efforts ({:.2}, {:.2}), wheels ({}, {})",
            output.delta_effort,
            output.alpha_effort,
            output.wheel_cmds.left,
            output.wheel_cmds.right
        );

        Ok((output, self.report))
    }
}

impl Archived for MotionCtrl {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;
        self.arch_orders.serialise(OrdersRecord {
            delta_pos: self.delta.order.pos,
            delta_vel: self.delta.order.vel,
            delta_acc: self.delta.order.acc,
            alpha_pos: self.alpha.order.pos,
            alpha_vel: self.alpha.order.vel,
            alpha_acc: self.alpha.order.acc,
        })?;
        self.arch_output.serialise(OutputRecord {
            delta_effort: self.output.delta_effort,
            alpha_effort: self.output.alpha_effort,
            left_cmd: self.output.wheel_cmds.left,
            right_cmd: self.output.wheel_cmds.right,
        })?;

        Ok(())
    }
}

impl MotionCtrl {
    /// Create a controller from the given parameters, with the reference
    /// odometry/ramp/servo implementations, log telemetry and no completion
    /// sink.
    pub fn new(params: Params) -> Self {
        let (cmd_tx, cmd_rx) = sync_channel(CMD_QUEUE_DEPTH);

        let mut ctrl = Self {
            params: Params::default(),
            odom: Box::new(WheelOdometry::new(1.0, 1.0)),
            ramp: Box::new(TrapezoidRamp),
            tm: Box::new(LogTm),
            completion: Box::new(NullCompletion),
            delta: Axis::empty(),
            alpha: Axis::empty(),
            epsilons: Epsilons {
                dist_m: 0.0,
                speed_ms: 0.0,
                theta_rad: 0.0,
                omega_rads: 0.0,
            },
            combiner: WheelCombiner::new(1.0),
            mode_edge: ModeEdge::default(),
            cmd_tx,
            cmd_rx,
            output: OutputData::default(),
            report: StatusReport::default(),
            arch_report: Archiver::default(),
            arch_orders: Archiver::default(),
            arch_output: Archiver::default(),
        };
        ctrl.reconfigure(params);

        ctrl
    }

    /// Rebuild all parameter-derived parts of the controller. Telemetry,
    /// completion sink and the command queue are preserved.
    fn reconfigure(&mut self, params: Params) {
        self.odom = Box::new(WheelOdometry::new(params.ticks_per_m, params.wheel_sep_m));
        self.combiner = WheelCombiner::new(params.wheel_track_gain);

        self.delta = Axis::new(
            PidServo::new(params.delta_pos_gains, params.delta_speed_gains),
            AxisLimits {
                v_max: params.default_speed_ms,
                a_max: params.default_acc_mss,
                d_max: params.default_dec_mss,
            },
        );
        self.alpha = Axis::new(
            PidServo::new(params.alpha_pos_gains, params.alpha_speed_gains),
            AxisLimits {
                v_max: params.default_rate_rads,
                a_max: params.default_rot_acc_radss,
                d_max: params.default_rot_dec_radss,
            },
        );

        self.epsilons = Epsilons {
            dist_m: params.eps_dist_m,
            speed_ms: params.eps_speed_ms,
            theta_rad: params.eps_theta_rad,
            omega_rads: params.eps_omega_rads,
        };

        self.params = params;
    }

    /// Get a cloneable handle for issuing commands from another context.
    pub fn commander(&self) -> MotionCommander {
        MotionCommander {
            sender: self.cmd_tx.clone(),
        }
    }

    /// Register the sink notified when a trajectory completes.
    pub fn set_completion_sink(&mut self, sink: Box<dyn CompletionSink>) {
        self.completion = sink;
    }

    /// Replace the telemetry consumer.
    pub fn set_telemetry(&mut self, tm: Box<dyn Telemetry>) {
        self.tm = tm;
    }

    /// Apply a trajectory command.
    ///
    /// This reconfigures one or both axes' mode, targets and servo tracking
    /// as one unit. It must only be called from the cyclic context; other
    /// contexts go through a [`MotionCommander`], whose queue is drained at
    /// the top of each tick.
    pub fn command(&mut self, cmd: MotionCommand) -> Result<(), MotionCtrlError> {
        trace!("MotionCtrl command: {:?}", cmd);

        match cmd {
            MotionCommand::Translate {
                dist_m,
                speed_ms,
                acc_mss,
            } => {
                let v = speed_ms.unwrap_or(self.params.default_speed_ms);
                let a = acc_mss.unwrap_or(self.params.default_acc_mss);
                self.delta.start_position_ramp(dist_m, v, a);
                self.alpha.hold_zero();
            }

            MotionCommand::TranslateFree { dist_m } => {
                self.delta.start_free_end(dist_m);
                self.alpha.hold_zero();
            }

            MotionCommand::Rotate {
                rot_rad,
                rate_rads,
                acc_radss,
            } => {
                self.delta.hold_zero();
                let v = rate_rads.unwrap_or(self.params.default_rate_rads);
                let a = acc_radss.unwrap_or(self.params.default_rot_acc_radss);
                self.alpha.start_position_ramp(rot_rad, v, a);
            }

            MotionCommand::RotateFree { rot_rad } => {
                self.delta.hold_zero();
                self.alpha.start_free_end(rot_rad);
            }

            MotionCommand::TranslateRotate {
                dist_m,
                rot_rad,
                speed_ms,
                acc_mss,
                rate_rads,
                acc_radss,
            } => {
                let v = speed_ms.unwrap_or(self.params.default_speed_ms);
                let a = acc_mss.unwrap_or(self.params.default_acc_mss);
                self.delta.start_position_ramp(dist_m, v, a);

                let v = rate_rads.unwrap_or(self.params.default_rate_rads);
                let a = acc_radss.unwrap_or(self.params.default_rot_acc_radss);
                self.alpha.start_position_ramp(rot_rad, v, a);
            }

            MotionCommand::HoldSpeed {
                speed_ms,
                acc_mss,
                dec_mss,
            } => {
                let a = acc_mss.unwrap_or(self.params.default_acc_mss);
                let d = dec_mss.unwrap_or(self.params.default_dec_mss);
                self.delta.start_speed_ramp(speed_ms, a, d);
                self.alpha.hold_zero();
            }

            MotionCommand::HoldSpeedFree { speed_ms } => {
                self.delta.hold_speed_direct(speed_ms);
                self.alpha.hold_zero();
            }

            MotionCommand::HoldRate {
                rate_rads,
                acc_radss,
                dec_radss,
            } => {
                self.delta.hold_zero();
                let a = acc_radss.unwrap_or(self.params.default_rot_acc_radss);
                let d = dec_radss.unwrap_or(self.params.default_rot_dec_radss);
                self.alpha.start_speed_ramp(rate_rads, a, d);
            }

            MotionCommand::HoldRateFree { rate_rads } => {
                self.delta.hold_zero();
                self.alpha.hold_speed_direct(rate_rads);
            }

            MotionCommand::HoldSpeedRate {
                speed_ms,
                rate_rads,
                acc_mss,
                dec_mss,
                acc_radss,
                dec_radss,
            } => {
                let a = acc_mss.unwrap_or(self.params.default_acc_mss);
                let d = dec_mss.unwrap_or(self.params.default_dec_mss);
                self.delta.start_speed_ramp(speed_ms, a, d);

                let a = acc_radss.unwrap_or(self.params.default_rot_acc_radss);
                let d = dec_radss.unwrap_or(self.params.default_rot_dec_radss);
                self.alpha.start_speed_ramp(rate_rads, a, d);
            }

            MotionCommand::Stop => {
                self.delta.power_off();
                self.alpha.power_off();

                // Stop always notifies, converged or not
                self.completion.trajectory_complete();
            }

            MotionCommand::HoldInPlace => {
                self.delta.hold_zero();
                self.alpha.hold_zero();
            }

            MotionCommand::ReachX {
                x_m,
                speed_ms,
                acc_mss,
            } => {
                let heading_rad = self.odom.heading_rad();
                let divisor = heading_rad.cos();

                if divisor.abs() < self.params.min_reach_divisor {
                    return Err(MotionCtrlError::SingularHeading { heading_rad });
                }

                let dist_m = (x_m - self.odom.x_m()) / divisor;
                return self.command(MotionCommand::TranslateRotate {
                    dist_m,
                    rot_rad: 0.0,
                    speed_ms,
                    acc_mss,
                    rate_rads: None,
                    acc_radss: None,
                });
            }

            MotionCommand::ReachY {
                y_m,
                speed_ms,
                acc_mss,
            } => {
                let heading_rad = self.odom.heading_rad();
                let divisor = heading_rad.sin();

                if divisor.abs() < self.params.min_reach_divisor {
                    return Err(MotionCtrlError::SingularHeading { heading_rad });
                }

                let dist_m = (y_m - self.odom.y_m()) / divisor;
                return self.command(MotionCommand::TranslateRotate {
                    dist_m,
                    rot_rad: 0.0,
                    speed_ms,
                    acc_mss,
                    rate_rads: None,
                    acc_radss: None,
                });
            }

            MotionCommand::ReachHeading {
                heading_rad,
                rate_rads,
                acc_radss,
            } => {
                // Shortest signed rotation, in (-pi, pi]
                let rot_rad = wrap_angle_signed(heading_rad - self.odom.heading_rad());
                return self.command(MotionCommand::TranslateRotate {
                    dist_m: 0.0,
                    rot_rad,
                    speed_ms: None,
                    acc_mss: None,
                    rate_rads,
                    acc_radss,
                });
            }

            MotionCommand::SetEpsilons {
                eps_dist_m,
                eps_speed_ms,
                eps_theta_rad,
                eps_omega_rads,
            } => {
                self.epsilons = Epsilons {
                    dist_m: eps_dist_m,
                    speed_ms: eps_speed_ms,
                    theta_rad: eps_theta_rad,
                    omega_rads: eps_omega_rads,
                };
            }
        }

        Ok(())
    }

    /// Current mode of the (delta, alpha) axes.
    pub fn modes(&self) -> (AxisMode, AxisMode) {
        (self.delta.mode, self.alpha.mode)
    }

    /// Current error terms of both servos.
    pub fn errors(&self) -> MotionErrors {
        MotionErrors {
            delta: self.delta.servo.errors(),
            alpha: self.alpha.servo.errors(),
        }
    }

    /// Last computed efforts and wheel commands, without recomputation.
    pub fn last_output(&self) -> OutputData {
        self.output
    }

    /// Current convergence thresholds.
    pub fn epsilons(&self) -> Epsilons {
        self.epsilons
    }

    /// Absolute pose estimate `(x_m, y_m, heading_rad)` from odometry.
    pub fn pose(&self) -> (f64, f64, f64) {
        (self.odom.x_m(), self.odom.y_m(), self.odom.heading_rad())
    }

    /// Measured state of the translation axis.
    pub fn delta_state(&self) -> AxisState {
        self.delta.state
    }

    /// Measured state of the rotation axis.
    pub fn alpha_state(&self) -> AxisState {
        self.alpha.state
    }

    /// Emit both axes' current orders to telemetry, for debugging.
    pub fn report_orders(&mut self) {
        let delta_order = self.delta.order;
        let alpha_order = self.alpha.order;
        self.tm.orders(&delta_order, &alpha_order);
    }

    /// Ramp advancement and ramp-completion transitions for one axis.
    fn ramp_stage(&mut self, id: AxisId, period_s: f64) {
        let (own, partner) = match id {
            AxisId::Delta => (&mut self.delta, &mut self.alpha),
            AxisId::Alpha => (&mut self.alpha, &mut self.delta),
        };

        match own.mode {
            AxisMode::RampPosition => {
                let reached = self.ramp.advance_position(
                    period_s,
                    &mut own.order,
                    &own.final_order,
                    own.limits.v_max,
                    own.limits.a_max,
                );

                if reached {
                    let (own_mode, partner_mode) = after_ramp_reached(partner.mode);
                    own.mode = own_mode;
                    partner.mode = partner_mode;
                }
            }
            AxisMode::RampSpeed => {
                self.ramp.advance_velocity(
                    period_s,
                    &mut own.order,
                    own.final_order.vel,
                    own.limits.a_max,
                    own.limits.v_max,
                    own.limits.d_max,
                );
            }
            _ => (),
        }
    }

    /// `Ending` convergence check and cross-axis promotion for one axis.
    fn ending_stage(&mut self, id: AxisId) {
        let (own, partner, pos_eps, speed_eps) = match id {
            AxisId::Delta => (
                &mut self.delta,
                &mut self.alpha,
                self.epsilons.dist_m,
                self.epsilons.speed_ms,
            ),
            AxisId::Alpha => (
                &mut self.alpha,
                &mut self.delta,
                self.epsilons.theta_rad,
                self.epsilons.omega_rads,
            ),
        };

        if own.mode != AxisMode::Ending || !own.servo.converged(pos_eps, speed_eps) {
            return;
        }

        let (own_mode, partner_mode, complete) = after_converged(partner.mode);
        own.mode = own_mode;
        own.servo.disable();
        partner.mode = partner_mode;

        if complete {
            let delta_order = self.delta.order;
            let alpha_order = self.alpha.order;
            self.tm.orders(&delta_order, &alpha_order);
            self.completion.trajectory_complete();
            self.report.trajectory_complete = true;
        }
    }
}

impl Axis {
    /// An axis with no gains and zero limits, used only as a placeholder
    /// before `reconfigure` runs.
    fn empty() -> Self {
        Self::new(
            PidServo::new(Default::default(), Default::default()),
            AxisLimits::default(),
        )
    }

    fn new(servo: PidServo, default_limits: AxisLimits) -> Self {
        Self {
            state: AxisState::default(),
            order: AxisOrder::default(),
            final_order: AxisFinalOrder::default(),
            mode: AxisMode::Off,
            limits: default_limits,
            servo: Box::new(servo),
        }
    }

    /// Hold zero position indefinitely (powered hold).
    fn hold_zero(&mut self) {
        self.mode = AxisMode::Fixed;
        self.state.pos = 0.0;
        self.order.pos = 0.0;
        self.order.vel = 0.0;
        self.servo.set_position_tracking();
    }

    /// Begin a ramped move to `target`, measured from the current position.
    ///
    /// The ordered velocity is deliberately left alone so that a move
    /// issued while the axis is still rolling enters the ramp at the
    /// current ordered speed.
    fn start_position_ramp(&mut self, target: f64, v_max: f64, a_max: f64) {
        self.limits.v_max = v_max;
        self.limits.a_max = a_max;
        self.mode = AxisMode::RampPosition;
        self.state.pos = 0.0;
        self.order.pos = 0.0;
        self.final_order.pos = target;
        self.final_order.vel = 0.0;
        self.servo.set_position_tracking();
    }

    /// Converge directly on `target` with no ramp.
    fn start_free_end(&mut self, target: f64) {
        self.mode = AxisMode::Ending;
        self.state.pos = 0.0;
        self.order.pos = target;
        self.order.vel = 0.0;
        self.servo.set_position_tracking();
    }

    /// Begin ramping toward a held velocity. The speed bound is the target
    /// magnitude.
    fn start_speed_ramp(&mut self, target_vel: f64, a_max: f64, d_max: f64) {
        self.limits.v_max = target_vel.abs();
        self.limits.a_max = a_max;
        self.limits.d_max = d_max;
        self.mode = AxisMode::RampSpeed;
        self.final_order.vel = target_vel;
        self.servo.set_velocity_tracking();
    }

    /// Hold a velocity set directly, with no ramp.
    fn hold_speed_direct(&mut self, target_vel: f64) {
        self.mode = AxisMode::Fixed;
        self.order.vel = target_vel;
        self.servo.set_velocity_tracking();
    }

    /// Power the axis off.
    fn power_off(&mut self) {
        self.mode = AxisMode::Off;
        self.order.vel = 0.0;
        self.servo.disable();
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {

    // Closed-loop scenarios: the controller drives the simulated plant and
    // must converge within realistic tick budgets.

    use super::*;
    use crate::sim::DiffDrivePlant;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const PERIOD_S: f64 = 0.01;

    /// Completion sink which counts notifications.
    struct CountingSink(Arc<AtomicUsize>);

    impl CompletionSink for CountingSink {
        fn trajectory_complete(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_ctrl() -> (MotionCtrl, Arc<AtomicUsize>) {
        let mut ctrl = MotionCtrl::default();
        let completions = Arc::new(AtomicUsize::new(0));
        ctrl.set_completion_sink(Box::new(CountingSink(completions.clone())));
        (ctrl, completions)
    }

    /// Run the controller against the plant until both axes power off, or
    /// the tick budget runs out. Returns the number of ticks executed.
    fn run_to_off(
        ctrl: &mut MotionCtrl,
        plant: &mut DiffDrivePlant,
        max_ticks: usize,
    ) -> usize {
        let mut cmds = WheelCommands::default();

        for tick in 0..max_ticks {
            let (left, right) = plant.step(PERIOD_S, &cmds);
            let (output, _) = ctrl
                .proc(&InputData {
                    period_s: PERIOD_S,
                    left_ticks: left,
                    right_ticks: right,
                })
                .unwrap();
            cmds = output.wheel_cmds;

            if ctrl.modes() == (AxisMode::Off, AxisMode::Off) {
                return tick;
            }
        }

        max_ticks
    }

    #[test]
    fn test_translate_converges_and_notifies_once() {
        let (mut ctrl, completions) = test_ctrl();
        let mut plant = DiffDrivePlant::default();

        ctrl.command(MotionCommand::Translate {
            dist_m: 100.0,
            speed_ms: Some(50.0),
            acc_mss: Some(20.0),
        })
        .unwrap();
        assert_eq!(ctrl.modes(), (AxisMode::RampPosition, AxisMode::Fixed));

        let ticks = run_to_off(&mut ctrl, &mut plant, 3000);

        assert!(ticks < 3000, "did not power off within the budget");
        assert_eq!(ctrl.modes(), (AxisMode::Off, AxisMode::Off));
        assert_eq!(completions.load(Ordering::SeqCst), 1);

        // Measured distance within tolerance of the target. The last
        // in-flight commands can add up to an epsilon of extra motion after
        // the convergence check passes.
        let eps = ctrl.epsilons();
        assert!(
            (ctrl.delta_state().pos - 100.0).abs() <= 2.0 * eps.dist_m,
            "final distance {} out of tolerance",
            ctrl.delta_state().pos
        );
    }

    #[test]
    fn test_translate_drives_wheels_equally() {
        let (mut ctrl, _) = test_ctrl();
        let mut plant = DiffDrivePlant::default();

        ctrl.command(MotionCommand::Translate {
            dist_m: 2.0,
            speed_ms: None,
            acc_mss: None,
        })
        .unwrap();

        let mut cmds = WheelCommands::default();
        for _ in 0..800 {
            let (left, right) = plant.step(PERIOD_S, &cmds);
            let (output, _) = ctrl
                .proc(&InputData {
                    period_s: PERIOD_S,
                    left_ticks: left,
                    right_ticks: right,
                })
                .unwrap();
            cmds = output.wheel_cmds;

            // A pure translation must never steer
            assert_eq!(cmds.left, cmds.right);
        }

        // And the heading must never have moved
        assert_eq!(ctrl.alpha_state().pos, 0.0);
    }

    #[test]
    fn test_translate_rotate_first_finisher_holds_fixed() {
        let (mut ctrl, completions) = test_ctrl();
        let mut plant = DiffDrivePlant::default();

        // Rotation finishes its ramp well before the long translation
        ctrl.command(MotionCommand::TranslateRotate {
            dist_m: 100.0,
            rot_rad: std::f64::consts::FRAC_PI_2,
            speed_ms: Some(50.0),
            acc_mss: Some(20.0),
            rate_rads: Some(1.0),
            acc_radss: Some(1.0),
        })
        .unwrap();
        assert_eq!(
            ctrl.modes(),
            (AxisMode::RampPosition, AxisMode::RampPosition)
        );

        let mut saw_alpha_fixed_while_delta_ramping = false;
        let mut cmds = WheelCommands::default();
        let mut off_at = None;

        for tick in 0..5000 {
            let (left, right) = plant.step(PERIOD_S, &cmds);
            let (output, _) = ctrl
                .proc(&InputData {
                    period_s: PERIOD_S,
                    left_ticks: left,
                    right_ticks: right,
                })
                .unwrap();
            cmds = output.wheel_cmds;

            if ctrl.modes() == (AxisMode::RampPosition, AxisMode::Fixed) {
                saw_alpha_fixed_while_delta_ramping = true;
            }
            if ctrl.modes() == (AxisMode::Off, AxisMode::Off) {
                off_at = Some(tick);
                break;
            }
        }

        assert!(
            saw_alpha_fixed_while_delta_ramping,
            "rotation axis never held Fixed while waiting for translation"
        );
        assert!(off_at.is_some(), "did not power off within the budget");
        assert_eq!(completions.load(Ordering::SeqCst), 1);

        let eps = ctrl.epsilons();
        assert!(
            (ctrl.alpha_state().pos - std::f64::consts::FRAC_PI_2).abs()
                <= 2.0 * eps.theta_rad
        );
    }

    #[test]
    fn test_hold_speed_reaches_target_and_stop_notifies() {
        let (mut ctrl, completions) = test_ctrl();
        let mut plant = DiffDrivePlant::default();

        ctrl.command(MotionCommand::HoldSpeed {
            speed_ms: 0.3,
            acc_mss: None,
            dec_mss: None,
        })
        .unwrap();
        assert_eq!(ctrl.modes(), (AxisMode::RampSpeed, AxisMode::Fixed));

        // Encoder quantisation makes the instantaneous measured speed jump
        // in 0.1 m/s steps, so judge the mean over the tail of the run.
        let mut cmds = WheelCommands::default();
        let mut tail_vel_sum = 0.0;

        for tick in 0..500 {
            let (left, right) = plant.step(PERIOD_S, &cmds);
            let (output, _) = ctrl
                .proc(&InputData {
                    period_s: PERIOD_S,
                    left_ticks: left,
                    right_ticks: right,
                })
                .unwrap();
            cmds = output.wheel_cmds;

            if tick >= 400 {
                tail_vel_sum += ctrl.delta_state().vel;
            }
        }

        let mean_vel = tail_vel_sum / 100.0;
        assert!(
            (mean_vel - 0.3).abs() < 0.02,
            "held speed {} too far from target",
            mean_vel
        );
        assert_eq!(ctrl.modes(), (AxisMode::RampSpeed, AxisMode::Fixed));
        assert_eq!(completions.load(Ordering::SeqCst), 0);

        // Stop powers off immediately and notifies unconditionally
        ctrl.command(MotionCommand::Stop).unwrap();
        assert_eq!(ctrl.modes(), (AxisMode::Off, AxisMode::Off));
        assert_eq!(completions.load(Ordering::SeqCst), 1);

        let (output, _) = ctrl
            .proc(&InputData {
                period_s: PERIOD_S,
                left_ticks: 3,
                right_ticks: 3,
            })
            .unwrap();
        assert_eq!(output.wheel_cmds, WheelCommands::default());
    }

    #[test]
    fn test_hold_rate_spins_in_place() {
        let (mut ctrl, _) = test_ctrl();
        let mut plant = DiffDrivePlant::default();

        ctrl.command(MotionCommand::HoldRate {
            rate_rads: 0.5,
            acc_radss: None,
            dec_radss: None,
        })
        .unwrap();
        assert_eq!(ctrl.modes(), (AxisMode::Fixed, AxisMode::RampSpeed));

        let mut cmds = WheelCommands::default();
        let mut tail_rate_sum = 0.0;

        for tick in 0..500 {
            let (left, right) = plant.step(PERIOD_S, &cmds);
            let (output, _) = ctrl
                .proc(&InputData {
                    period_s: PERIOD_S,
                    left_ticks: left,
                    right_ticks: right,
                })
                .unwrap();
            cmds = output.wheel_cmds;

            if tick >= 400 {
                tail_rate_sum += ctrl.alpha_state().vel;
            }
        }

        let mean_rate = tail_rate_sum / 100.0;
        assert!(
            (mean_rate - 0.5).abs() < 0.1,
            "held rate {} too far from target",
            mean_rate
        );

        // The translation axis must have been held near zero
        let eps = ctrl.epsilons();
        assert!(ctrl.delta_state().pos.abs() < 10.0 * eps.dist_m);
    }

    #[test]
    fn test_none_overrides_match_explicit_defaults() {
        let (mut a, _) = test_ctrl();
        let (mut b, _) = test_ctrl();

        a.command(MotionCommand::Translate {
            dist_m: 2.0,
            speed_ms: None,
            acc_mss: None,
        })
        .unwrap();
        b.command(MotionCommand::Translate {
            dist_m: 2.0,
            speed_ms: Some(a.params.default_speed_ms),
            acc_mss: Some(a.params.default_acc_mss),
        })
        .unwrap();

        assert_eq!(a.modes(), b.modes());
        assert_eq!(a.delta.limits.v_max, b.delta.limits.v_max);
        assert_eq!(a.delta.limits.a_max, b.delta.limits.a_max);
        assert_eq!(a.delta.final_order.pos, b.delta.final_order.pos);
        assert_eq!(a.delta.final_order.vel, b.delta.final_order.vel);
    }

    #[test]
    fn test_hold_in_place_is_idempotent() {
        let (mut ctrl, completions) = test_ctrl();

        ctrl.command(MotionCommand::HoldInPlace).unwrap();
        assert_eq!(ctrl.modes(), (AxisMode::Fixed, AxisMode::Fixed));
        assert_eq!(ctrl.delta.order.pos, 0.0);
        assert_eq!(ctrl.alpha.order.pos, 0.0);

        ctrl.command(MotionCommand::HoldInPlace).unwrap();
        assert_eq!(ctrl.modes(), (AxisMode::Fixed, AxisMode::Fixed));
        assert_eq!(ctrl.delta.order.pos, 0.0);
        assert_eq!(ctrl.alpha.order.pos, 0.0);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reach_heading_takes_shortest_rotation() {
        let (mut ctrl, _) = test_ctrl();

        // From heading zero, 3pi/2 is reached quickest by turning -pi/2
        ctrl.command(MotionCommand::ReachHeading {
            heading_rad: 3.0 * std::f64::consts::FRAC_PI_2,
            rate_rads: None,
            acc_radss: None,
        })
        .unwrap();
        assert!(
            (ctrl.alpha.final_order.pos + std::f64::consts::FRAC_PI_2).abs() < 1e-9
        );

        // Exactly pi maps to +pi, not -pi
        let (mut ctrl, _) = test_ctrl();
        ctrl.command(MotionCommand::ReachHeading {
            heading_rad: std::f64::consts::PI,
            rate_rads: None,
            acc_radss: None,
        })
        .unwrap();
        assert!((ctrl.alpha.final_order.pos - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_reach_x_computes_distance_along_heading() {
        let (mut ctrl, _) = test_ctrl();

        // Heading zero, robot at the origin: reaching x = 2 is a 2 m drive
        ctrl.command(MotionCommand::ReachX {
            x_m: 2.0,
            speed_ms: None,
            acc_mss: None,
        })
        .unwrap();
        assert!((ctrl.delta.final_order.pos - 2.0).abs() < 1e-9);
        assert_eq!(ctrl.delta.mode, AxisMode::RampPosition);
    }

    #[test]
    fn test_reach_x_rejected_when_heading_singular() {
        let (mut ctrl, _) = test_ctrl();
        let mut plant = DiffDrivePlant::default();

        // Point the robot along +Y first
        ctrl.command(MotionCommand::Rotate {
            rot_rad: std::f64::consts::FRAC_PI_2,
            rate_rads: None,
            acc_radss: None,
        })
        .unwrap();
        let ticks = run_to_off(&mut ctrl, &mut plant, 3000);
        assert!(ticks < 3000, "rotation did not converge");

        // x is now unreachable, y is fine
        let result = ctrl.command(MotionCommand::ReachX {
            x_m: 1.0,
            speed_ms: None,
            acc_mss: None,
        });
        assert!(matches!(
            result,
            Err(MotionCtrlError::SingularHeading { .. })
        ));
        assert_eq!(ctrl.modes(), (AxisMode::Off, AxisMode::Off));

        ctrl.command(MotionCommand::ReachY {
            y_m: 1.0,
            speed_ms: None,
            acc_mss: None,
        })
        .unwrap();
        assert_eq!(ctrl.delta.mode, AxisMode::RampPosition);
    }

    #[test]
    fn test_queued_commands_applied_at_tick_start() {
        let (mut ctrl, _) = test_ctrl();
        let commander = ctrl.commander();

        commander
            .send(MotionCommand::Translate {
                dist_m: 1.0,
                speed_ms: None,
                acc_mss: None,
            })
            .unwrap();

        // Nothing applied until the next tick
        assert_eq!(ctrl.modes(), (AxisMode::Off, AxisMode::Off));

        let (_, report) = ctrl
            .proc(&InputData {
                period_s: PERIOD_S,
                left_ticks: 0,
                right_ticks: 0,
            })
            .unwrap();

        assert_eq!(report.cmds_applied, 1);
        assert_eq!(report.cmds_rejected, 0);
        assert_eq!(ctrl.modes(), (AxisMode::RampPosition, AxisMode::Fixed));
    }

    #[test]
    fn test_queued_singular_command_rejected_in_report() {
        let (mut ctrl, _) = test_ctrl();
        let mut plant = DiffDrivePlant::default();

        ctrl.command(MotionCommand::Rotate {
            rot_rad: std::f64::consts::FRAC_PI_2,
            rate_rads: None,
            acc_radss: None,
        })
        .unwrap();
        run_to_off(&mut ctrl, &mut plant, 3000);

        let commander = ctrl.commander();
        commander
            .send(MotionCommand::ReachX {
                x_m: 1.0,
                speed_ms: None,
                acc_mss: None,
            })
            .unwrap();

        let (_, report) = ctrl
            .proc(&InputData {
                period_s: PERIOD_S,
                left_ticks: 0,
                right_ticks: 0,
            })
            .unwrap();

        assert_eq!(report.cmds_applied, 0);
        assert_eq!(report.cmds_rejected, 1);
        assert_eq!(ctrl.modes(), (AxisMode::Off, AxisMode::Off));
    }

    #[test]
    fn test_translate_free_converges_without_ramp() {
        let (mut ctrl, completions) = test_ctrl();
        let mut plant = DiffDrivePlant::default();

        ctrl.command(MotionCommand::TranslateFree { dist_m: 0.5 }).unwrap();
        assert_eq!(ctrl.modes(), (AxisMode::Ending, AxisMode::Fixed));

        let ticks = run_to_off(&mut ctrl, &mut plant, 3000);
        assert!(ticks < 3000, "free translation did not converge");
        assert_eq!(completions.load(Ordering::SeqCst), 1);

        let eps = ctrl.epsilons();
        assert!((ctrl.delta_state().pos - 0.5).abs() <= 2.0 * eps.dist_m);
    }

    #[test]
    fn test_free_and_joint_hold_command_modes() {
        let (mut ctrl, _) = test_ctrl();
        ctrl.command(MotionCommand::RotateFree { rot_rad: 0.3 }).unwrap();
        assert_eq!(ctrl.modes(), (AxisMode::Fixed, AxisMode::Ending));
        assert_eq!(ctrl.alpha.order.pos, 0.3);

        let (mut ctrl, _) = test_ctrl();
        ctrl.command(MotionCommand::HoldSpeedFree { speed_ms: 0.2 }).unwrap();
        assert_eq!(ctrl.modes(), (AxisMode::Fixed, AxisMode::Fixed));
        assert_eq!(ctrl.delta.order.vel, 0.2);

        let (mut ctrl, _) = test_ctrl();
        ctrl.command(MotionCommand::HoldRateFree { rate_rads: -0.4 }).unwrap();
        assert_eq!(ctrl.modes(), (AxisMode::Fixed, AxisMode::Fixed));
        assert_eq!(ctrl.alpha.order.vel, -0.4);

        let (mut ctrl, _) = test_ctrl();
        ctrl.command(MotionCommand::HoldSpeedRate {
            speed_ms: 0.2,
            rate_rads: 0.5,
            acc_mss: None,
            dec_mss: None,
            acc_radss: None,
            dec_radss: None,
        })
        .unwrap();
        assert_eq!(ctrl.modes(), (AxisMode::RampSpeed, AxisMode::RampSpeed));
        assert_eq!(ctrl.delta.final_order.vel, 0.2);
        assert_eq!(ctrl.alpha.final_order.vel, 0.5);
    }

    #[test]
    fn test_set_epsilons_command() {
        let (mut ctrl, _) = test_ctrl();

        ctrl.command(MotionCommand::SetEpsilons {
            eps_dist_m: 0.2,
            eps_speed_ms: 0.3,
            eps_theta_rad: 0.4,
            eps_omega_rads: 0.5,
        })
        .unwrap();

        let eps = ctrl.epsilons();
        assert_eq!(eps.dist_m, 0.2);
        assert_eq!(eps.speed_ms, 0.3);
        assert_eq!(eps.theta_rad, 0.4);
        assert_eq!(eps.omega_rads, 0.5);
    }

    #[test]
    fn test_mode_changes_reported_edge_triggered() {
        let (mut ctrl, _) = test_ctrl();

        // First tick reports the initial modes as an edge
        let (_, report) = ctrl
            .proc(&InputData {
                period_s: PERIOD_S,
                left_ticks: 0,
                right_ticks: 0,
            })
            .unwrap();
        assert!(report.mode_changed);

        // No transition, no report
        let (_, report) = ctrl
            .proc(&InputData {
                period_s: PERIOD_S,
                left_ticks: 0,
                right_ticks: 0,
            })
            .unwrap();
        assert!(!report.mode_changed);

        // A command's mode change shows up on the following tick
        ctrl.command(MotionCommand::HoldInPlace).unwrap();
        let (_, report) = ctrl
            .proc(&InputData {
                period_s: PERIOD_S,
                left_ticks: 0,
                right_ticks: 0,
            })
            .unwrap();
        assert!(report.mode_changed);
    }

    #[test]
    fn test_queries_reflect_last_tick() {
        let (mut ctrl, _) = test_ctrl();

        ctrl.command(MotionCommand::Translate {
            dist_m: 1.0,
            speed_ms: None,
            acc_mss: None,
        })
        .unwrap();

        let (output, _) = ctrl
            .proc(&InputData {
                period_s: PERIOD_S,
                left_ticks: 0,
                right_ticks: 0,
            })
            .unwrap();

        let last = ctrl.last_output();
        assert_eq!(last.wheel_cmds, output.wheel_cmds);

        // The translation servo is chasing a non-zero ramp order
        let errors = ctrl.errors();
        assert!(errors.delta.error.abs() > 0.0);
        assert_eq!(errors.alpha.error, 0.0);
    }
}
