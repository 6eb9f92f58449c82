//! Benchmark of the cyclic motion control processing.
//!
//! One iteration is one full control tick, closed around the simulated
//! plant, while a joint trajectory is in progress.

use criterion::{criterion_group, criterion_main, Criterion};

use motion_lib::{
    motion_ctrl::{InputData, MotionCommand, MotionCtrl, WheelCommands},
    sim::DiffDrivePlant,
};
use util::module::State;

const PERIOD_S: f64 = 0.01;

fn bench_proc(c: &mut Criterion) {
    let mut ctrl = MotionCtrl::default();
    let mut plant = DiffDrivePlant::new();
    let mut cmds = WheelCommands::default();

    // A long joint move keeps both ramps and servos active for the whole
    // measurement
    ctrl.command(MotionCommand::TranslateRotate {
        dist_m: 1.0e6,
        rot_rad: 1.0e3,
        speed_ms: Some(50.0),
        acc_mss: Some(20.0),
        rate_rads: Some(1.0),
        acc_radss: Some(1.0),
    })
    .unwrap();

    c.bench_function("motion_ctrl_proc", |b| {
        b.iter(|| {
            let (left_ticks, right_ticks) = plant.step(PERIOD_S, &cmds);
            let (output, _) = ctrl
                .proc(&InputData {
                    period_s: PERIOD_S,
                    left_ticks,
                    right_ticks,
                })
                .unwrap();
            cmds = output.wheel_cmds;
        })
    });
}

criterion_group!(benches, bench_proc);
criterion_main!(benches);
