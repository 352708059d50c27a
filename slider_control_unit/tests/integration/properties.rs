//! Integration test: invariants that must hold for any input.

use slider_common::axis::{AxisArray, AxisId, AxisValue};
use slider_common::control_unit::bank::InterpPoint;
use slider_common::control_unit::command::{Command, CommandOutcome, ZeroMask};
use slider_common::control_unit::error::CommandError;
use slider_control_unit::control::joystick::shape_input;
use slider_control_unit::control::profile::min_move_time;

use super::common::{Rig, fast_tilt_config, steps, values};

#[test]
fn absolute_writes_always_clamp() {
    let mut rig = Rig::new();
    let cases = [
        (-3.0, 0),
        (-0.1, 0),
        (0.0, 0),
        (0.3, 30_000),
        (0.999, 99_900),
        (1.0, 100_000),
        (1.7, 100_000),
        (f64::INFINITY, 100_000),
        (f64::NEG_INFINITY, 0),
    ];
    for (x, expected) in cases {
        rig.ok(Command::AbsoluteMove { axis: AxisId::Tilt, value: AxisValue::Normalized(x) });
        assert_eq!(rig.target(AxisId::Tilt), expected, "input {x}");
    }

    for s in [i64::MIN, -1, 0, 42_000, 100_000, 100_001, i64::MAX] {
        rig.ok(Command::AbsoluteMove { axis: AxisId::Zoom, value: AxisValue::Steps(s) });
        assert_eq!(rig.target(AxisId::Zoom), s.clamp(0, 100_000));
    }
}

#[test]
fn nan_holds_current_target() {
    let mut rig = Rig::new();
    rig.ok(Command::AbsoluteMove { axis: AxisId::Pan, value: AxisValue::Steps(1_234) });
    rig.ok(Command::AbsoluteMove { axis: AxisId::Pan, value: AxisValue::Normalized(f64::NAN) });
    assert_eq!(rig.target(AxisId::Pan), 1_234);
}

#[test]
fn sync_duration_never_below_request_or_feasible() {
    let requests = [None, Some(0), Some(300), Some(2_000), Some(2_600), Some(12_000)];
    let targets = [
        steps(&[(AxisId::Pan, 50_000), (AxisId::Tilt, 75_000)]),
        steps(&[(AxisId::Zoom, 100)]),
        steps(&[(AxisId::Pan, 100_000), (AxisId::Slide, 3)]),
        steps(&[(AxisId::Tilt, 0)]),
    ];
    for target in &targets {
        for requested in requests {
            let mut rig = Rig::with_config(fast_tilt_config());
            let outcome = rig
                .send(Command::SynchronizedMove { targets: *target, duration_ms: requested })
                .unwrap();
            let CommandOutcome::Move(report) = outcome else { panic!("{outcome:?}") };

            assert!(report.actual_duration_ms >= requested.unwrap_or(0));
            assert_eq!(
                report.duration_adjusted,
                report.actual_duration_ms > requested.unwrap_or(0) && requested.is_some()
            );
            // A zero-length job may already be complete after its own tick.
            let Some(job) = rig.c.scheduler().job() else {
                assert!(report.actual_duration_ms <= 10);
                continue;
            };
            for (axis, leg) in job.legs.present() {
                let feasible_ms = leg.min_time * 1000.0;
                assert!(
                    f64::from(report.actual_duration_ms) + 1e-6 >= feasible_ms,
                    "{axis}: {} ms < {feasible_ms} ms",
                    report.actual_duration_ms
                );
                // Every axis starts at 0, so the target is the distance.
                let stretched = min_move_time(leg.target as f64, leg.limits) * 1000.0;
                assert!(stretched <= f64::from(report.actual_duration_ms) + 1.0);
            }
        }
    }
}

fn three_point_path(rig: &mut Rig) {
    rig.ok(Command::PresetSet {
        index: 0,
        positions: steps(&[(AxisId::Pan, 100), (AxisId::Tilt, 90_000), (AxisId::Zoom, 7)]),
    });
    rig.ok(Command::PresetSet {
        index: 5,
        positions: steps(&[(AxisId::Pan, 33_333), (AxisId::Tilt, 10_000), (AxisId::Zoom, 8)]),
    });
    rig.ok(Command::PresetSet {
        index: 9,
        positions: steps(&[(AxisId::Pan, 99_999), (AxisId::Tilt, 10_001), (AxisId::Zoom, 100_000)]),
    });
    rig.ok(Command::InterpSetpoints {
        points: vec![
            InterpPoint { preset_index: 0, fraction: 0.1 },
            InterpPoint { preset_index: 5, fraction: 0.4 },
            InterpPoint { preset_index: 9, fraction: 0.85 },
        ],
    });
}

#[test]
fn goto_setpoint_fraction_reproduces_preset() {
    let mut rig = Rig::new();
    three_point_path(&mut rig);
    for (fraction, preset) in [(0.1, 0u8), (0.4, 5), (0.85, 9)] {
        rig.ok(Command::InterpGoto { fraction });
        let stored = rig.c.banks().preset(preset).copied().unwrap();
        for axis in [AxisId::Pan, AxisId::Tilt, AxisId::Zoom] {
            assert_eq!(Some(rig.target(axis)), stored.get(axis), "f={fraction} {axis}");
        }
    }
    // Outside the first and last setpoint the path clamps.
    rig.ok(Command::InterpGoto { fraction: 0.0 });
    assert_eq!(rig.target(AxisId::Pan), 100);
    rig.ok(Command::InterpGoto { fraction: 1.0 });
    assert_eq!(rig.target(AxisId::Pan), 99_999);
}

#[test]
fn interpolation_monotonic_within_bracket() {
    let mut rig = Rig::new();
    three_point_path(&mut rig);
    let interp = rig.c.interp();
    for (lo, hi) in [(0.1, 0.4), (0.4, 0.85)] {
        let a = interp.evaluate(lo);
        let b = interp.evaluate(hi);
        let mut previous = a;
        for i in 1..=200 {
            let f = lo + (hi - lo) * f64::from(i) / 200.0;
            let now = interp.evaluate(f);
            for axis in [AxisId::Pan, AxisId::Tilt, AxisId::Zoom] {
                let (start, end) = (a[axis].unwrap(), b[axis].unwrap());
                let (p, n) = (previous[axis].unwrap(), now[axis].unwrap());
                if end >= start {
                    assert!(n >= p && n <= end, "{axis} f={f}");
                } else {
                    assert!(n <= p && n >= end, "{axis} f={f}");
                }
            }
            previous = now;
        }
    }
}

#[test]
fn add_bake_zero_all_keeps_every_output() {
    let mut rig = Rig::new();
    rig.ok(Command::SynchronizedMove {
        targets: steps(&[
            (AxisId::Pan, 10_000),
            (AxisId::Tilt, 20_000),
            (AxisId::Zoom, 30_000),
            (AxisId::Slide, 40_000),
        ]),
        duration_ms: None,
    });
    rig.ok(Command::OffsetAdd { deltas: AxisArray([120, -75, 3, -900]) });
    rig.ok(Command::OffsetBake);
    let baked: Vec<i64> = AxisId::ALL.iter().map(|&a| rig.c.output(a)).collect();
    rig.ok(Command::OffsetZero(ZeroMask::ALL));
    let zeroed: Vec<i64> = AxisId::ALL.iter().map(|&a| rig.c.output(a)).collect();
    assert_eq!(baked, zeroed);
    assert_eq!(zeroed, vec![10_120, 19_925, 30_003, 39_100]);
}

#[test]
fn deadzone_boundary_is_continuous() {
    for deadzone in [0.0, 0.05, 0.2, 0.5] {
        for expo in [0.0, 0.3, 0.95] {
            for sign in [1.0, -1.0] {
                let below = shape_input(sign * (deadzone - 1e-9), deadzone, expo);
                let at = shape_input(sign * deadzone, deadzone, expo);
                let above = shape_input(sign * (deadzone + 1e-9), deadzone, expo);
                assert!((above - below).abs() < 1e-8, "dz={deadzone} expo={expo}");
                assert!(at.abs() < 1e-8);
            }
        }
    }
}

#[test]
fn shaped_output_is_odd_and_monotonic() {
    let mut last = -1.0;
    for i in 0..=400 {
        let r = -1.0 + f64::from(i) / 200.0;
        let out = shape_input(r, 0.1, 0.6);
        assert!(out >= last - 1e-12);
        assert!((out + shape_input(-r, 0.1, 0.6)).abs() < 1e-12);
        last = out;
    }
    assert!((shape_input(1.0, 0.1, 0.6) - 1.0).abs() < 1e-12);
}

#[test]
fn rejected_command_has_no_effect_on_running_motion() {
    let mut rig = Rig::new();
    rig.ok(Command::SynchronizedMove {
        targets: values(&[(AxisId::Pan, AxisValue::Normalized(1.0))]),
        duration_ms: Some(5_000),
    });
    rig.run_ms(200);
    let before = rig.c.scheduler().job().cloned();

    assert!(rig.send(Command::BankSelect { index: 10 }).is_err());
    assert!(rig.send(Command::PresetRecall { index: 3, duration_ms: None }).is_err());
    assert!(rig.send(Command::HomingThreshold { value: 999 }).is_err());

    let after = rig.c.scheduler().job().unwrap();
    assert_eq!(after.legs, before.unwrap().legs);
    assert_eq!(rig.c.banks().active_index(), 0);
    assert_eq!(rig.c.homing().threshold(), 40);
    assert!(rig.c.driver().stepper(AxisId::Pan).is_moving());
}

#[test]
fn overflowing_limits_rejected_and_tick_survives() {
    let mut rig = Rig::new();
    let limits = |min, max| Command::AxisLimits {
        axis: AxisId::Pan,
        min,
        max,
        max_speed: None,
        max_accel: None,
    };
    for (min, max) in [(i64::MIN, i64::MAX), (1, i64::MAX), (i64::MIN, 0)] {
        assert!(matches!(rig.send(limits(min, max)), Err(CommandError::Validation(_))));
    }
    assert_eq!(rig.c.axes().axis(AxisId::Pan).max, 100_000);

    rig.ok(Command::AbsoluteMove { axis: AxisId::Pan, value: AxisValue::Normalized(1.0) });
    assert_eq!(rig.target(AxisId::Pan), 100_000);

    rig.ok(limits(-1_000_000, 2_000_000_000));
    rig.ok(Command::AbsoluteMove { axis: AxisId::Pan, value: AxisValue::Normalized(1.0) });
    assert_eq!(rig.target(AxisId::Pan), 2_000_000_000);
    rig.run_ms(100);
    assert!(rig.c.driver().stepper(AxisId::Pan).is_moving());
}

#[test]
fn preset_store_then_recall_holds_position_under_offset() {
    let mut rig = Rig::new();
    rig.ok(Command::AbsoluteMove { axis: AxisId::Pan, value: AxisValue::Steps(1_000) });
    let mut deltas = AxisArray::splat(0);
    deltas[AxisId::Pan] = 100;
    rig.ok(Command::OffsetAdd { deltas });
    rig.settle(3_000);
    assert_eq!(rig.position(AxisId::Pan), 1_100);

    rig.ok(Command::PresetStore { index: 0 });
    assert_eq!(rig.c.banks().preset(0).unwrap().positions[AxisId::Pan], Some(1_000));

    rig.ok(Command::PresetRecall { index: 0, duration_ms: None });
    rig.settle(3_000);
    assert_eq!(rig.target(AxisId::Pan), 1_000);
    assert_eq!(rig.position(AxisId::Pan), 1_100);
}
