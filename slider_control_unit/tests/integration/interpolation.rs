//! Integration test: interpolation paths driven through commands.

use slider_common::axis::{AxisArray, AxisId, AxisValue};
use slider_common::control_unit::bank::{AutoEndBehavior, DirectPoint, InterpPoint};
use slider_common::control_unit::command::Command;
use slider_common::control_unit::error::CommandError;
use slider_common::control_unit::telemetry::InterpSource;

use super::common::{Rig, steps};

fn direct(fraction: f64, pan: f64) -> DirectPoint {
    let mut positions = AxisArray::default();
    positions[AxisId::Pan] = Some(pan);
    DirectPoint { fraction, positions }
}

fn pan_sweep() -> Vec<DirectPoint> {
    vec![direct(0.0, 0.0), direct(1.0, 1.0)]
}

/// Bank path: pan 0 → 100000, tilt 0 → 50000.
fn bank_path(rig: &mut Rig) {
    rig.ok(Command::PresetSet {
        index: 0,
        positions: steps(&[(AxisId::Pan, 0), (AxisId::Tilt, 0)]),
    });
    rig.ok(Command::PresetSet {
        index: 1,
        positions: steps(&[(AxisId::Pan, 100_000), (AxisId::Tilt, 50_000)]),
    });
    rig.ok(Command::InterpSetpoints {
        points: vec![
            InterpPoint { preset_index: 0, fraction: 0.0 },
            InterpPoint { preset_index: 1, fraction: 1.0 },
        ],
    });
}

fn auto(duration_ms: u32, end_behavior: AutoEndBehavior) -> Command {
    Command::InterpAuto { enable: true, duration_ms: Some(duration_ms), end_behavior: Some(end_behavior) }
}

#[test]
fn sequence_runs_in_auto_mode() {
    let mut rig = Rig::new();
    rig.ok(Command::InterpSequence { points: pan_sweep(), duration_ms: 1_000 });
    assert_eq!(rig.c.interp().source(), InterpSource::Sequence);
    assert!(rig.c.interp().auto_enabled());

    rig.run_ms(490);
    let f = rig.c.interp().fraction();
    assert!((f - 0.5).abs() < 1e-6, "fraction {f}");
    assert!((rig.target(AxisId::Pan) - 50_000).abs() <= 1);
    // Axes outside the sequence are not driven.
    assert_eq!(rig.target(AxisId::Tilt), 0);
}

#[test]
fn sequence_update_retimes_remaining_path() {
    let mut rig = Rig::new();
    rig.ok(Command::InterpSequence { points: pan_sweep(), duration_ms: 1_000 });
    rig.run_ms(490);

    // Remaining half now takes 1 s.
    rig.ok(Command::InterpSequenceUpdate { points: pan_sweep(), duration_ms: Some(2_000) });
    rig.run_ms(490);
    let f = rig.c.interp().fraction();
    assert!((f - 0.75).abs() < 1e-6, "fraction {f}");
    assert!(rig.c.interp().auto_enabled());
}

#[test]
fn sequence_update_swaps_points_in_place() {
    let mut rig = Rig::new();
    rig.ok(Command::InterpSequence { points: pan_sweep(), duration_ms: 1_000 });
    rig.run_ms(490);
    rig.ok(Command::InterpAuto { enable: false, duration_ms: None, end_behavior: None });
    let f = rig.c.interp().fraction();

    rig.ok(Command::InterpSequenceUpdate {
        points: vec![direct(0.0, 0.0), direct(1.0, 0.5)],
        duration_ms: None,
    });
    assert_eq!(rig.c.interp().fraction(), f);
    let expected = (f * 50_000.0).round() as i64;
    assert_eq!(rig.c.interp().current()[AxisId::Pan], Some(expected));
}

#[test]
fn sequence_update_requires_loaded_sequence() {
    let mut rig = Rig::new();
    let update = || Command::InterpSequenceUpdate { points: pan_sweep(), duration_ms: None };
    assert!(matches!(rig.send(update()), Err(CommandError::Conflict(_))));

    bank_path(&mut rig);
    assert!(matches!(rig.send(update()), Err(CommandError::Conflict(_))));
}

#[test]
fn zero_durations_rejected() {
    let mut rig = Rig::new();
    assert!(matches!(
        rig.send(Command::InterpSequence { points: pan_sweep(), duration_ms: 0 }),
        Err(CommandError::Validation(_))
    ));
    assert_eq!(rig.c.interp().source(), InterpSource::None);

    rig.ok(Command::InterpSequence { points: pan_sweep(), duration_ms: 500 });
    assert!(matches!(
        rig.send(Command::InterpSequenceUpdate { points: pan_sweep(), duration_ms: Some(0) }),
        Err(CommandError::Validation(_))
    ));
    assert!(matches!(rig.send(auto(0, AutoEndBehavior::Hold)), Err(CommandError::Validation(_))));
}

#[test]
fn malformed_points_rejected() {
    let mut rig = Rig::new();
    let descending = vec![direct(0.6, 0.0), direct(0.2, 1.0)];
    let single = vec![direct(0.0, 0.0)];
    let nan = vec![direct(0.0, f64::NAN), direct(1.0, 1.0)];
    for points in [descending, single, nan] {
        assert!(matches!(
            rig.send(Command::InterpSequence { points, duration_ms: 1_000 }),
            Err(CommandError::Validation(_))
        ));
    }
    let out_of_range = vec![
        InterpPoint { preset_index: 0, fraction: 0.0 },
        InterpPoint { preset_index: 1, fraction: 1.5 },
    ];
    assert!(matches!(
        rig.send(Command::InterpSetpoints { points: out_of_range }),
        Err(CommandError::Validation(_))
    ));
}

#[test]
fn path_commands_need_a_path() {
    let mut rig = Rig::new();
    for command in [
        auto(1_000, AutoEndBehavior::Hold),
        Command::InterpGoto { fraction: 0.5 },
        Command::InterpJog { speed: 0.2 },
    ] {
        assert!(matches!(rig.send(command), Err(CommandError::Validation(_))));
    }
    // Stopping what is not running is fine.
    rig.ok(Command::InterpJog { speed: 0.0 });
    rig.ok(Command::InterpAuto { enable: false, duration_ms: None, end_behavior: None });
}

#[test]
fn hold_stops_at_end() {
    let mut rig = Rig::new();
    rig.ok(Command::InterpSequence { points: pan_sweep(), duration_ms: 200 });
    rig.run_ms(300);
    assert_eq!(rig.c.interp().fraction(), 1.0);
    assert!(!rig.c.interp().auto_enabled());
    assert_eq!(rig.target(AxisId::Pan), 100_000);
}

#[test]
fn loop_restarts_from_zero() {
    let mut rig = Rig::new();
    bank_path(&mut rig);
    rig.ok(auto(400, AutoEndBehavior::Loop));
    rig.run_ms(500);
    let f = rig.c.interp().fraction();
    assert!(rig.c.interp().auto_enabled());
    assert!(f > 0.2 && f < 0.35, "fraction {f}");
}

#[test]
fn ping_pong_reverses() {
    let mut rig = Rig::new();
    bank_path(&mut rig);
    rig.ok(auto(400, AutoEndBehavior::PingPong));
    rig.run_ms(500);
    let f = rig.c.interp().fraction();
    assert!(rig.c.interp().auto_enabled());
    assert!(f > 0.65 && f < 0.8, "fraction {f}");
}

#[test]
fn auto_from_end_rewinds() {
    let mut rig = Rig::new();
    bank_path(&mut rig);
    rig.ok(Command::InterpGoto { fraction: 1.0 });
    assert_eq!(rig.target(AxisId::Tilt), 50_000);

    rig.ok(auto(1_000, AutoEndBehavior::Hold));
    assert!(rig.c.interp().fraction() < 0.05);
}

#[test]
fn auto_from_midpath_takes_requested_duration() {
    let mut rig = Rig::new();
    bank_path(&mut rig);
    rig.ok(Command::InterpGoto { fraction: 0.5 });
    rig.ok(auto(2_000, AutoEndBehavior::Hold));

    rig.run_ms(990);
    let f = rig.c.interp().fraction();
    assert!((f - 0.75).abs() < 1e-6, "fraction {f}");
    assert!(rig.c.interp().auto_enabled());

    rig.run_ms(1_000);
    assert_eq!(rig.c.interp().fraction(), 1.0);
    assert!(!rig.c.interp().auto_enabled());
}

#[test]
fn interp_jog_moves_fraction_until_watchdog() {
    let mut rig = Rig::new();
    bank_path(&mut rig);
    rig.ok(Command::InterpJog { speed: 0.2 });
    assert!(rig.c.interp().jogging());

    rig.run_ms(1_000);
    let f = rig.c.interp().fraction();
    assert!((f - 0.1).abs() < 1e-9, "fraction {f}");
    assert!(!rig.c.interp().jogging());

    rig.run_ms(500);
    assert_eq!(rig.c.interp().fraction(), f);
}

#[test]
fn interp_jog_refresh_keeps_moving() {
    let mut rig = Rig::new();
    bank_path(&mut rig);
    for _ in 0..8 {
        rig.ok(Command::InterpJog { speed: -0.5 });
        rig.run_ms(200);
    }
    // Clamped at the start of the path.
    assert_eq!(rig.c.interp().fraction(), 0.0);

    rig.ok(Command::InterpGoto { fraction: 0.2 });
    for _ in 0..4 {
        rig.ok(Command::InterpJog { speed: 0.25 });
        rig.run_ms(300);
    }
    let f = rig.c.interp().fraction();
    assert!(f > 0.45 && f < 0.55, "fraction {f}");
}

#[test]
fn zero_interp_jog_leaves_auto_running() {
    let mut rig = Rig::new();
    bank_path(&mut rig);
    rig.ok(auto(2_000, AutoEndBehavior::Hold));
    rig.ok(Command::InterpJog { speed: 0.0 });
    assert!(rig.c.interp().auto_enabled());
}

#[test]
fn goto_stops_auto() {
    let mut rig = Rig::new();
    bank_path(&mut rig);
    rig.ok(auto(2_000, AutoEndBehavior::Hold));
    rig.run_ms(200);
    rig.ok(Command::InterpGoto { fraction: 0.5 });
    assert!(!rig.c.interp().auto_enabled());
    assert_eq!(rig.target(AxisId::Pan), 50_000);
    assert_eq!(rig.target(AxisId::Tilt), 25_000);
}

#[test]
fn joystick_trims_interp_driven_axis_through_offsets() {
    let mut rig = Rig::new();
    rig.ok(Command::InterpSequence { points: pan_sweep(), duration_ms: 10_000 });
    for _ in 0..3 {
        rig.ok(Command::Jog { axis: AxisId::Pan, speed: 1.0 });
        rig.run_ms(100);
    }
    rig.ok(Command::Jog { axis: AxisId::Pan, speed: 0.0 });
    rig.run_ms(1_000);

    // The path keeps the target; the trim lives in the offset.
    assert!(rig.c.interp().auto_enabled());
    assert_eq!(Some(rig.target(AxisId::Pan)), rig.c.interp().current()[AxisId::Pan]);
    let trim = rig.c.offsets().live(AxisId::Pan);
    assert!(trim > 1_000, "trim {trim}");
    assert_eq!(rig.c.output(AxisId::Pan), rig.target(AxisId::Pan) + trim);

    rig.ok(Command::OffsetBake);
    assert_eq!(rig.c.offsets().live(AxisId::Pan), 0);
    assert_eq!(rig.c.offsets().baseline(AxisId::Pan), trim);
}

#[test]
fn joystick_moves_target_when_interp_idle() {
    let mut rig = Rig::new();
    rig.ok(Command::Jog { axis: AxisId::Tilt, speed: 1.0 });
    rig.run_ms(300);
    assert!(rig.target(AxisId::Tilt) > 1_000);
    assert_eq!(rig.c.offsets().live(AxisId::Tilt), 0);
}

#[test]
fn absolute_move_on_driven_axis_stops_interp() {
    let mut rig = Rig::new();
    bank_path(&mut rig);
    rig.ok(auto(2_000, AutoEndBehavior::Hold));
    rig.run_ms(100);

    // Zoom is not on the path.
    rig.ok(Command::AbsoluteMove { axis: AxisId::Zoom, value: AxisValue::Steps(500) });
    assert!(rig.c.interp().auto_enabled());

    rig.ok(Command::AbsoluteMove { axis: AxisId::Pan, value: AxisValue::Steps(500) });
    assert!(!rig.c.interp().auto_enabled());
    let f = rig.c.interp().fraction();
    rig.run_ms(200);
    assert_eq!(rig.c.interp().fraction(), f);
    assert_eq!(rig.target(AxisId::Pan), 500);
}

#[test]
fn bank_edit_refreshes_loaded_path() {
    let mut rig = Rig::new();
    bank_path(&mut rig);
    rig.ok(Command::PresetSet { index: 1, positions: steps(&[(AxisId::Pan, 80_000)]) });
    assert_eq!(rig.c.interp().evaluate(1.0)[AxisId::Pan], Some(80_000));
    assert_eq!(rig.c.interp().evaluate(1.0)[AxisId::Tilt], Some(50_000));
}
