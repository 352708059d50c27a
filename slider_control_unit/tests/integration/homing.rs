//! Integration test: sensorless homing of the slide through the controller.

use slider_common::axis::{AxisArray, AxisId, AxisValue};
use slider_common::control_unit::command::{Command, DriverSettings};
use slider_common::control_unit::config::ControllerConfig;
use slider_common::control_unit::error::CommandError;
use slider_common::control_unit::homing::{
    HomingDirection, HomingFailReason, HomingOutcome, HomingState,
};
use slider_control_unit::command::queue::CommandResult;
use slider_hal::SimulatedDriver;

use super::common::{Rig, steps};

fn end_stop_rig() -> Rig {
    let driver = SimulatedDriver::new().with_hard_stops(AxisId::Slide, -500, 400_000);
    Rig::build(ControllerConfig::default(), driver, Vec::new())
}

fn driver_config(axis_id: u8) -> Command {
    Command::DriverConfig { axis_id, microsteps: 32, current_ma: 900, spread_cycle: true }
}

#[test]
fn stall_homes_and_zeroes_slide() {
    let mut rig = end_stop_rig();
    rig.ok(Command::OffsetAdd { deltas: AxisArray([0, 0, 0, 250]) });
    rig.ok(Command::OffsetBake);
    rig.ok(Command::OffsetAdd { deltas: AxisArray([0, 0, 0, 30]) });
    rig.settle(2_000);

    rig.ok(Command::HomingStart);
    assert_eq!(rig.c.homing().state(), HomingState::Seeking);
    rig.run_ms(1_000);

    assert_eq!(rig.c.homing().state(), HomingState::Idle);
    assert_eq!(rig.c.homing().outcome(), HomingOutcome::Homed);
    assert_eq!(rig.c.offsets().live(AxisId::Slide), 0);
    assert_eq!(rig.c.offsets().baseline(AxisId::Slide), 0);
    assert_eq!(rig.position(AxisId::Slide), 0);
    assert_eq!(rig.target(AxisId::Slide), 0);

    rig.settle(1_000);
    assert_eq!(rig.c.driver().stepper(AxisId::Slide).position(), 0);
    assert!(!rig.c.driver().stepper(AxisId::Slide).is_moving());
}

#[test]
fn slide_moves_normally_after_homing() {
    let mut rig = end_stop_rig();
    rig.ok(Command::HomingStart);
    rig.run_ms(1_000);
    assert_eq!(rig.c.homing().outcome(), HomingOutcome::Homed);

    rig.ok(Command::AbsoluteMove {
        axis: AxisId::Slide,
        value: AxisValue::Steps(5_000),
    });
    rig.settle(3_000);
    assert_eq!(rig.position(AxisId::Slide), 5_000);
}

#[test]
fn seek_without_end_stop_times_out() {
    let mut cfg = ControllerConfig::default();
    cfg.homing.direction = HomingDirection::Positive;
    cfg.homing.max_seek_ms = 300;
    cfg.homing.max_seek_steps = 0;
    let mut rig = Rig::with_config(cfg);

    rig.ok(Command::HomingStart);
    rig.run_ms(200);
    assert!(rig.c.homing().is_seeking());
    rig.run_ms(200);

    assert_eq!(rig.c.homing().state(), HomingState::Idle);
    assert_eq!(
        rig.c.homing().outcome(),
        HomingOutcome::Failed { reason: HomingFailReason::Timeout }
    );
    // Held where it stopped, not driven back.
    assert!(rig.target(AxisId::Slide) > 0);

    rig.ok(Command::AbsoluteMove {
        axis: AxisId::Slide,
        value: AxisValue::Steps(0),
    });
    rig.settle(2_000);
    assert_eq!(rig.c.driver().stepper(AxisId::Slide).position(), 0);
}

#[test]
fn travel_bound_ends_seek() {
    let mut cfg = ControllerConfig::default();
    cfg.homing.direction = HomingDirection::Positive;
    cfg.homing.max_seek_ms = 0;
    cfg.homing.max_seek_steps = 400;
    let mut rig = Rig::with_config(cfg);

    rig.ok(Command::HomingStart);
    rig.run_ms(1_000);
    assert_eq!(
        rig.c.homing().outcome(),
        HomingOutcome::Failed { reason: HomingFailReason::TravelExceeded }
    );
}

#[test]
fn unconfigured_driver_rejects_homing_and_driver_config() {
    let mut rig = Rig::build(ControllerConfig::default(), SimulatedDriver::unconfigured(), Vec::new());

    assert_eq!(rig.send(Command::HomingStart), Err(CommandError::ConfigurationNotLoaded));
    assert_eq!(rig.c.homing().state(), HomingState::Idle);
    assert_eq!(rig.send(driver_config(0)), Err(CommandError::ConfigurationNotLoaded));

    rig.c.driver_mut().complete_negotiation();
    rig.ok(driver_config(0));
    let expected = DriverSettings { microsteps: 32, current_ma: 900, spread_cycle: true };
    assert_eq!(rig.c.axes().axis(AxisId::Pan).driver, expected);
    assert_eq!(rig.c.driver().stepper(AxisId::Pan).settings(), Some((expected, false)));

    rig.ok(Command::HomingStart);
    assert!(rig.c.homing().is_seeking());
}

#[test]
fn driver_config_rejects_bad_axis_id() {
    let mut rig = Rig::new();
    assert!(matches!(rig.send(driver_config(4)), Err(CommandError::Validation(_))));
}

#[test]
fn homing_owns_slide_exclusively() {
    let mut rig = end_stop_rig();
    rig.ok(Command::PresetSet {
        index: 2,
        positions: steps(&[(AxisId::Pan, 100), (AxisId::Slide, 300)]),
    });
    rig.ok(Command::PresetSet { index: 3, positions: steps(&[(AxisId::Pan, 200)]) });
    rig.ok(Command::HomingStart);

    let conflict = |r: CommandResult| matches!(r, Err(CommandError::Conflict(_)));
    assert!(conflict(rig.send(Command::AbsoluteMove {
        axis: AxisId::Slide,
        value: AxisValue::Steps(1_000),
    })));
    assert!(conflict(rig.send(Command::Jog { axis: AxisId::Slide, speed: 0.5 })));
    assert!(conflict(rig.send(Command::OffsetAdd { deltas: AxisArray([0, 0, 0, 10]) })));
    assert!(conflict(rig.send(driver_config(3))));
    assert!(conflict(rig.send(Command::PresetRecall { index: 2, duration_ms: None })));
    assert!(conflict(rig.send(Command::SynchronizedMove {
        targets: steps(&[(AxisId::Pan, 10), (AxisId::Slide, 10)]),
        duration_ms: None,
    })));

    // Other axes stay available.
    rig.ok(Command::AbsoluteMove {
        axis: AxisId::Pan,
        value: AxisValue::Steps(1_000),
    });
    rig.ok(Command::PresetRecall { index: 3, duration_ms: None });
    rig.ok(driver_config(0));
    assert!(rig.c.homing().is_seeking());
}

#[test]
fn stop_aborts_seek() {
    let mut rig = end_stop_rig();
    rig.ok(Command::HomingStart);
    rig.run_ms(50);
    rig.ok(Command::Stop);

    assert_eq!(rig.c.homing().state(), HomingState::Idle);
    assert_eq!(
        rig.c.homing().outcome(),
        HomingOutcome::Failed { reason: HomingFailReason::Aborted }
    );
    rig.settle(1_000);
    assert!(!rig.c.driver().stepper(AxisId::Slide).is_moving());
}

#[test]
fn threshold_applies_to_next_session() {
    let mut rig = end_stop_rig();
    rig.ok(Command::HomingThreshold { value: 120 });
    assert_eq!(rig.c.homing().threshold(), 120);
    assert_eq!(rig.c.status().homing.threshold, 120);
    assert!(matches!(
        rig.send(Command::HomingThreshold { value: -1 }),
        Err(CommandError::Validation(_))
    ));
    assert_eq!(rig.c.homing().threshold(), 120);
}
