//! Integration test: axis ownership between synchronized jobs and
//! individual writers.

use slider_common::axis::{AxisId, AxisValue};
use slider_common::control_unit::bank::InterpPoint;
use slider_common::control_unit::command::{Command, CommandOutcome};
use slider_common::control_unit::config::ControllerConfig;
use slider_common::control_unit::error::CommandError;
use slider_control_unit::command::queue::CommandResult;

use super::common::{Rig, steps};

fn three_axis_job() -> Command {
    Command::SynchronizedMove {
        targets: steps(&[(AxisId::Pan, 60_000), (AxisId::Tilt, 30_000), (AxisId::Zoom, 90_000)]),
        duration_ms: Some(4_000),
    }
}

fn strict_config() -> ControllerConfig {
    let mut cfg = ControllerConfig::default();
    cfg.motion.auto_cancel = false;
    cfg
}

#[test]
fn individual_move_releases_only_its_axis() {
    let mut rig = Rig::new();
    rig.ok(three_axis_job());
    rig.run_ms(500);

    rig.ok(Command::AbsoluteMove { axis: AxisId::Tilt, value: AxisValue::Steps(1_000) });
    let scheduler = rig.c.scheduler();
    assert!(scheduler.is_active());
    assert!(!scheduler.member(AxisId::Tilt));
    assert!(scheduler.member(AxisId::Pan));
    assert!(scheduler.member(AxisId::Zoom));

    // The remaining legs keep their derated limits and still arrive together.
    rig.settle(6_000);
    assert!(!rig.c.scheduler().is_active());
    assert_eq!(rig.position(AxisId::Pan), 60_000);
    assert_eq!(rig.position(AxisId::Zoom), 90_000);
    assert_eq!(rig.position(AxisId::Tilt), 1_000);
}

#[test]
fn releasing_last_member_ends_job() {
    let mut rig = Rig::new();
    rig.ok(Command::SynchronizedMove {
        targets: steps(&[(AxisId::Pan, 60_000)]),
        duration_ms: Some(4_000),
    });
    rig.ok(Command::Jog { axis: AxisId::Pan, speed: 0.8 });
    assert!(!rig.c.scheduler().is_active());
}

#[test]
fn zero_jog_does_not_claim_member() {
    let mut rig = Rig::new();
    rig.ok(three_axis_job());
    rig.ok(Command::Jog { axis: AxisId::Pan, speed: 0.0 });
    assert!(rig.c.scheduler().member(AxisId::Pan));
}

#[test]
fn strict_mode_rejects_writes_to_members() {
    let mut rig = Rig::with_config(strict_config());
    rig.ok(three_axis_job());

    let conflict = |r: CommandResult| matches!(r, Err(CommandError::Conflict(_)));
    assert!(conflict(rig.send(Command::AbsoluteMove {
        axis: AxisId::Pan,
        value: AxisValue::Steps(0),
    })));
    assert!(conflict(rig.send(Command::Jog { axis: AxisId::Zoom, speed: -0.5 })));
    assert!(rig.c.scheduler().member(AxisId::Pan));
    assert!(rig.c.scheduler().member(AxisId::Zoom));
    assert_eq!(rig.target(AxisId::Pan), 60_000);

    // Slide is not in the job.
    rig.ok(Command::AbsoluteMove { axis: AxisId::Slide, value: AxisValue::Steps(2_000) });
    rig.ok(Command::Jog { axis: AxisId::Slide, speed: 0.3 });
}

#[test]
fn strict_mode_rejects_interp_over_members() {
    let mut rig = Rig::with_config(strict_config());
    rig.ok(Command::PresetSet { index: 0, positions: steps(&[(AxisId::Pan, 0)]) });
    rig.ok(Command::PresetSet { index: 1, positions: steps(&[(AxisId::Pan, 10_000)]) });
    rig.ok(Command::InterpSetpoints {
        points: vec![
            InterpPoint { preset_index: 0, fraction: 0.0 },
            InterpPoint { preset_index: 1, fraction: 1.0 },
        ],
    });
    rig.ok(three_axis_job());

    let result = rig.send(Command::InterpGoto { fraction: 0.5 });
    assert!(matches!(result, Err(CommandError::Conflict(_))));
    assert_eq!(rig.c.interp().fraction(), 0.0);
    assert!(rig.c.scheduler().member(AxisId::Pan));
}

#[test]
fn new_sync_move_replaces_job() {
    let mut rig = Rig::new();
    rig.ok(three_axis_job());
    rig.run_ms(300);

    let outcome = rig
        .send(Command::SynchronizedMove {
            targets: steps(&[(AxisId::Slide, 5_000)]),
            duration_ms: Some(1_000),
        })
        .unwrap();
    assert!(matches!(outcome, CommandOutcome::Move(r) if r.actual_duration_ms == 1_000));
    let scheduler = rig.c.scheduler();
    assert!(scheduler.member(AxisId::Slide));
    assert!(!scheduler.member(AxisId::Pan));
    assert!(!scheduler.member(AxisId::Zoom));
}

#[test]
fn rejected_command_leaves_job_untouched() {
    let mut rig = Rig::with_config(strict_config());
    rig.ok(three_axis_job());
    rig.run_ms(200);
    let legs = rig.c.scheduler().job().map(|j| j.legs);

    assert!(matches!(rig.send(Command::BankSelect { index: 40 }), Err(CommandError::Validation(_))));
    assert!(rig.send(Command::AbsoluteMove { axis: AxisId::Tilt, value: AxisValue::Steps(5) }).is_err());
    assert!(matches!(
        rig.send(Command::SynchronizedMove { targets: Default::default(), duration_ms: None }),
        Err(CommandError::Validation(_))
    ));

    assert_eq!(rig.c.scheduler().job().map(|j| j.legs), legs);
    assert_eq!(rig.target(AxisId::Tilt), 30_000);
}

#[test]
fn stop_cancels_everything() {
    let mut rig = Rig::new();
    rig.ok(three_axis_job());
    rig.ok(Command::Jog { axis: AxisId::Slide, speed: 1.0 });
    rig.run_ms(500);
    rig.ok(Command::Stop);

    assert!(!rig.c.scheduler().is_active());
    assert!(!rig.c.joystick().any_active());
    rig.settle(2_000);
    for axis in AxisId::ALL {
        assert!(!rig.c.driver().stepper(axis).is_moving(), "{axis} still moving");
    }
    let pan = rig.position(AxisId::Pan);
    assert!(pan > 0 && pan < 60_000);

    // Held: nothing drifts afterwards.
    rig.run_ms(500);
    assert_eq!(rig.position(AxisId::Pan), pan);
    assert_eq!(rig.c.output(AxisId::Pan), rig.target(AxisId::Pan));
}

#[test]
fn status_reports_job_membership() {
    let mut rig = Rig::new();
    rig.ok(three_axis_job());
    rig.run_ms(1_000);
    let Ok(CommandOutcome::Status(status)) = rig.send(Command::Status) else {
        panic!("status failed");
    };
    let job = status.sync_job.expect("job active");
    assert!(job.members[AxisId::Pan]);
    assert!(!job.members[AxisId::Slide]);
    assert!(job.remaining_ms > 0 && job.remaining_ms < 4_000);
}
