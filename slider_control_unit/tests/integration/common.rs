//! Shared test rig: a controller ticked at a fixed 10 ms period.

use std::time::Duration;

use slider_common::axis::{AxisArray, AxisId, AxisValue};
use slider_common::control_unit::bank::Bank;
use slider_common::control_unit::command::Command;
use slider_common::control_unit::config::ControllerConfig;
use slider_control_unit::command::queue::CommandResult;
use slider_control_unit::controller::Controller;
use slider_hal::SimulatedDriver;

pub const TICK: Duration = Duration::from_millis(10);

pub struct Rig {
    pub c: Controller<SimulatedDriver>,
    pub now: Duration,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    pub fn with_config(cfg: ControllerConfig) -> Self {
        Self::build(cfg, SimulatedDriver::new(), Vec::new())
    }

    pub fn build(cfg: ControllerConfig, driver: SimulatedDriver, banks: Vec<Bank>) -> Self {
        let mut c = Controller::new(&cfg, driver, banks);
        c.tick_with(Duration::ZERO, []);
        Self { c, now: Duration::ZERO }
    }

    /// Apply one command in the next tick.
    pub fn send(&mut self, command: Command) -> CommandResult {
        self.now += TICK;
        let mut results = self.c.tick_with(self.now, [command]);
        results.remove(0)
    }

    /// Apply a command that must succeed.
    pub fn ok(&mut self, command: Command) {
        let name = command.name();
        if let Err(e) = self.send(command) {
            panic!("{name} rejected: {e}");
        }
    }

    pub fn run_ms(&mut self, ms: u64) {
        for _ in 0..ms / 10 {
            self.now += TICK;
            self.c.tick_with(self.now, []);
        }
    }

    /// Tick until no axis moves, at most `max_ms`.
    pub fn settle(&mut self, max_ms: u64) {
        for _ in 0..max_ms / 10 {
            self.now += TICK;
            self.c.tick_with(self.now, []);
            if AxisId::ALL.iter().all(|&a| !self.c.driver().stepper(a).is_moving()) {
                return;
            }
        }
    }

    pub fn target(&self, axis: AxisId) -> i64 {
        self.c.axes().axis(axis).target
    }

    pub fn position(&self, axis: AxisId) -> i64 {
        self.c.axes().axis(axis).position
    }
}

/// Per-axis values from `(axis, value)` pairs.
pub fn values(pairs: &[(AxisId, AxisValue)]) -> AxisArray<Option<AxisValue>> {
    let mut out = AxisArray::default();
    for &(axis, value) in pairs {
        out[axis] = Some(value);
    }
    out
}

pub fn steps(pairs: &[(AxisId, i64)]) -> AxisArray<Option<AxisValue>> {
    let mapped: Vec<_> = pairs.iter().map(|&(a, s)| (a, AxisValue::Steps(s))).collect();
    values(&mapped)
}

/// Config where tilt is twice as fast as pan.
pub fn fast_tilt_config() -> ControllerConfig {
    let mut cfg = ControllerConfig::default();
    cfg.axes.tilt.max_speed = 50_000.0;
    cfg.axes.tilt.max_accel = 100_000.0;
    cfg
}
