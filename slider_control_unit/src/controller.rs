//! The controller aggregate and its tick.
//!
//! [`Controller`] owns every piece of mutable motion state. The tick is
//! its only mutator: commands are applied between the feedback read and
//! the output write, so a command is never seen half-applied.
//!
//! ## Tick Order
//!
//! 1. Service the driver, read positions into the axis model
//! 2. Drain and dispatch queued commands
//! 3. Supervise homing
//! 4. Shape joystick input, integrate into targets or offsets
//! 5. Advance interpolation auto/jog, write interpolated targets
//! 6. Advance the synchronized job
//! 7. Compose `target + offsets`, clamp, hand changed outputs to the driver

use std::time::Duration;

use slider_common::axis::{AxisArray, AxisId};
use slider_common::control_unit::bank::Bank;
use slider_common::control_unit::command::{Command, TransportClass};
use slider_common::control_unit::config::ControllerConfig;
use slider_common::control_unit::telemetry::{
    AxisPosition, AxisStatus, CycleSummary, ModeFlags, PositionTick, StatusSnapshot,
};
use slider_common::hal::driver::{AxisDriver, DriverError};
use tracing::{debug, info, trace, warn};

use crate::command::homing::{HOMING_AXIS, HomingController, HomingTickResult};
use crate::command::queue::{CommandEnvelope, CommandReceiver, CommandResult};
use crate::control::joystick::JoystickShaper;
use crate::control::scheduler::MotionScheduler;
use crate::state::axis::AxisModel;
use crate::state::bank::BankStore;
use crate::state::interp::InterpolationEngine;
use crate::state::offset::OffsetManager;

pub struct Controller<D: AxisDriver> {
    pub(crate) device_name: String,
    pub(crate) driver: D,
    pub(crate) axes: AxisModel,
    pub(crate) offsets: OffsetManager,
    pub(crate) joystick: JoystickShaper,
    pub(crate) interp: InterpolationEngine,
    pub(crate) banks: BankStore,
    pub(crate) scheduler: MotionScheduler,
    pub(crate) homing: HomingController,
    pub(crate) default_auto_ms: u32,
    /// Time of the current tick since start.
    pub(crate) now: Duration,
    last_tick: Option<Duration>,
    /// Last output handed to the driver per axis.
    pub(crate) last_output: AxisArray<Option<i64>>,
    cycle: CycleSummary,
}

impl<D: AxisDriver> Controller<D> {
    /// Build the controller. Axis positions start from the driver's.
    pub fn new(cfg: &ControllerConfig, driver: D, banks: Vec<Bank>) -> Self {
        let mut axes = AxisModel::from_config(&cfg.axes);
        for axis in AxisId::ALL {
            axes.update_position(axis, driver.position(axis));
            let position = axes.axis(axis).position;
            axes.set_target(axis, position);
        }
        let span = AxisArray::from_fn(|axis| axes.axis(axis).span());
        let watchdog = Duration::from_millis(u64::from(cfg.joystick.input_timeout_ms));
        let banks = BankStore::new(banks);
        let mut interp = InterpolationEngine::new(
            cfg.interp.end_behavior,
            cfg.interp.default_auto_duration_ms,
            watchdog,
        );
        interp.load_bank(banks.active());

        info!(
            "controller '{}' on {} driver, bank {} active",
            cfg.shared.device_name,
            driver.name(),
            banks.active_index()
        );

        Self {
            device_name: cfg.shared.device_name.clone(),
            driver,
            axes,
            offsets: OffsetManager::new(span),
            joystick: JoystickShaper::new(cfg.joystick.shaping, watchdog),
            interp,
            banks,
            scheduler: MotionScheduler::new(cfg.motion.auto_cancel),
            homing: HomingController::new(cfg.homing),
            default_auto_ms: cfg.interp.default_auto_duration_ms,
            now: Duration::ZERO,
            last_tick: None,
            last_output: AxisArray::default(),
            cycle: CycleSummary::default(),
        }
    }

    /// Write the configured driver settings of every axis.
    ///
    /// # Errors
    /// The first driver error, typically `NotConfigured` before negotiation.
    pub fn apply_driver_configs(&mut self) -> Result<(), DriverError> {
        for axis in AxisId::ALL {
            let state = *self.axes.axis(axis);
            self.driver.apply_driver_config(axis, &state.driver, state.inverted)?;
        }
        Ok(())
    }

    // ─── Accessors ──────────────────────────────────────────────────

    #[inline]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    #[inline]
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    #[inline]
    pub fn axes(&self) -> &AxisModel {
        &self.axes
    }

    #[inline]
    pub fn offsets(&self) -> &OffsetManager {
        &self.offsets
    }

    #[inline]
    pub fn interp(&self) -> &InterpolationEngine {
        &self.interp
    }

    #[inline]
    pub fn banks(&self) -> &BankStore {
        &self.banks
    }

    #[inline]
    pub fn scheduler(&self) -> &MotionScheduler {
        &self.scheduler
    }

    #[inline]
    pub fn homing(&self) -> &HomingController {
        &self.homing
    }

    #[inline]
    pub fn joystick(&self) -> &JoystickShaper {
        &self.joystick
    }

    /// Absolute output of `axis`: target plus offsets, clamped.
    #[inline]
    pub fn output(&self, axis: AxisId) -> i64 {
        let state = self.axes.axis(axis);
        state.clamp(state.target.saturating_add(self.offsets.total(axis)))
    }

    /// Bank snapshots queued by `BankSave` since the last call.
    pub fn take_pending_saves(&mut self) -> Vec<Bank> {
        self.banks.take_pending_saves()
    }

    pub fn set_cycle_summary(&mut self, cycle: CycleSummary) {
        self.cycle = cycle;
    }

    // ─── Tick ───────────────────────────────────────────────────────

    /// Run one tick at `now` (time since start), draining `inbox`.
    ///
    /// Returns the number of commands processed.
    pub fn tick(&mut self, now: Duration, inbox: &mut CommandReceiver) -> usize {
        let dt = self.begin_tick(now);
        let mut processed = 0;
        while let Some(env) = inbox.try_next() {
            self.handle_envelope(env);
            processed += 1;
        }
        self.end_tick(dt);
        processed
    }

    /// Run one tick with the given commands instead of a queue.
    pub fn tick_with(
        &mut self,
        now: Duration,
        commands: impl IntoIterator<Item = Command>,
    ) -> Vec<CommandResult> {
        let dt = self.begin_tick(now);
        let results = commands.into_iter().map(|c| self.execute(c)).collect();
        self.end_tick(dt);
        results
    }

    fn handle_envelope(&mut self, env: CommandEnvelope) {
        let CommandEnvelope { command, transport, reply } = env;
        let name = command.name();
        let result = self.execute(command);
        if let Err(e) = &result {
            match transport {
                TransportClass::Datagram => debug!("dropped {name}: {e}"),
                TransportClass::RequestResponse => debug!("rejected {name}: {e}"),
            }
        }
        if let Some(reply) = reply {
            let _ = reply.send(result);
        }
    }

    fn begin_tick(&mut self, now: Duration) -> Duration {
        let dt = self.last_tick.map_or(Duration::ZERO, |prev| now.saturating_sub(prev));
        self.last_tick = Some(now);
        self.now = now;

        self.driver.service(dt);
        for axis in AxisId::ALL {
            self.axes.update_position(axis, self.driver.position(axis));
        }
        dt
    }

    fn end_tick(&mut self, dt: Duration) {
        self.supervise_homing(dt);
        self.integrate_joystick(dt);
        self.advance_interp(dt);
        let driver = &self.driver;
        if let Some(report) = self.scheduler.advance(dt, |axis| driver.is_moving(axis)) {
            debug!("sync move done: {report:?}");
        }
        self.write_outputs();
    }

    fn supervise_homing(&mut self, dt: Duration) {
        match self.homing.tick(&mut self.driver, dt) {
            HomingTickResult::Homed => {
                self.axes.rebase(HOMING_AXIS);
                self.offsets.clear_axis(HOMING_AXIS);
                self.last_output[HOMING_AXIS] = None;
                self.homing.finish();
            }
            HomingTickResult::Failed(reason) => {
                warn!("slide held after homing failure: {reason:?}");
                self.hold_axis(HOMING_AXIS);
            }
            HomingTickResult::Idle | HomingTickResult::InProgress => {}
        }
    }

    fn integrate_joystick(&mut self, dt: Duration) {
        self.joystick.update(dt);
        let interp_driven = if self.interp.is_driving() {
            self.interp.current()
        } else {
            AxisArray::default()
        };
        for axis in AxisId::ALL {
            if axis == HOMING_AXIS && self.homing.is_seeking() {
                continue;
            }
            let max_speed = self.axes.axis(axis).max_speed;
            let steps = self.joystick.integrate(axis, max_speed, dt);
            if steps == 0 {
                continue;
            }
            if interp_driven[axis].is_some() {
                self.offsets.add_axis(axis, steps);
            } else {
                let target = self.axes.axis(axis).target;
                self.axes.set_target(axis, target.saturating_add(steps));
            }
        }
    }

    fn advance_interp(&mut self, dt: Duration) {
        if self.interp.advance(dt) {
            self.apply_interp();
        }
    }

    /// Write the interpolated positions at the current fraction as targets.
    pub(crate) fn apply_interp(&mut self) {
        let positions = self.interp.current();
        for (axis, steps) in positions.present() {
            if axis == HOMING_AXIS && self.homing.is_seeking() {
                continue;
            }
            if self.scheduler.member(axis) {
                continue;
            }
            self.axes.set_target(axis, *steps);
        }
        trace!("interp f={:.4}", self.interp.fraction());
    }

    fn write_outputs(&mut self) {
        for axis in AxisId::ALL {
            if axis == HOMING_AXIS && self.homing.is_seeking() {
                continue;
            }
            let output = self.output(axis);
            if self.last_output[axis] == Some(output) {
                continue;
            }
            let limits = self
                .scheduler
                .leg_limits(axis)
                .unwrap_or_else(|| self.axes.axis(axis).limits());
            self.driver.move_to(axis, output, limits);
            self.last_output[axis] = Some(output);
            trace!("{axis}: output {output}");
        }
    }

    /// Set the target so the output equals the current position.
    pub(crate) fn hold_axis(&mut self, axis: AxisId) {
        let position = self.axes.axis(axis).position;
        self.axes
            .set_target(axis, position.saturating_sub(self.offsets.total(axis)));
        self.last_output[axis] = Some(self.output(axis));
    }

    // ─── Telemetry ──────────────────────────────────────────────────

    #[inline]
    fn timestamp_ms(&self) -> u64 {
        u64::try_from(self.now.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn mode(&self) -> ModeFlags {
        let mut mode = ModeFlags::empty();
        mode.set(ModeFlags::JOGGING, self.joystick.any_active());
        mode.set(ModeFlags::SYNC_MOVE, self.scheduler.is_active());
        mode.set(ModeFlags::INTERP_AUTO, self.interp.auto_enabled());
        mode.set(ModeFlags::INTERP_JOG, self.interp.jogging());
        mode.set(ModeFlags::HOMING, self.homing.is_seeking());
        mode
    }

    pub fn status(&self) -> StatusSnapshot {
        let axes = AxisArray::from_fn(|axis| {
            let s = self.axes.axis(axis);
            let normalized = s.normalize(s.position);
            AxisStatus {
                position: s.position,
                target: s.target,
                output: self.output(axis),
                normalized,
                percent: normalized * 100.0,
                min: s.min,
                max: s.max,
                max_speed: s.max_speed,
                max_accel: s.max_accel,
                inverted: s.inverted,
                driver: s.driver,
                offset: self.offsets.live(axis),
                baseline: self.offsets.baseline(axis),
                moving: self.driver.is_moving(axis),
            }
        });
        StatusSnapshot {
            device_name: self.device_name.clone(),
            axes,
            interp: self.interp.status(),
            mode: self.mode(),
            active_bank: self.banks.active_index(),
            homing: self.homing.status(),
            sync_job: self.scheduler.status(),
            driver_configured: self.driver.is_configured(),
            cycle: self.cycle,
            timestamp_ms: self.timestamp_ms(),
        }
    }

    /// Position sample for the telemetry fan-out.
    pub fn position_tick(&self) -> PositionTick {
        PositionTick {
            axes: AxisArray::from_fn(|axis| {
                let s = self.axes.axis(axis);
                AxisPosition { steps: s.position, normalized: s.normalize(s.position) }
            }),
            timestamp_ms: self.timestamp_ms(),
        }
    }
}
