//! Single dispatcher for the typed command set.
//!
//! Every command is validated before it touches state, and every handler
//! either applies fully or returns an error with no effect.
//!
//! ## Ownership Rules
//!
//! | Owner              | Axes              | Other writers                        |
//! |--------------------|-------------------|--------------------------------------|
//! | Homing seek        | slide             | rejected (`Conflict`)                |
//! | Synchronized job   | member axes       | released (auto-cancel) or `Conflict` |
//! | Interpolation      | axes on the path  | a move on a driven axis stops it     |

use slider_common::axis::{AxisArray, AxisId, AxisValue};
use slider_common::control_unit::bank::{AutoEndBehavior, DirectPoint, Preset};
use slider_common::control_unit::command::{Command, CommandOutcome, DriverSettings};
use slider_common::control_unit::error::CommandError;
use slider_common::control_unit::telemetry::InterpSource;
use slider_common::hal::driver::{AxisDriver, DriverError};
use tracing::{debug, info, trace};

use crate::command::homing::HOMING_AXIS;
use crate::command::queue::CommandResult;
use crate::control::scheduler::LegRequest;
use crate::controller::Controller;

const ACK: CommandResult = Ok(CommandOutcome::Ack);

impl<D: AxisDriver> Controller<D> {
    /// Validate and apply one command.
    pub fn execute(&mut self, command: Command) -> CommandResult {
        command.validate()?;
        if self.homing.is_seeking() && command.targets_axis(HOMING_AXIS) {
            return Err(CommandError::conflict("slide is homing"));
        }
        trace!("command {}", command.name());

        match command {
            Command::AbsoluteMove { axis, value } => self.absolute_move(axis, value),
            Command::SynchronizedMove { targets, duration_ms } => {
                self.synchronized_move(&targets, duration_ms)
            }
            Command::Jog { axis, speed } => self.jog(axis, speed),
            Command::JoystickConfig(cfg) => {
                self.joystick.set_config(cfg);
                ACK
            }
            Command::PresetSet { index, positions } => self.preset_set(index, &positions),
            Command::PresetStore { index } => self.preset_store(index),
            Command::PresetRecall { index, duration_ms } => self.preset_recall(index, duration_ms),
            Command::InterpSetpoints { points } => {
                self.banks.set_setpoints(&points)?;
                self.interp.load_bank(self.banks.active());
                ACK
            }
            Command::InterpSequence { points, duration_ms } => {
                self.interp_sequence(&points, duration_ms)
            }
            Command::InterpSequenceUpdate { points, duration_ms } => {
                self.interp_sequence_update(&points, duration_ms)
            }
            Command::InterpAuto { enable, duration_ms, end_behavior } => {
                self.interp_auto(enable, duration_ms, end_behavior)
            }
            Command::InterpGoto { fraction } => self.interp_goto(fraction),
            Command::InterpJog { speed } => self.interp_jog(speed),
            Command::BankSelect { index } => {
                self.banks.select(index)?;
                self.interp.load_bank(self.banks.active());
                self.offsets.reset_all();
                ACK
            }
            Command::BankSave { index } => {
                self.banks.save(index)?;
                ACK
            }
            Command::BankGet { index } => Ok(CommandOutcome::Bank(Box::new(self.banks.get(index)?))),
            Command::OffsetZero(mask) => {
                self.offsets.zero(mask);
                ACK
            }
            Command::OffsetAdd { deltas } => {
                self.offsets.add(&deltas);
                ACK
            }
            Command::OffsetSet { values } => {
                self.offsets.set(&values);
                ACK
            }
            Command::OffsetBake => {
                self.offsets.bake();
                ACK
            }
            Command::OffsetResetAll => {
                self.offsets.reset_all();
                ACK
            }
            Command::HomingStart => self.homing_start(),
            Command::HomingThreshold { value } => {
                let threshold = u8::try_from(value)
                    .map_err(|_| CommandError::validation(format!("threshold {value}")))?;
                self.homing.set_threshold(threshold);
                ACK
            }
            Command::DriverConfig { axis_id, microsteps, current_ma, spread_cycle } => {
                let settings = DriverSettings { microsteps, current_ma, spread_cycle };
                self.driver_config(axis_id, settings)
            }
            Command::AxisLimits { axis, min, max, max_speed, max_accel } => {
                self.axes.set_limits(axis, min, max, max_speed, max_accel);
                self.offsets.set_span(axis, self.axes.axis(axis).span());
                ACK
            }
            Command::Stop => {
                self.stop_all();
                ACK
            }
            Command::Status => Ok(CommandOutcome::Status(Box::new(self.status()))),
        }
    }

    // ─── Ownership ──────────────────────────────────────────────────

    /// True if interpolation is moving `axis` on its own.
    fn interp_drives(&self, axis: AxisId) -> bool {
        self.interp.is_driving() && self.interp.current()[axis].is_some()
    }

    /// Stop interpolation if it drives any of `axes`.
    fn yield_interp(&mut self, axes: impl IntoIterator<Item = AxisId>) {
        if let Some(axis) = axes.into_iter().find(|&a| self.interp_drives(a)) {
            info!("interp stopped by move on {axis}");
            self.interp.stop();
        }
    }

    /// Take `axes` out of the synchronized job, all or none.
    fn claim_axes(&mut self, axes: AxisArray<bool>) -> Result<(), CommandError> {
        let members: Vec<AxisId> = axes
            .iter()
            .filter(|&(axis, wanted)| *wanted && self.scheduler.member(axis))
            .map(|(axis, _)| axis)
            .collect();
        if members.is_empty() {
            return Ok(());
        }
        if !self.scheduler.auto_cancel() {
            return Err(CommandError::conflict(format!(
                "{} part of a synchronized move",
                members.iter().map(|a| a.name()).collect::<Vec<_>>().join(", ")
            )));
        }
        for axis in members {
            self.scheduler.release(axis);
        }
        Ok(())
    }

    /// Axes carried by the loaded interpolation path.
    fn path_axes(&self) -> AxisArray<bool> {
        AxisArray::from_fn(|axis| self.interp.points().iter().any(|p| p.positions[axis].is_some()))
    }

    fn require_path(&self) -> Result<(), CommandError> {
        if self.interp.is_loaded() {
            Ok(())
        } else {
            Err(CommandError::validation("no interpolation setpoints loaded"))
        }
    }

    // ─── Moves ──────────────────────────────────────────────────────

    fn absolute_move(&mut self, axis: AxisId, value: AxisValue) -> CommandResult {
        self.scheduler.claim_individual(axis)?;
        self.yield_interp([axis]);
        self.joystick.clear(axis);
        let steps = self.axes.set_absolute(axis, value);
        debug!("{axis}: move to {steps}");
        ACK
    }

    fn synchronized_move(
        &mut self,
        targets: &AxisArray<Option<AxisValue>>,
        duration_ms: Option<u32>,
    ) -> CommandResult {
        self.yield_interp(targets.present().map(|(axis, _)| axis));

        let requests = AxisArray::from_fn(|axis| {
            let value = targets[axis]?;
            let state = self.axes.axis(axis);
            let target = self.axes.resolve(axis, value);
            let output = state.clamp(target.saturating_add(self.offsets.total(axis)));
            Some(LegRequest {
                target,
                distance: output.saturating_sub(state.position),
                limits: state.limits(),
            })
        });
        for (axis, leg) in requests.present() {
            self.axes.set_target(axis, leg.target);
            self.joystick.clear(axis);
        }
        let report = self.scheduler.start(&requests, duration_ms);
        Ok(CommandOutcome::Move(report))
    }

    fn jog(&mut self, axis: AxisId, speed: f64) -> CommandResult {
        if speed != 0.0 && !speed.is_nan() {
            self.scheduler.claim_individual(axis)?;
        }
        self.joystick.set_input(axis, speed);
        ACK
    }

    // ─── Presets ────────────────────────────────────────────────────

    fn preset_set(&mut self, index: u8, positions: &AxisArray<Option<AxisValue>>) -> CommandResult {
        let mut preset = self.banks.preset(index).copied().unwrap_or_default();
        for (axis, value) in positions.present() {
            preset.positions[axis] = Some(self.axes.resolve(axis, *value));
        }
        self.banks.set_preset(index, preset)?;
        self.interp.refresh_bank(self.banks.active());
        ACK
    }

    /// Capture the current positions as targets, so offsets are not stored
    /// twice when the preset is recalled or interpolated.
    fn preset_store(&mut self, index: u8) -> CommandResult {
        let preset = Preset {
            positions: AxisArray::from_fn(|axis| {
                let state = self.axes.axis(axis);
                Some(state.clamp(state.position.saturating_sub(self.offsets.total(axis))))
            }),
        };
        self.banks.set_preset(index, preset)?;
        self.interp.refresh_bank(self.banks.active());
        debug!("preset {index} stored: {:?}", preset.positions.0);
        ACK
    }

    fn preset_recall(&mut self, index: u8, duration_ms: Option<u32>) -> CommandResult {
        let preset = self
            .banks
            .preset(index)
            .copied()
            .ok_or_else(|| CommandError::validation(format!("preset index {index} out of range")))?;
        if preset.is_empty() {
            return Err(CommandError::validation(format!("preset {index} is empty")));
        }
        if self.homing.is_seeking() && preset.get(HOMING_AXIS).is_some() {
            return Err(CommandError::conflict("slide is homing"));
        }
        let targets = preset.positions.map(|p| p.map(AxisValue::Steps));
        self.synchronized_move(&targets, duration_ms)
    }

    // ─── Interpolation ──────────────────────────────────────────────

    fn interp_sequence(&mut self, points: &[DirectPoint], duration_ms: u32) -> CommandResult {
        if duration_ms == 0 {
            return Err(CommandError::validation("sequence duration must be > 0"));
        }
        self.claim_axes(direct_axes(points))?;
        self.interp.load_sequence(points, &self.axes, duration_ms);
        ACK
    }

    fn interp_sequence_update(&mut self, points: &[DirectPoint], duration_ms: Option<u32>) -> CommandResult {
        if duration_ms == Some(0) {
            return Err(CommandError::validation("sequence duration must be > 0"));
        }
        if self.interp.source() != InterpSource::Sequence {
            return Err(CommandError::conflict("no direct sequence loaded"));
        }
        self.claim_axes(direct_axes(points))?;
        self.interp.update_sequence(points, &self.axes, duration_ms);
        ACK
    }

    fn interp_auto(
        &mut self,
        enable: bool,
        duration_ms: Option<u32>,
        end_behavior: Option<AutoEndBehavior>,
    ) -> CommandResult {
        if !enable {
            self.interp.stop_auto();
            return ACK;
        }
        self.require_path()?;
        let duration = duration_ms.unwrap_or(self.default_auto_ms);
        if duration == 0 {
            return Err(CommandError::validation("auto duration must be > 0"));
        }
        self.claim_axes(self.path_axes())?;
        self.interp.start_auto(duration, end_behavior);
        ACK
    }

    fn interp_goto(&mut self, fraction: f64) -> CommandResult {
        self.require_path()?;
        self.claim_axes(self.path_axes())?;
        let f = self.interp.goto(fraction);
        self.apply_interp();
        debug!("interp goto {f:.4}");
        ACK
    }

    fn interp_jog(&mut self, speed: f64) -> CommandResult {
        if speed == 0.0 || !speed.is_finite() {
            if self.interp.jogging() {
                self.interp.set_jog(0.0);
            }
            return ACK;
        }
        self.require_path()?;
        self.claim_axes(self.path_axes())?;
        self.interp.set_jog(speed);
        ACK
    }

    // ─── Homing & drivers ───────────────────────────────────────────

    fn homing_start(&mut self) -> CommandResult {
        if self.homing.start(&mut self.driver)? {
            self.scheduler.release(HOMING_AXIS);
            self.joystick.clear(HOMING_AXIS);
            self.last_output[HOMING_AXIS] = None;
        }
        ACK
    }

    fn driver_config(&mut self, axis_id: u8, settings: DriverSettings) -> CommandResult {
        let axis = AxisId::try_from(axis_id).map_err(|e| CommandError::Validation(e.to_string()))?;
        if !self.driver.is_configured() {
            return Err(CommandError::ConfigurationNotLoaded);
        }
        let inverted = self.axes.axis(axis).inverted;
        self.driver
            .apply_driver_config(axis, &settings, inverted)
            .map_err(|e| match e {
                DriverError::NotConfigured => CommandError::ConfigurationNotLoaded,
                other => CommandError::conflict(other.to_string()),
            })?;
        self.axes.set_driver_config(axis, settings);
        ACK
    }

    /// Halt everything and hold the current positions.
    pub(crate) fn stop_all(&mut self) {
        self.scheduler.cancel_all();
        self.interp.stop();
        self.joystick.clear_all();
        self.homing.abort(&mut self.driver);
        for axis in AxisId::ALL {
            self.hold_axis(axis);
            self.driver.stop(axis);
        }
        info!("stop: all motion halted");
    }
}

/// Axes carried by any point of a direct sequence.
fn direct_axes(points: &[DirectPoint]) -> AxisArray<bool> {
    AxisArray::from_fn(|axis| points.iter().any(|p| p.positions[axis].is_some()))
}
