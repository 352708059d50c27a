//! InterpolationEngine: fraction → blended multi-axis position.
//!
//! Setpoints come either from the active bank (preset references, resolved
//! to absolute steps on load) or from a direct sequence (normalized
//! positions, resolved against the axis limits on load). The fraction is
//! moved by `goto`, by interpolation jog, or by auto mode.
//!
//! ```text
//!   f ≤ f₀        → point 0
//!   fᵢ ≤ f ≤ fᵢ₊₁ → lerp(pᵢ, pᵢ₊₁, (f - fᵢ) / (fᵢ₊₁ - fᵢ))
//!   f ≥ fₙ        → point n
//! ```

use std::time::Duration;

use heapless::Vec as HVec;
use slider_common::axis::{AxisArray, AxisId};
use slider_common::consts::{MAX_INTERP_POINTS, MIN_INTERP_POINTS};
use slider_common::control_unit::bank::{AutoEndBehavior, Bank, DirectPoint};
use slider_common::control_unit::telemetry::{InterpSource, InterpStatus};
use tracing::{debug, info};

use super::axis::AxisModel;

/// Setpoint resolved to absolute steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPoint {
    pub fraction: f64,
    pub positions: AxisArray<Option<i64>>,
}

type PointList = HVec<ResolvedPoint, MAX_INTERP_POINTS>;

/// One leg of auto mode: `from → to` over `duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AutoRun {
    from: f64,
    to: f64,
    duration: f64,
    elapsed: f64,
}

impl AutoRun {
    fn fraction(&self) -> f64 {
        if self.duration <= 0.0 {
            return self.to;
        }
        self.from + (self.to - self.from) * (self.elapsed / self.duration).min(1.0)
    }
}

#[derive(Debug, Clone)]
pub struct InterpolationEngine {
    source: InterpSource,
    points: PointList,
    fraction: f64,
    auto: Option<AutoRun>,
    /// Full 0→1 auto duration [s].
    auto_duration: f64,
    default_end: AutoEndBehavior,
    end_behavior: AutoEndBehavior,
    /// Fraction velocity [1/s].
    jog_speed: f64,
    jog_age: Duration,
    watchdog: Duration,
}

impl InterpolationEngine {
    pub fn new(end_behavior: AutoEndBehavior, default_auto_ms: u32, watchdog: Duration) -> Self {
        Self {
            source: InterpSource::None,
            points: PointList::new(),
            fraction: 0.0,
            auto: None,
            auto_duration: f64::from(default_auto_ms) / 1000.0,
            default_end: end_behavior,
            end_behavior,
            jog_speed: 0.0,
            jog_age: Duration::ZERO,
            watchdog,
        }
    }

    pub fn set_watchdog(&mut self, watchdog: Duration) {
        self.watchdog = watchdog;
    }

    // ─── Loading ────────────────────────────────────────────────────

    fn resolve_bank(bank: &Bank) -> PointList {
        let mut list = PointList::new();
        for p in &bank.interp_points {
            let positions = bank
                .presets
                .get(usize::from(p.preset_index))
                .map(|preset| preset.positions)
                .unwrap_or_default();
            // Capacity matches SetpointList.
            let _ = list.push(ResolvedPoint { fraction: p.fraction, positions });
        }
        list
    }

    fn install(&mut self, source: InterpSource, points: PointList) {
        if points.len() >= MIN_INTERP_POINTS {
            self.source = source;
            self.points = points;
        } else {
            self.source = InterpSource::None;
            self.points.clear();
        }
    }

    /// Replace the setpoints with the bank's and stop auto and jog.
    pub fn load_bank(&mut self, bank: &Bank) {
        self.stop();
        self.install(InterpSource::Bank, Self::resolve_bank(bank));
        debug!("interp: bank {} loaded, {} points", bank.index, self.points.len());
    }

    /// Re-resolve bank setpoints after a preset or setpoint edit.
    ///
    /// Leaves a running direct sequence alone.
    pub fn refresh_bank(&mut self, bank: &Bank) {
        if self.source == InterpSource::Sequence {
            return;
        }
        self.install(InterpSource::Bank, Self::resolve_bank(bank));
        if self.points.is_empty() {
            self.stop();
        }
    }

    fn resolve_direct(points: &[DirectPoint], axes: &AxisModel) -> PointList {
        let mut list = PointList::new();
        for p in points.iter().take(MAX_INTERP_POINTS) {
            let positions = AxisArray::from_fn(|axis| {
                p.positions[axis].and_then(|v| axes.axis(axis).denormalize(v))
            });
            let _ = list.push(ResolvedPoint { fraction: p.fraction, positions });
        }
        list
    }

    /// Load a direct sequence and run it in auto mode from fraction 0.
    pub fn load_sequence(&mut self, points: &[DirectPoint], axes: &AxisModel, duration_ms: u32) {
        self.stop();
        self.install(InterpSource::Sequence, Self::resolve_direct(points, axes));
        self.fraction = 0.0;
        if self.is_loaded() {
            self.start_auto(duration_ms, None);
        }
        info!("interp: sequence of {} points over {duration_ms} ms", self.points.len());
    }

    /// Swap direct sequence points in place, keeping fraction and auto state.
    ///
    /// With `duration_ms`, the running leg is re-timed so the full path
    /// takes that long from the current fraction onward.
    pub fn update_sequence(
        &mut self,
        points: &[DirectPoint],
        axes: &AxisModel,
        duration_ms: Option<u32>,
    ) {
        self.install(InterpSource::Sequence, Self::resolve_direct(points, axes));
        if let Some(ms) = duration_ms {
            self.auto_duration = f64::from(ms) / 1000.0;
            if let Some(run) = &mut self.auto {
                let f = run.fraction();
                run.from = f;
                run.elapsed = 0.0;
                run.duration = self.auto_duration * (run.to - f).abs();
            }
        }
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.points.len() >= MIN_INTERP_POINTS
    }

    #[inline]
    pub fn source(&self) -> InterpSource {
        self.source
    }

    #[inline]
    pub fn points(&self) -> &[ResolvedPoint] {
        &self.points
    }

    // ─── Fraction control ───────────────────────────────────────────

    #[inline]
    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Jump to `fraction` (clamped), stopping auto and jog.
    pub fn goto(&mut self, fraction: f64) -> f64 {
        self.stop();
        if fraction.is_finite() {
            self.fraction = fraction.clamp(0.0, 1.0);
        }
        self.fraction
    }

    /// Start auto mode toward 1, reaching it after `duration_ms` from the
    /// current fraction. Starting at 1 rewinds to 0 first.
    pub fn start_auto(&mut self, duration_ms: u32, end: Option<AutoEndBehavior>) {
        self.jog_speed = 0.0;
        self.auto_duration = f64::from(duration_ms) / 1000.0;
        self.end_behavior = end.unwrap_or(self.default_end);
        if self.fraction >= 1.0 {
            self.fraction = 0.0;
        }
        self.auto = Some(AutoRun {
            from: self.fraction,
            to: 1.0,
            duration: self.auto_duration,
            elapsed: 0.0,
        });
        debug!("interp: auto on, {duration_ms} ms, {:?}", self.end_behavior);
    }

    pub fn stop_auto(&mut self) {
        if self.auto.take().is_some() {
            debug!("interp: auto off at {:.4}", self.fraction);
        }
    }

    /// Set the fraction velocity [1/s]. Non-finite input stops the jog.
    pub fn set_jog(&mut self, speed: f64) {
        self.stop_auto();
        self.jog_speed = if speed.is_finite() { speed } else { 0.0 };
        self.jog_age = Duration::ZERO;
    }

    /// Stop auto and jog, holding the current fraction.
    pub fn stop(&mut self) {
        self.auto = None;
        self.jog_speed = 0.0;
    }

    #[inline]
    pub fn auto_enabled(&self) -> bool {
        self.auto.is_some()
    }

    #[inline]
    pub fn jogging(&self) -> bool {
        self.jog_speed != 0.0
    }

    /// True while the fraction moves on its own each tick.
    #[inline]
    pub fn is_driving(&self) -> bool {
        self.is_loaded() && (self.auto_enabled() || self.jogging())
    }

    /// Advance auto or jog by `dt`. Returns true if the fraction moved.
    pub fn advance(&mut self, dt: Duration) -> bool {
        let before = self.fraction;
        let dt_s = dt.as_secs_f64();

        if let Some(mut run) = self.auto {
            let mut left = dt_s;
            loop {
                let leg_left = (run.duration - run.elapsed).max(0.0);
                if left < leg_left {
                    run.elapsed += left;
                    self.fraction = run.fraction();
                    self.auto = Some(run);
                    break;
                }
                left -= leg_left;
                self.fraction = run.to;
                let next = match self.end_behavior {
                    AutoEndBehavior::Hold => None,
                    AutoEndBehavior::Loop => Some((0.0, 1.0)),
                    AutoEndBehavior::PingPong => Some((run.to, 1.0 - run.to)),
                };
                match next {
                    Some((from, to)) if self.auto_duration > 0.0 => {
                        self.fraction = from;
                        run = AutoRun { from, to, duration: self.auto_duration, elapsed: 0.0 };
                    }
                    _ => {
                        self.auto = None;
                        debug!("interp: auto finished at {:.4}", self.fraction);
                        break;
                    }
                }
            }
        } else if self.jog_speed != 0.0 {
            if !self.watchdog.is_zero() && self.jog_age >= self.watchdog {
                debug!("interp: jog input timed out");
                self.jog_speed = 0.0;
            } else {
                self.fraction = (self.fraction + self.jog_speed * dt_s).clamp(0.0, 1.0);
                self.jog_age += dt;
            }
        }

        self.fraction != before
    }

    // ─── Evaluation ─────────────────────────────────────────────────

    /// Positions at fraction `f`. Axes absent from a bracketing point are `None`.
    pub fn evaluate(&self, f: f64) -> AxisArray<Option<i64>> {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return AxisArray::default();
        };
        if self.points.len() < MIN_INTERP_POINTS {
            return AxisArray::default();
        }
        if f <= first.fraction || f.is_nan() {
            return first.positions;
        }
        if f >= last.fraction {
            return last.positions;
        }
        for pair in self.points.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.fraction <= f && f <= b.fraction {
                let t = (f - a.fraction) / (b.fraction - a.fraction);
                return AxisArray::from_fn(|axis| lerp_axis(a, b, axis, t));
            }
        }
        last.positions
    }

    /// Positions at the current fraction.
    #[inline]
    pub fn current(&self) -> AxisArray<Option<i64>> {
        self.evaluate(self.fraction)
    }

    pub fn status(&self) -> InterpStatus {
        InterpStatus {
            source: self.source,
            fraction: self.fraction,
            point_count: self.points.len(),
            auto_enabled: self.auto_enabled(),
            auto_duration_ms: (self.auto_duration * 1000.0).round() as u32,
            end_behavior: self.end_behavior,
            jog_speed: self.jog_speed,
        }
    }
}

fn lerp_axis(a: &ResolvedPoint, b: &ResolvedPoint, axis: AxisId, t: f64) -> Option<i64> {
    let (pa, pb) = (a.positions[axis]?, b.positions[axis]?);
    let (fa, fb) = (pa as f64, pb as f64);
    Some((fa + (fb - fa) * t).round() as i64)
}
