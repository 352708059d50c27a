//! OffsetManager: latched additive offsets and their baked baselines.
//!
//! The commanded output of an axis is `target + baseline + live`, clamped
//! to the axis limits. `live` is latched until zeroed or baked; `bake`
//! folds it into `baseline` so the output does not move.

use slider_common::axis::{AxisArray, AxisId};
use slider_common::control_unit::command::ZeroMask;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct OffsetManager {
    live: AxisArray<i64>,
    baseline: AxisArray<i64>,
    /// Largest live offset magnitude per axis (the axis travel).
    span: AxisArray<i64>,
}

impl OffsetManager {
    pub fn new(span: AxisArray<i64>) -> Self {
        Self {
            live: AxisArray::splat(0),
            baseline: AxisArray::splat(0),
            span,
        }
    }

    #[inline]
    pub fn live(&self, axis: AxisId) -> i64 {
        self.live[axis]
    }

    #[inline]
    pub fn baseline(&self, axis: AxisId) -> i64 {
        self.baseline[axis]
    }

    /// Baseline plus live offset.
    #[inline]
    pub fn total(&self, axis: AxisId) -> i64 {
        self.baseline[axis].saturating_add(self.live[axis])
    }

    pub fn set_span(&mut self, axis: AxisId, span: i64) {
        self.span[axis] = span.max(0);
        self.live[axis] = self.bound(axis, self.live[axis]);
    }

    fn bound(&self, axis: AxisId, value: i64) -> i64 {
        let span = self.span[axis];
        value.clamp(-span, span)
    }

    /// Accumulate into the live offsets.
    pub fn add(&mut self, deltas: &AxisArray<i64>) {
        for (axis, delta) in deltas.iter() {
            self.add_axis(axis, *delta);
        }
    }

    pub fn add_axis(&mut self, axis: AxisId, delta: i64) {
        self.live[axis] = self.bound(axis, self.live[axis].saturating_add(delta));
    }

    /// Overwrite the given live offsets, leaving the rest unchanged.
    pub fn set(&mut self, values: &AxisArray<Option<i64>>) {
        for (axis, value) in values.present() {
            self.live[axis] = self.bound(axis, *value);
        }
    }

    /// Clear the selected live offsets.
    pub fn zero(&mut self, mask: ZeroMask) {
        for axis in AxisId::ALL {
            if mask.contains(axis) {
                self.live[axis] = 0;
            }
        }
    }

    /// Fold live offsets into the baselines.
    pub fn bake(&mut self) {
        for axis in AxisId::ALL {
            self.baseline[axis] = self.baseline[axis].saturating_add(self.live[axis]);
            self.live[axis] = 0;
        }
        debug!("offsets baked, baseline {:?}", self.baseline.0);
    }

    /// Clear live offset and baseline of one axis.
    pub fn clear_axis(&mut self, axis: AxisId) {
        self.live[axis] = 0;
        self.baseline[axis] = 0;
    }

    /// Clear every offset and baseline.
    pub fn reset_all(&mut self) {
        self.live = AxisArray::splat(0);
        self.baseline = AxisArray::splat(0);
    }

    /// True if any live offset or baseline is non-zero.
    pub fn any(&self) -> bool {
        AxisId::ALL
            .iter()
            .any(|&a| self.live[a] != 0 || self.baseline[a] != 0)
    }
}
