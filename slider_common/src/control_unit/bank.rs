//! Bank, preset and interpolation setpoint types.
//!
//! A bank holds ten presets and up to six interpolation setpoints that
//! reference those presets by index. Exactly one bank is active at a time.

use serde::{Deserialize, Serialize};

use crate::axis::{AxisArray, AxisId};
use crate::consts::{BANK_COUNT, MAX_INTERP_POINTS, MIN_INTERP_POINTS, PRESET_COUNT};

/// Stored absolute position per axis. Axes are independently optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preset {
    pub positions: AxisArray<Option<i64>>,
}

impl Preset {
    /// True if no axis position is defined.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn get(&self, axis: AxisId) -> Option<i64> {
        self.positions[axis]
    }
}

/// Setpoint placing a stored preset at a fraction of the interpolation path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterpPoint {
    pub preset_index: u8,
    pub fraction: f64,
}

/// Setpoint carrying its own normalized per-axis positions.
///
/// Used by direct sequences, which are never stored in a bank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectPoint {
    pub fraction: f64,
    #[serde(default)]
    pub positions: AxisArray<Option<f64>>,
}

/// What auto mode does once the fraction reaches 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoEndBehavior {
    /// Stop at 1 and leave auto mode.
    #[default]
    Hold,
    /// Restart from 0.
    Loop,
    /// Reverse direction at each end.
    PingPong,
}

/// Setpoint list storage. Capacity matches the setpoint limit.
pub type SetpointList = heapless::Vec<InterpPoint, MAX_INTERP_POINTS>;

/// One bank of presets and interpolation setpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bank {
    pub index: u8,
    pub presets: [Preset; PRESET_COUNT],
    /// Empty, or 2..=6 points validated by [`validate_fractions`].
    pub interp_points: SetpointList,
}

impl Bank {
    /// Bank with no presets and no setpoints.
    pub fn empty(index: u8) -> Self {
        Self {
            index,
            presets: [Preset::default(); PRESET_COUNT],
            interp_points: SetpointList::new(),
        }
    }

    /// Check index, preset references and setpoint ordering.
    pub fn validate(&self) -> Result<(), String> {
        validate_bank_index(self.index)?;
        if !self.interp_points.is_empty() {
            validate_setpoints(&self.interp_points)?;
        }
        Ok(())
    }
}

pub fn validate_bank_index(index: u8) -> Result<(), String> {
    if usize::from(index) >= BANK_COUNT {
        return Err(format!("bank index {index} out of range 0..{BANK_COUNT}"));
    }
    Ok(())
}

pub fn validate_preset_index(index: u8) -> Result<(), String> {
    if usize::from(index) >= PRESET_COUNT {
        return Err(format!("preset index {index} out of range 0..{PRESET_COUNT}"));
    }
    Ok(())
}

/// Fractions must number 2..=6, lie in `[0, 1]` and be strictly ascending.
pub fn validate_fractions(fractions: impl ExactSizeIterator<Item = f64>) -> Result<(), String> {
    let count = fractions.len();
    if !(MIN_INTERP_POINTS..=MAX_INTERP_POINTS).contains(&count) {
        return Err(format!(
            "need {MIN_INTERP_POINTS}..={MAX_INTERP_POINTS} setpoints, got {count}"
        ));
    }
    let mut previous: Option<f64> = None;
    for f in fractions {
        if !(0.0..=1.0).contains(&f) {
            return Err(format!("setpoint fraction {f} outside [0, 1]"));
        }
        if let Some(p) = previous
            && f <= p
        {
            return Err(format!("setpoint fractions not strictly ascending at {f}"));
        }
        previous = Some(f);
    }
    Ok(())
}

pub fn validate_setpoints(points: &[InterpPoint]) -> Result<(), String> {
    for p in points {
        validate_preset_index(p.preset_index)?;
    }
    validate_fractions(points.iter().map(|p| p.fraction))
}

pub fn validate_direct_points(points: &[DirectPoint]) -> Result<(), String> {
    for p in points {
        if p.positions.present().any(|(_, v)| !v.is_finite()) {
            return Err(format!("non-finite position at fraction {}", p.fraction));
        }
    }
    validate_fractions(points.iter().map(|p| p.fraction))
}
