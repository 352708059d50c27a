//! Axis identifiers and fixed-size per-axis containers.
//!
//! Every per-axis quantity in the workspace lives in an [`AxisArray`],
//! indexed by [`AxisId`]. No heap allocation, `Copy` whenever `T` is.

use core::fmt;
use core::ops::{Index, IndexMut};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::{AXIS_COUNT, AXIS_STEPS_MAX};

/// One of the four slider axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum AxisId {
    Pan = 0,
    Tilt = 1,
    Zoom = 2,
    Slide = 3,
}

impl AxisId {
    /// All axes in index order.
    pub const ALL: [AxisId; AXIS_COUNT] = [Self::Pan, Self::Tilt, Self::Zoom, Self::Slide];

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Pan),
            1 => Some(Self::Tilt),
            2 => Some(Self::Zoom),
            3 => Some(Self::Slide),
            _ => None,
        }
    }

    /// Array index of this axis.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase axis name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pan => "pan",
            Self::Tilt => "tilt",
            Self::Zoom => "zoom",
            Self::Slide => "slide",
        }
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown axis name or id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown axis '{0}'")]
pub struct UnknownAxis(pub String);

impl FromStr for AxisId {
    type Err = UnknownAxis;

    /// Accepts full names and the single-letter forms used by presets (`p`, `t`, `z`, `s`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pan" | "p" => Ok(Self::Pan),
            "tilt" | "t" => Ok(Self::Tilt),
            "zoom" | "z" => Ok(Self::Zoom),
            "slide" | "s" => Ok(Self::Slide),
            _ => Err(UnknownAxis(s.to_string())),
        }
    }
}

impl TryFrom<u8> for AxisId {
    type Error = UnknownAxis;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or_else(|| UnknownAxis(value.to_string()))
    }
}

/// Fixed-size array holding one value per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AxisArray<T>(pub [T; AXIS_COUNT]);

impl<T> AxisArray<T> {
    /// Build an array by evaluating `f` for each axis.
    pub fn from_fn(mut f: impl FnMut(AxisId) -> T) -> Self {
        Self(core::array::from_fn(|i| f(AxisId::ALL[i])))
    }

    /// Iterate `(axis, &value)` pairs in axis order.
    pub fn iter(&self) -> impl Iterator<Item = (AxisId, &T)> {
        AxisId::ALL.into_iter().zip(self.0.iter())
    }

    /// Iterate `(axis, &mut value)` pairs in axis order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (AxisId, &mut T)> {
        AxisId::ALL.into_iter().zip(self.0.iter_mut())
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> AxisArray<U> {
        AxisArray(self.0.map(f))
    }
}

impl<T: Copy> AxisArray<T> {
    /// Array with every axis set to `value`.
    pub const fn splat(value: T) -> Self {
        Self([value; AXIS_COUNT])
    }
}

impl<T> AxisArray<Option<T>> {
    /// Axes that carry a value.
    pub fn present(&self) -> impl Iterator<Item = (AxisId, &T)> {
        self.iter().filter_map(|(axis, v)| v.as_ref().map(|v| (axis, v)))
    }

    /// True if no axis carries a value.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

impl<T> Index<AxisId> for AxisArray<T> {
    type Output = T;

    #[inline]
    fn index(&self, axis: AxisId) -> &T {
        &self.0[axis.index()]
    }
}

impl<T> IndexMut<AxisId> for AxisArray<T> {
    #[inline]
    fn index_mut(&mut self, axis: AxisId) -> &mut T {
        &mut self.0[axis.index()]
    }
}

/// A position value addressed to one axis.
///
/// Normalized values map `[0, 1]` onto the axis limits; raw values are
/// absolute steps. Both are clamped on write, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum AxisValue {
    Normalized(f64),
    Steps(i64),
}

/// Check a `[min, max]` travel range: non-empty and within
/// `±AXIS_STEPS_MAX`.
pub fn validate_limits(min: i64, max: i64) -> Result<(), String> {
    if min >= max {
        return Err(format!("limits [{min}, {max}] are empty"));
    }
    if min < -AXIS_STEPS_MAX || max > AXIS_STEPS_MAX {
        return Err(format!("limits [{min}, {max}] exceed ±{AXIS_STEPS_MAX} steps"));
    }
    Ok(())
}
