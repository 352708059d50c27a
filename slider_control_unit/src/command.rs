//! Command intake, dispatch and slide homing.

pub mod dispatch;
pub mod homing;
pub mod queue;
