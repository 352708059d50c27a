//! Controller state owned by the tick.

pub mod axis;
pub mod bank;
pub mod interp;
pub mod offset;
