//! Motion generation: input shaping, profiles and move scheduling.

pub mod filters;
pub mod joystick;
pub mod profile;
pub mod scheduler;
