//! Control unit shared types.
//!
//! Everything the control unit exchanges with transports, backends and
//! tools lives here: configuration, the command sum type and its replies,
//! the error taxonomy, bank/preset data, joystick and homing parameters,
//! and telemetry payloads.

pub mod bank;
pub mod command;
pub mod config;
pub mod error;
pub mod homing;
pub mod joystick;
pub mod telemetry;
