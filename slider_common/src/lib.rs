//! Slider Common Library
//!
//! Shared types for every crate of the camera slider workspace: axis
//! identifiers, constants, configuration loading, the command sum type
//! consumed by the control unit, telemetry payloads, and the capability
//! traits implemented by driver and storage backends.
//!
//! # Module Structure
//!
//! - [`axis`] - Axis identifiers and per-axis arrays
//! - [`consts`] - System-wide limits and defaults
//! - [`config`] - TOML configuration loading
//! - [`control_unit`] - Types shared with the control unit (commands, errors, telemetry)
//! - [`hal`] - Axis-driver and bank-storage capabilities
//! - [`prelude`] - Common re-exports for convenience

pub mod axis;
pub mod config;
pub mod consts;
pub mod control_unit;
pub mod hal;
pub mod prelude;
