//! Axis-driver backends.
//!
//! - [`simulation`] - Deterministic stepper simulation for development and tests
//!
//! Hardware backends implement `slider_common::hal::driver::AxisDriver` the
//! same way and plug into the control unit unchanged.

pub mod simulation;
