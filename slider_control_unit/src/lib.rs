//! # Slider Control Unit Library
//!
//! Motion core of a 4-axis camera slider (pan, tilt, zoom, slide). A single
//! fixed-rate tick owns all controller state: it drains queued commands,
//! shapes joystick input, advances interpolation and synchronized moves,
//! composes per-axis outputs with latched offsets, and hands changed
//! targets to the axis driver.
//!
//! ## Module Map
//!
//! - [`state`] - AxisModel, OffsetManager, BankStore, InterpolationEngine
//! - [`control`] - JoystickShaper, filters, trapezoid profiles, MotionScheduler
//! - [`command`] - command queue, dispatcher, HomingController
//! - [`controller`] - the `Controller` aggregate and its tick
//! - [`telemetry`] - 5 Hz position fan-out
//! - [`persistence`] - bank save worker outside the tick
//! - [`cycle`] - cycle pacing, statistics, RT setup
//!
//! ## Lock-Free Core
//!
//! Transports and persistence only reach the core through the command
//! queue and the telemetry channel. The tick is the sole mutator.

pub mod command;
pub mod config;
pub mod control;
pub mod controller;
pub mod cycle;
pub mod persistence;
pub mod state;
pub mod telemetry;
