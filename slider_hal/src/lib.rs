//! # Slider HAL Library
//!
//! Backends for the capabilities defined in `slider_common::hal`.
//!
//! # Module Structure
//!
//! - [`drivers`] - Axis-driver backends
//! - [`storage`] - Bank storage backends
//!
//! ```text
//! ┌────────────────────────┐        ┌──────────────────────────┐
//! │  slider_control_unit   │        │  persistence worker      │
//! │  (tick loop)           │        │  (outside the tick)      │
//! └───────────┬────────────┘        └────────────┬─────────────┘
//!             │ AxisDriver                       │ BankStorage
//!             ▼                                  ▼
//!   ┌───────────────────┐           ┌──────────────────────────┐
//!   │  SimulatedDriver  │           │  FileBankStorage         │
//!   │  (stepper model)  │           │  MemoryBankStorage       │
//!   └───────────────────┘           └──────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod drivers;
pub mod storage;

pub use crate::drivers::simulation::SimulatedDriver;
pub use crate::storage::{FileBankStorage, MemoryBankStorage};
