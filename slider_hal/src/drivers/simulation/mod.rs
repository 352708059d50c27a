//! Simulation driver module.
//!
//! Software model of four stepper drivers with trapezoidal motion and a
//! load-based stall signal, for development and testing without hardware.

mod driver;
mod stepper;

pub use driver::SimulatedDriver;
pub use stepper::{FREE_RUN_LOAD, StepperMode, StepperSimulator};
