//! Capability interfaces implemented by backends.
//!
//! The control unit never talks to hardware or disks directly: motion goes
//! through [`driver::AxisDriver`], bank persistence through
//! [`storage::BankStorage`].

pub mod driver;
pub mod storage;
