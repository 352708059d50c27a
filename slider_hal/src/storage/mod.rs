//! Bank storage backends.
//!
//! - [`file`] - Single bincode file holding every saved bank
//! - [`memory`] - In-process map, shared between handles

pub mod file;
pub mod memory;

pub use file::{FileBankStorage, PersistedBanks};
pub use memory::MemoryBankStorage;
