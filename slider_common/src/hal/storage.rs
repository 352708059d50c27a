//! Bank storage capability.
//!
//! Persistence runs outside the control tick. Backends make no durability
//! promises beyond what the underlying medium provides.

use thiserror::Error;

use crate::control_unit::bank::Bank;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Stored data could not be decoded.
    #[error("corrupt bank data: {0}")]
    Corrupt(String),

    #[error("bank encoding failed: {0}")]
    Encode(String),
}

/// Load and store banks.
pub trait BankStorage: Send {
    /// Every stored bank, in any order. Missing storage yields an empty list.
    fn load_all(&mut self) -> Result<Vec<Bank>, StorageError>;

    /// Store one bank, replacing any bank with the same index.
    fn save(&mut self, bank: &Bank) -> Result<(), StorageError>;
}
