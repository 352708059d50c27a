//! In-memory bank storage.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use slider_common::control_unit::bank::Bank;
use slider_common::hal::storage::{BankStorage, StorageError};

/// Bank storage kept in memory.
///
/// Clones share the same map, so a test can keep one handle and move the
/// other into the persistence worker.
#[derive(Debug, Clone, Default)]
pub struct MemoryBankStorage {
    banks: Arc<Mutex<BTreeMap<u8, Bank>>>,
}

impl MemoryBankStorage {
    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with `banks`.
    pub fn with_banks(banks: impl IntoIterator<Item = Bank>) -> Self {
        let storage = Self::new();
        if let Ok(mut map) = storage.banks.lock() {
            map.extend(banks.into_iter().map(|b| (b.index, b)));
        }
        storage
    }

    /// Copy of the stored bank with `index`.
    pub fn get(&self, index: u8) -> Option<Bank> {
        self.banks.lock().ok()?.get(&index).cloned()
    }

    /// Number of stored banks.
    pub fn len(&self) -> usize {
        self.banks.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BankStorage for MemoryBankStorage {
    fn load_all(&mut self) -> Result<Vec<Bank>, StorageError> {
        let map = self
            .banks
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(map.values().cloned().collect())
    }

    fn save(&mut self, bank: &Bank) -> Result<(), StorageError> {
        let mut map = self
            .banks
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        map.insert(bank.index, bank.clone());
        Ok(())
    }
}
