//! File-backed bank storage.
//!
//! All saved banks live in one file, serialized with bincode. A save
//! rewrites the whole file through a temporary sibling and a rename.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use slider_common::control_unit::bank::Bank;
use slider_common::hal::storage::{BankStorage, StorageError};
use tracing::{debug, info, warn};

/// On-disk bank file contents.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PersistedBanks {
    /// Format version (for migration).
    pub version: u32,
    /// Saved banks, at most one per index.
    pub banks: Vec<Bank>,
    /// Timestamp of last save (Unix epoch seconds).
    pub saved_at: u64,
}

impl PersistedBanks {
    /// Current file format version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Empty contents at the current version.
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            banks: Vec::new(),
            saved_at: 0,
        }
    }
}

/// Bank storage in a single bincode file.
#[derive(Debug, Clone)]
pub struct FileBankStorage {
    path: PathBuf,
}

impl FileBankStorage {
    /// Storage at `path`. Nothing is touched until the first load or save.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Bank file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<PersistedBanks>, StorageError> {
        if !self.path.exists() {
            debug!("bank file {:?} does not exist", self.path);
            return Ok(None);
        }

        let file = File::open(&self.path)
            .map_err(|e| StorageError::Io(format!("failed to open bank file: {e}")))?;
        let contents: PersistedBanks = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| StorageError::Corrupt(format!("failed to decode bank file: {e}")))?;

        if contents.version != PersistedBanks::CURRENT_VERSION {
            warn!(
                "bank file version {} differs from current {}, ignoring it",
                contents.version,
                PersistedBanks::CURRENT_VERSION
            );
            return Ok(None);
        }
        Ok(Some(contents))
    }

    fn write(&self, contents: &PersistedBanks) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::Io(format!("failed to create directory: {e}")))?;
        }

        let tmp = self.path.with_extension("tmp");
        let file = File::create(&tmp)
            .map_err(|e| StorageError::Io(format!("failed to create bank file: {e}")))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, contents)
            .map_err(|e| StorageError::Encode(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| StorageError::Io(format!("failed to flush bank file: {e}")))?;
        drop(writer);

        fs::rename(&tmp, &self.path)
            .map_err(|e| StorageError::Io(format!("failed to replace bank file: {e}")))
    }
}

impl BankStorage for FileBankStorage {
    fn load_all(&mut self) -> Result<Vec<Bank>, StorageError> {
        let banks = self.read()?.map(|c| c.banks).unwrap_or_default();
        info!("loaded {} banks from {:?}", banks.len(), self.path);
        Ok(banks)
    }

    fn save(&mut self, bank: &Bank) -> Result<(), StorageError> {
        // A corrupt file is replaced rather than blocking every later save.
        let mut contents = match self.read() {
            Ok(Some(c)) => c,
            Ok(None) => PersistedBanks::new(),
            Err(e) => {
                warn!("overwriting unreadable bank file: {e}");
                PersistedBanks::new()
            }
        };

        contents.banks.retain(|b| b.index != bank.index);
        contents.banks.push(bank.clone());
        contents.banks.sort_by_key(|b| b.index);
        contents.saved_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        self.write(&contents)?;
        info!("saved bank {} to {:?}", bank.index, self.path);
        Ok(())
    }
}
