//! BankStore: ten banks of presets and setpoints, one of them active.
//!
//! Storage I/O never happens here. Banks are handed in at startup and
//! saves are queued as snapshots for the persistence worker.

use slider_common::consts::BANK_COUNT;
use slider_common::control_unit::bank::{Bank, InterpPoint, Preset, SetpointList};
use slider_common::control_unit::error::CommandError;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct BankStore {
    banks: Vec<Bank>,
    active: u8,
    pending_saves: Vec<Bank>,
}

impl BankStore {
    /// Build the store from loaded banks.
    ///
    /// Banks failing validation are replaced by empty banks. Missing
    /// indices start empty. Bank 0 is active.
    pub fn new(loaded: Vec<Bank>) -> Self {
        let mut banks: Vec<Bank> = (0..BANK_COUNT as u8).map(Bank::empty).collect();
        for bank in loaded {
            match bank.validate() {
                Ok(()) => {
                    let slot = usize::from(bank.index);
                    banks[slot] = bank;
                }
                Err(e) => warn!("discarding stored bank {}: {e}", bank.index),
            }
        }
        Self { banks, active: 0, pending_saves: Vec::new() }
    }

    #[inline]
    pub fn active_index(&self) -> u8 {
        self.active
    }

    #[inline]
    pub fn active(&self) -> &Bank {
        &self.banks[usize::from(self.active)]
    }

    fn active_mut(&mut self) -> &mut Bank {
        &mut self.banks[usize::from(self.active)]
    }

    fn slot(&self, index: u8) -> Result<&Bank, CommandError> {
        self.banks
            .get(usize::from(index))
            .ok_or_else(|| CommandError::validation(format!("bank index {index} out of range")))
    }

    /// Make `index` the active bank and return it.
    pub fn select(&mut self, index: u8) -> Result<&Bank, CommandError> {
        self.slot(index)?;
        if index != self.active {
            info!("bank {} -> {index}", self.active);
        }
        self.active = index;
        Ok(self.active())
    }

    /// Copy of bank `index`, without activating it.
    pub fn get(&self, index: u8) -> Result<Bank, CommandError> {
        self.slot(index).cloned()
    }

    /// Queue the active bank for persistence, under `index` if given.
    ///
    /// Saving under another index also copies the bank into that slot.
    pub fn save(&mut self, index: Option<u8>) -> Result<(), CommandError> {
        let target = index.unwrap_or(self.active);
        self.slot(target)?;
        let mut snapshot = self.active().clone();
        snapshot.index = target;
        if target != self.active {
            self.banks[usize::from(target)] = snapshot.clone();
        }
        debug!("bank {target} queued for save");
        self.pending_saves.push(snapshot);
        Ok(())
    }

    /// Snapshots queued since the last call.
    pub fn take_pending_saves(&mut self) -> Vec<Bank> {
        std::mem::take(&mut self.pending_saves)
    }

    #[inline]
    pub fn preset(&self, index: u8) -> Option<&Preset> {
        self.active().presets.get(usize::from(index))
    }

    /// Replace preset `index` of the active bank.
    pub fn set_preset(&mut self, index: u8, preset: Preset) -> Result<(), CommandError> {
        let slot = self
            .active_mut()
            .presets
            .get_mut(usize::from(index))
            .ok_or_else(|| CommandError::validation(format!("preset index {index} out of range")))?;
        *slot = preset;
        Ok(())
    }

    /// Replace the setpoints of the active bank. `points` must be validated.
    pub fn set_setpoints(&mut self, points: &[InterpPoint]) -> Result<(), CommandError> {
        let list = SetpointList::from_slice(points)
            .map_err(|_| CommandError::validation("too many setpoints"))?;
        self.active_mut().interp_points = list;
        Ok(())
    }
}
