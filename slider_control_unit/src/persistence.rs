//! Bank persistence outside the control tick.
//!
//! `BankSave` snapshots the active bank inside the tick; the cycle runner
//! hands each snapshot to [`PersistenceHandle::submit`], which never blocks.
//! A dedicated worker thread owns the [`BankStorage`] backend and writes
//! snapshots in submission order. Storage failures are logged, never
//! reported back into the tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use slider_common::control_unit::bank::Bank;
use slider_common::hal::storage::BankStorage;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Save counters shared with the worker.
#[derive(Debug, Default)]
pub struct PersistenceStats {
    saved: AtomicU64,
    failed: AtomicU64,
}

impl PersistenceStats {
    pub fn saved(&self) -> u64 {
        self.saved.load(Ordering::Acquire)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }
}

/// Sending side of the persistence worker.
pub struct PersistenceHandle {
    tx: Option<mpsc::UnboundedSender<Bank>>,
    worker: Option<JoinHandle<()>>,
    stats: Arc<PersistenceStats>,
}

impl PersistenceHandle {
    /// Start the worker thread with `storage`.
    ///
    /// # Errors
    /// The OS refused to spawn the thread.
    pub fn spawn(storage: Box<dyn BankStorage>) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(PersistenceStats::default());
        let worker_stats = Arc::clone(&stats);
        let worker = std::thread::Builder::new()
            .name("slider-persist".to_string())
            .spawn(move || run_worker(storage, rx, &worker_stats))?;
        Ok(Self { tx: Some(tx), worker: Some(worker), stats })
    }

    /// Queue `bank` for writing. Returns false if the worker is gone.
    pub fn submit(&self, bank: Bank) -> bool {
        let Some(tx) = &self.tx else { return false };
        let index = bank.index;
        match tx.send(bank) {
            Ok(()) => {
                debug!("bank {index} queued for save");
                true
            }
            Err(_) => {
                warn!("persistence worker stopped, bank {index} not saved");
                false
            }
        }
    }

    pub fn stats(&self) -> &PersistenceStats {
        &self.stats
    }

    /// Write everything queued, then stop the worker.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        drop(self.tx.take());
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("persistence worker panicked");
        }
    }
}

impl Drop for PersistenceHandle {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker(
    mut storage: Box<dyn BankStorage>,
    mut rx: mpsc::UnboundedReceiver<Bank>,
    stats: &PersistenceStats,
) {
    debug!("persistence worker started");
    while let Some(bank) = rx.blocking_recv() {
        match storage.save(&bank) {
            Ok(()) => {
                stats.saved.fetch_add(1, Ordering::AcqRel);
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::AcqRel);
                warn!("saving bank {} failed: {e}", bank.index);
            }
        }
    }
    info!(
        "persistence worker stopped ({} saved, {} failed)",
        stats.saved(),
        stats.failed()
    );
}
