//! Fixed-rate cycle: pacing, statistics and RT setup.
//!
//! [`CycleRunner`] wraps the [`Controller`] with everything that lives at
//! the edges of the tick: the command inbox, the position publisher and
//! the persistence hand-off. Each cycle runs [`CycleRunner::cycle_once`]
//! and sleeps until the next boundary.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`
//! 2. Prefault stack pages
//! 3. `sched_setaffinity` to the configured core
//! 4. `sched_setscheduler(SCHED_FIFO, priority)`
//!
//! Without the `rt` feature every RT call is a no-op and pacing uses
//! `std::thread::sleep`.
//!
//! ## Overruns
//! A tick longer than the cycle budget is counted and logged. The slider
//! keeps running: the next tick absorbs the late time through its `dt`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use slider_common::control_unit::bank::Bank;
use slider_common::control_unit::command::Command;
use slider_common::control_unit::telemetry::{CycleSummary, PositionTick};
use slider_common::hal::driver::AxisDriver;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::command::queue::{CommandReceiver, CommandSender, command_channel};
use crate::config::LoadedConfig;
use crate::controller::Controller;
use crate::persistence::PersistenceHandle;
use crate::telemetry::PositionPublisher;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    pub min_cycle_ns: i64,
    pub max_cycle_ns: i64,
    pub sum_cycle_ns: i64,
    pub overruns: u64,
    /// Largest wake-up latency seen [ns].
    pub max_latency_ns: i64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns], 0 before the first cycle.
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }

    /// Summary reported in the status snapshot.
    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            cycle_count: self.cycle_count,
            overruns: self.overruns,
            avg_cycle_us: self.avg_cycle_ns() as f64 / 1000.0,
            max_cycle_us: self.max_cycle_ns as f64 / 1000.0,
        }
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    #[error("clock error: {0}")]
    Clock(String),
}

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 256 KiB of stack so the tick never faults on it.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, aligned, exclusive reference.
        unsafe { core::ptr::write_volatile(byte, 0xA5) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param { sched_priority: priority };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Lock memory, prefault the stack, pin and raise the calling thread.
///
/// Call before [`CycleRunner::run`], on the thread that will run it.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

pub struct CycleRunner<D: AxisDriver> {
    controller: Controller<D>,
    inbox: CommandReceiver,
    publisher: PositionPublisher,
    persistence: Option<PersistenceHandle>,
    stats: CycleStats,
    cycle_time: Duration,
    running: Arc<AtomicBool>,
}

impl<D: AxisDriver> CycleRunner<D> {
    /// Build the runner.
    ///
    /// Returns the runner, the sender transports enqueue commands with and
    /// the first position telemetry subscriber.
    pub fn new(
        config: &LoadedConfig,
        driver: D,
        banks: Vec<Bank>,
        persistence: Option<PersistenceHandle>,
    ) -> (Self, CommandSender, watch::Receiver<PositionTick>) {
        let controller = Controller::new(&config.controller, driver, banks);
        let (tx, inbox) = command_channel(config.controller.cycle.queue_capacity);
        let (publisher, telemetry) = PositionPublisher::new(config.telemetry_interval);
        let runner = Self {
            controller,
            inbox,
            publisher,
            persistence,
            stats: CycleStats::new(),
            cycle_time: config.cycle_time,
            running: Arc::new(AtomicBool::new(true)),
        };
        (runner, tx, telemetry)
    }

    /// Flag polled once per cycle. Clearing it ends [`run`](Self::run).
    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    #[inline]
    pub fn controller(&self) -> &Controller<D> {
        &self.controller
    }

    #[inline]
    pub fn controller_mut(&mut self) -> &mut Controller<D> {
        &mut self.controller
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    #[inline]
    pub fn cycle_time(&self) -> Duration {
        self.cycle_time
    }

    /// Another position telemetry subscriber.
    pub fn subscribe(&self) -> watch::Receiver<PositionTick> {
        self.publisher.subscribe()
    }

    /// One cycle at `now` (time since start): tick, then hand off bank
    /// saves and telemetry. Returns the number of commands processed.
    pub fn cycle_once(&mut self, now: Duration) -> usize {
        self.controller.set_cycle_summary(self.stats.summary());
        let processed = self.controller.tick(now, &mut self.inbox);

        for bank in self.controller.take_pending_saves() {
            match &self.persistence {
                Some(p) => {
                    p.submit(bank);
                }
                None => warn!("no bank storage configured, bank {} not saved", bank.index),
            }
        }

        self.publisher.offer(now, self.controller.position_tick());
        processed
    }

    /// Run cycles until the running flag clears, then stop all axes and
    /// flush pending bank saves.
    pub fn run(&mut self) -> Result<(), CycleError> {
        info!(
            "entering cycle loop: {} µs period, telemetry every {} ms",
            self.cycle_time.as_micros(),
            self.publisher.interval().as_millis()
        );

        #[cfg(feature = "rt")]
        let result = self.run_rt_loop();
        #[cfg(not(feature = "rt"))]
        let result = self.run_sim_loop();

        self.shutdown();
        result
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.controller.execute(Command::Stop) {
            warn!("stop on shutdown failed: {e}");
        }
        if let Some(p) = self.persistence.take() {
            p.shutdown();
        }
        info!(
            "cycle loop stopped: {} cycles, {} overruns, avg {} µs, max {} µs",
            self.stats.cycle_count,
            self.stats.overruns,
            self.stats.avg_cycle_ns() / 1000,
            self.stats.max_cycle_ns / 1000
        );
    }

    fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.stats.record(duration_ns, latency_ns);
        let budget_ns = i64::try_from(self.cycle_time.as_nanos()).unwrap_or(i64::MAX);
        if duration_ns > budget_ns {
            self.stats.overruns += 1;
            if self.stats.overruns == 1 || self.stats.overruns % 1000 == 0 {
                warn!(
                    "cycle overrun: {duration_ns} ns > {budget_ns} ns budget ({} total)",
                    self.stats.overruns
                );
            }
        }
    }

    /// Absolute-time pacing with `clock_nanosleep(TIMER_ABSTIME)`.
    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self) -> Result<(), CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let cycle_ns = i64::try_from(self.cycle_time.as_nanos()).unwrap_or(i64::MAX);
        let start = Instant::now();
        let mut next_wake =
            clock_gettime(clock).map_err(|e| CycleError::Clock(format!("clock_gettime: {e}")))?;

        while self.running.load(Ordering::Relaxed) {
            let cycle_start =
                clock_gettime(clock).map_err(|e| CycleError::Clock(format!("clock_gettime: {e}")))?;
            let latency_ns = timespec_diff_ns(&cycle_start, &next_wake).max(0);

            self.cycle_once(start.elapsed());

            let cycle_end =
                clock_gettime(clock).map_err(|e| CycleError::Clock(format!("clock_gettime: {e}")))?;
            self.record(timespec_diff_ns(&cycle_end, &cycle_start), latency_ns);

            next_wake = timespec_add_ns(next_wake, cycle_ns);
            if timespec_diff_ns(&cycle_end, &next_wake) > 0 {
                // Late by more than a cycle: restart pacing from now.
                next_wake = timespec_add_ns(cycle_end, cycle_ns);
            }
            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }

    /// Relative pacing with `std::thread::sleep`.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self) -> Result<(), CycleError> {
        let start = Instant::now();
        let mut next_wake = start;

        while self.running.load(Ordering::Relaxed) {
            let cycle_start = Instant::now();
            let latency_ns =
                i64::try_from(cycle_start.saturating_duration_since(next_wake).as_nanos())
                    .unwrap_or(i64::MAX);

            self.cycle_once(cycle_start.duration_since(start));

            let elapsed = cycle_start.elapsed();
            self.record(i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX), latency_ns);

            next_wake = cycle_start + self.cycle_time;
            if let Some(remaining) = self.cycle_time.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        debug!("running flag cleared");
        Ok(())
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    const NS_PER_S: i64 = 1_000_000_000;
    let total = ts.tv_nsec() + ns;
    nix::sys::time::TimeSpec::new(
        ts.tv_sec() + total.div_euclid(NS_PER_S),
        total.rem_euclid(NS_PER_S),
    )
}

/// `a - b` [ns].
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
