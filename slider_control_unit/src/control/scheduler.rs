//! MotionScheduler: time-matched synchronized moves with per-axis membership.
//!
//! A synchronized job is planned once: every leg's minimum trapezoid time
//! is computed from its own limits, the job duration is the longest of
//! those and the requested duration, and each leg gets limits derated so
//! it finishes in exactly that time. Individual moves need no planning;
//! the driver runs them at the axis limits.
//!
//! Membership is per axis. Releasing one leg leaves the others running;
//! the job ends when its last leg is released or all legs have arrived.

use std::time::Duration;

use slider_common::axis::{AxisArray, AxisId};
use slider_common::control_unit::command::MoveReport;
use slider_common::control_unit::error::CommandError;
use slider_common::control_unit::telemetry::SyncJobStatus;
use slider_common::hal::driver::MotionLimits;
use tracing::{debug, info};

use super::profile::{derate, job_duration_ms, min_move_time};

/// One axis of a synchronized move request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegRequest {
    /// Clamped target [steps].
    pub target: i64,
    /// Distance the driver will travel [steps].
    pub distance: i64,
    /// Axis limits before derating.
    pub limits: MotionLimits,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    pub target: i64,
    /// Derated limits for this job.
    pub limits: MotionLimits,
    /// Minimum feasible time at the axis limits [s].
    pub min_time: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncJob {
    pub legs: AxisArray<Option<Leg>>,
    pub report: MoveReport,
    pub elapsed: Duration,
}

impl SyncJob {
    /// Plan a job. The result always satisfies
    /// `actual ≥ requested` and `actual ≥ every leg's minimum time`.
    pub fn plan(requests: &AxisArray<Option<LegRequest>>, requested_ms: Option<u32>) -> Self {
        let min_times = requests.map(|r| r.map(|r| min_move_time(r.distance as f64, r.limits)));
        let (actual_ms, adjusted) =
            job_duration_ms(requested_ms, min_times.0.iter().flatten().copied());
        let actual_s = f64::from(actual_ms) / 1000.0;

        let legs = AxisArray::from_fn(|axis| {
            let req = requests[axis]?;
            let min_time = min_times[axis].unwrap_or(0.0);
            Some(Leg {
                target: req.target,
                limits: derate(req.limits, min_time, actual_s),
                min_time,
            })
        });

        Self {
            legs,
            report: MoveReport {
                actual_duration_ms: actual_ms,
                requested_duration_ms: requested_ms.unwrap_or(0),
                duration_adjusted: adjusted,
            },
            elapsed: Duration::ZERO,
        }
    }

    #[inline]
    pub fn members(&self) -> AxisArray<bool> {
        self.legs.map(|l| l.is_some())
    }

    fn elapsed_ms(&self) -> u32 {
        u32::try_from(self.elapsed.as_millis()).unwrap_or(u32::MAX)
    }

    pub fn status(&self) -> SyncJobStatus {
        let actual = self.report.actual_duration_ms;
        let elapsed = self.elapsed_ms();
        let progress = if actual == 0 {
            1.0
        } else {
            (self.elapsed.as_secs_f64() * 1000.0 / f64::from(actual)).clamp(0.0, 1.0)
        };
        SyncJobStatus {
            report: self.report,
            progress,
            elapsed_ms: elapsed,
            remaining_ms: actual.saturating_sub(elapsed),
            members: self.members(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MotionScheduler {
    job: Option<SyncJob>,
    auto_cancel: bool,
}

impl MotionScheduler {
    pub fn new(auto_cancel: bool) -> Self {
        Self { job: None, auto_cancel }
    }

    #[inline]
    pub fn auto_cancel(&self) -> bool {
        self.auto_cancel
    }

    #[inline]
    pub fn job(&self) -> Option<&SyncJob> {
        self.job.as_ref()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.job.is_some()
    }

    /// Plan and start a job, replacing any active one.
    pub fn start(
        &mut self,
        requests: &AxisArray<Option<LegRequest>>,
        requested_ms: Option<u32>,
    ) -> MoveReport {
        if self.job.is_some() {
            debug!("sync job superseded");
        }
        let job = SyncJob::plan(requests, requested_ms);
        let report = job.report;
        info!(
            "sync job: {} axes, {} ms (requested {}, adjusted {})",
            job.legs.0.iter().flatten().count(),
            report.actual_duration_ms,
            report.requested_duration_ms,
            report.duration_adjusted
        );
        self.job = Some(job);
        report
    }

    #[inline]
    pub fn member(&self, axis: AxisId) -> bool {
        self.job.as_ref().is_some_and(|j| j.legs[axis].is_some())
    }

    /// Derated limits for `axis` while it is a job member.
    #[inline]
    pub fn leg_limits(&self, axis: AxisId) -> Option<MotionLimits> {
        self.job.as_ref().and_then(|j| j.legs[axis]).map(|l| l.limits)
    }

    /// Take `axis` out of the job for an individual write.
    ///
    /// # Errors
    /// `CommandError::Conflict` if the axis is a member and auto-cancel is off.
    pub fn claim_individual(&mut self, axis: AxisId) -> Result<(), CommandError> {
        if !self.member(axis) {
            return Ok(());
        }
        if !self.auto_cancel {
            return Err(CommandError::conflict(format!("{axis} is part of a synchronized move")));
        }
        self.release(axis);
        Ok(())
    }

    /// Drop `axis` from the job. The job ends with its last member.
    pub fn release(&mut self, axis: AxisId) {
        let Some(job) = &mut self.job else { return };
        if job.legs[axis].take().is_some() {
            debug!("{axis}: left sync job");
        }
        if job.legs.0.iter().all(Option::is_none) {
            info!("sync job cancelled");
            self.job = None;
        }
    }

    pub fn cancel_all(&mut self) {
        if self.job.take().is_some() {
            info!("sync job cancelled");
        }
    }

    /// Advance job time. Returns the report when the job completes: its
    /// duration has elapsed and no member is still moving.
    pub fn advance(&mut self, dt: Duration, is_moving: impl Fn(AxisId) -> bool) -> Option<MoveReport> {
        let job = self.job.as_mut()?;
        job.elapsed = job.elapsed.saturating_add(dt);
        let due = job.elapsed.as_secs_f64() * 1000.0 >= f64::from(job.report.actual_duration_ms);
        let settled = job.legs.iter().all(|(axis, leg)| leg.is_none() || !is_moving(axis));
        if due && settled {
            let report = job.report;
            self.job = None;
            info!("sync job complete after {} ms", report.actual_duration_ms);
            return Some(report);
        }
        None
    }

    pub fn status(&self) -> Option<SyncJobStatus> {
        self.job.as_ref().map(SyncJob::status)
    }
}
