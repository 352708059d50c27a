//! Position telemetry fan-out.
//!
//! The tick offers a [`PositionTick`] every cycle; [`PositionPublisher`]
//! forwards it at the configured interval (5 Hz by default) and only when
//! at least one axis moved since the last published sample. Subscribers
//! read from a `tokio::sync::watch` channel, so a slow consumer only ever
//! sees the latest sample and never builds a backlog.

use std::time::Duration;

use slider_common::axis::AxisId;
use slider_common::control_unit::telemetry::PositionTick;
use tokio::sync::watch;
use tracing::trace;

pub struct PositionPublisher {
    tx: watch::Sender<PositionTick>,
    interval: Duration,
    last_publish: Option<Duration>,
    last_steps: Option<[i64; 4]>,
    published: u64,
}

impl PositionPublisher {
    /// Publisher and its first subscriber.
    pub fn new(interval: Duration) -> (Self, watch::Receiver<PositionTick>) {
        let (tx, rx) = watch::channel(PositionTick::default());
        let publisher = Self {
            tx,
            interval,
            last_publish: None,
            last_steps: None,
            published: 0,
        };
        (publisher, rx)
    }

    /// Another subscriber. Subscribers may come and go at any time.
    pub fn subscribe(&self) -> watch::Receiver<PositionTick> {
        self.tx.subscribe()
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Samples published so far.
    #[inline]
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Offer the sample taken at `now`. Returns true if it was published.
    ///
    /// Never blocks; publishing with no subscribers is not an error.
    pub fn offer(&mut self, now: Duration, tick: PositionTick) -> bool {
        if let Some(last) = self.last_publish
            && now.saturating_sub(last) < self.interval
        {
            return false;
        }
        let steps = AxisId::ALL.map(|axis| tick.axes[axis].steps);
        if self.last_steps == Some(steps) {
            return false;
        }
        self.last_publish = Some(now);
        self.last_steps = Some(steps);
        self.published += 1;
        self.tx.send_replace(tick);
        trace!("position tick @{} ms", tick.timestamp_ms);
        true
    }
}
