//! Cancellable sleep primitives for a tracker.
//!
//! These two waits are the only places a tracker yields while idle, so the
//! cancellation token is raced against the timer here and nowhere else.

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Returned by a wait that was cut short by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("wait cancelled")]
pub struct Cancelled;

/// Wall-clock view plus cancellable waits.
///
/// "Now" is the wall-clock anchor advanced by tokio's monotonic clock, so a
/// paused tokio runtime moves wall time too.
#[derive(Debug, Clone)]
pub struct EventClock {
    cancel: CancellationToken,
    wall_anchor: DateTime<Utc>,
    mono_anchor: Instant,
}

impl EventClock {
    pub fn new(cancel: CancellationToken) -> Self {
        Self::anchored_at(Utc::now(), cancel)
    }

    /// Pin "now" to `wall` at the current monotonic instant.
    pub fn anchored_at(wall: DateTime<Utc>, cancel: CancellationToken) -> Self {
        EventClock {
            cancel,
            wall_anchor: wall,
            mono_anchor: Instant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let elapsed =
            TimeDelta::from_std(self.mono_anchor.elapsed()).unwrap_or(TimeDelta::zero());
        self.wall_anchor + elapsed
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Suspend until `deadline`. Returns at once if it has already passed.
    pub async fn wait_until(&self, deadline: DateTime<Utc>) -> Result<(), Cancelled> {
        self.wait_for(deadline - self.now()).await
    }

    /// Suspend for `duration`. Zero or negative durations return at once.
    pub async fn wait_for(&self, duration: TimeDelta) -> Result<(), Cancelled> {
        if self.cancel.is_cancelled() {
            return Err(Cancelled);
        }
        let Ok(duration) = duration.to_std() else {
            return Ok(());
        };
        if duration.is_zero() {
            return Ok(());
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
