use chrono::{DateTime, TimeDelta, Utc};

use crate::db::models::{GamePhase, GameSnapshot};

pub const DEFAULT_LIVE_INTERVAL_SECS: i64 = 60;
pub const DEFAULT_RETRY_DELAY_SECS: i64 = 30;

/// How long to hold off before the next fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Until(DateTime<Utc>),
    For(TimeDelta),
    /// The game is over; stop fetching
    Stop,
}

/// Chooses the delay before the next fetch from the last accepted snapshot.
///
/// Nothing is fetched before the scheduled start. Live play is polled on a
/// fixed cadence, and an intermission sleeps out the countdown the source
/// reports since the next period starts exactly when it hits zero.
#[derive(Debug, Clone, Copy)]
pub struct AdaptivePoller {
    live_interval: TimeDelta,
    retry_delay: TimeDelta,
}

impl Default for AdaptivePoller {
    fn default() -> Self {
        AdaptivePoller::new(
            TimeDelta::seconds(DEFAULT_LIVE_INTERVAL_SECS),
            TimeDelta::seconds(DEFAULT_RETRY_DELAY_SECS),
        )
    }
}

impl AdaptivePoller {
    pub fn new(live_interval: TimeDelta, retry_delay: TimeDelta) -> Self {
        AdaptivePoller {
            live_interval,
            retry_delay,
        }
    }

    /// `observed_at` is when `snapshot` was accepted; an intermission
    /// countdown only covers what is left of it since then.
    pub fn next_wait(
        &self,
        snapshot: &GameSnapshot,
        observed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Wait {
        match snapshot.phase {
            GamePhase::Scheduled | GamePhase::Pregame if snapshot.start_time > now => {
                Wait::Until(snapshot.start_time)
            }
            // Past the listed start but no puck drop yet
            GamePhase::Scheduled | GamePhase::Pregame => Wait::For(self.live_interval),
            GamePhase::Live => Wait::For(self.live_interval),
            GamePhase::Intermission => {
                let countdown = TimeDelta::seconds(i64::from(snapshot.seconds_remaining));
                let left = countdown - (now - observed_at).max(TimeDelta::zero());
                if left > TimeDelta::zero() {
                    Wait::For(left)
                } else {
                    // Countdown used up and the next period not seen yet
                    Wait::For(self.retry_delay)
                }
            }
            GamePhase::Final => Wait::Stop,
        }
    }

    /// Delay after a failed fetch.
    pub fn retry_wait(&self) -> Wait {
        Wait::For(self.retry_delay)
    }
}
