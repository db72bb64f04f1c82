use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::clock::EventClock;
use super::detector::{classify, Transition};
use super::poller::{AdaptivePoller, Wait};
use crate::db::models::{GameSnapshot, ScheduledGame};
use crate::db::SnapshotStore;
use crate::live_scores::StatusSource;
use crate::notify::{Notification, NotificationSink};

/// Everything one tracker knows about its game.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEvent {
    /// Most recently accepted snapshot
    pub snapshot: GameSnapshot,
    /// Last period a "period starting" notification went out for
    pub last_notified_period: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    WaitingForStart,
    Polling,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Final,
    Cancelled,
}

/// What a tracker hands back when its loop exits.
#[derive(Debug, Clone)]
pub struct TrackerOutcome {
    pub reason: StopReason,
    pub event: TrackedEvent,
}

/// Configuration problems that keep a tracker from being built at all.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("game has no event id")]
    MissingEventId,

    #[error("no start time for game {0}")]
    MissingStartTime(String),
}

/// Collaborators shared by every tracker a supervisor starts.
#[derive(Clone)]
pub struct TrackerDeps {
    pub source: Arc<dyn StatusSource>,
    pub sink: Arc<dyn NotificationSink>,
    pub store: Option<Arc<dyn SnapshotStore>>,
    pub poller: AdaptivePoller,
}

/// Drives one game from "scheduled" to "final".
///
/// Runs strictly sequentially: wait, fetch, classify, notify. Cancellation is
/// only honoured inside the clock's waits and at the check right after a
/// fetch returns, so a snapshot is either fully handled (stored and
/// notified) or dropped untouched.
pub struct EventTracker {
    deps: TrackerDeps,
    clock: EventClock,
    event: TrackedEvent,
    /// When `event.snapshot` was accepted
    observed_at: DateTime<Utc>,
    state: watch::Sender<TrackerState>,
}

impl EventTracker {
    pub fn new(
        game: &ScheduledGame,
        deps: TrackerDeps,
        clock: EventClock,
    ) -> Result<Self, TrackerError> {
        if game.event_id.trim().is_empty() {
            return Err(TrackerError::MissingEventId);
        }
        let start_time = game
            .start_time
            .ok_or_else(|| TrackerError::MissingStartTime(game.event_id.clone()))?;

        let snapshot = GameSnapshot {
            event_id: game.event_id.clone(),
            away_team: game.away_team.clone(),
            home_team: game.home_team.clone(),
            away_score: 0,
            home_score: 0,
            phase: game.phase,
            period: 0,
            seconds_remaining: 0,
            start_time,
        };
        let (state, _) = watch::channel(TrackerState::Idle);
        let observed_at = clock.now();

        Ok(EventTracker {
            deps,
            clock,
            observed_at,
            event: TrackedEvent {
                snapshot,
                last_notified_period: 0,
            },
            state,
        })
    }

    /// Follow the tracker's lifecycle state.
    pub fn subscribe(&self) -> watch::Receiver<TrackerState> {
        self.state.subscribe()
    }

    pub fn event_id(&self) -> &str {
        &self.event.snapshot.event_id
    }

    pub async fn run(mut self) -> TrackerOutcome {
        let start = self.event.snapshot.start_time;
        if self.clock.now() < start {
            self.set_state(TrackerState::WaitingForStart);
            info!(
                "[{}] {} waiting for start at {}",
                self.event_id(),
                self.event.snapshot.matchup(),
                start
            );
            if self.clock.wait_until(start).await.is_err() {
                return self.finish(StopReason::Cancelled);
            }
        }

        self.set_state(TrackerState::Polling);
        loop {
            let wait = match self.deps.source.fetch(self.event_id()).await {
                Ok(snapshot) => {
                    // The fetch was allowed to finish, but nothing it
                    // produced may be acted on once cancelled.
                    if self.clock.is_cancelled() {
                        return self.finish(StopReason::Cancelled);
                    }
                    if self.accept(snapshot).await {
                        return self.finish(StopReason::Final);
                    }
                    self.deps
                        .poller
                        .next_wait(&self.event.snapshot, self.observed_at, self.clock.now())
                }
                Err(e) => {
                    warn!(
                        "[{}] {} fetch failed, retrying: {:#}",
                        self.event_id(),
                        self.deps.source.name(),
                        e
                    );
                    self.deps.poller.retry_wait()
                }
            };

            if self.clock.is_cancelled() {
                return self.finish(StopReason::Cancelled);
            }
            let waited = match wait {
                Wait::Stop => return self.finish(StopReason::Final),
                Wait::Until(at) => {
                    debug!("[{}] next fetch at {}", self.event_id(), at);
                    self.clock.wait_until(at).await
                }
                Wait::For(delay) => {
                    debug!("[{}] next fetch in {}s", self.event_id(), delay.num_seconds());
                    self.clock.wait_for(delay).await
                }
            };
            if waited.is_err() {
                return self.finish(StopReason::Cancelled);
            }
        }
    }

    /// Classify and apply a fetched snapshot. Returns true once the game is over.
    async fn accept(&mut self, snapshot: GameSnapshot) -> bool {
        match classify(&self.event, &snapshot) {
            Transition::Stale => {
                debug!(
                    "[{}] discarding stale snapshot (period {} < {})",
                    self.event_id(),
                    snapshot.period,
                    self.event.snapshot.period
                );
                false
            }
            Transition::NoChange => {
                self.commit(snapshot);
                false
            }
            Transition::PeriodStarted(period) => {
                self.event.last_notified_period = period;
                self.commit(snapshot);
                self.notify(Notification::PeriodStarted(period)).await;
                false
            }
            Transition::GameEnded => {
                self.commit(snapshot);
                self.notify(Notification::GameEnded).await;
                true
            }
        }
    }

    fn commit(&mut self, snapshot: GameSnapshot) {
        if let Some(store) = &self.deps.store {
            if let Err(e) = store.upsert(&snapshot) {
                warn!("[{}] failed to store snapshot: {}", snapshot.event_id, e);
            }
        }
        if snapshot.phase != self.event.snapshot.phase {
            info!(
                "[{}] {} → {} (period {}, {} {}-{} {})",
                snapshot.event_id,
                self.event.snapshot.phase,
                snapshot.phase,
                snapshot.period,
                snapshot.away_team,
                snapshot.away_score,
                snapshot.home_score,
                snapshot.home_team
            );
        }
        self.event.snapshot = snapshot;
        self.observed_at = self.clock.now();
    }

    async fn notify(&self, notification: Notification) {
        let snap = &self.event.snapshot;
        match self.deps.sink.send(&notification, snap).await {
            Ok(()) => info!("[{}] sent: {}", snap.event_id, notification.message(snap)),
            Err(e) => error!(
                "[{}] failed to deliver {} notification: {:#}",
                snap.event_id,
                notification.kind(),
                e
            ),
        }
    }

    fn set_state(&self, state: TrackerState) {
        self.state.send_replace(state);
    }

    fn finish(self, reason: StopReason) -> TrackerOutcome {
        self.set_state(TrackerState::Terminated);
        info!("[{}] tracker stopped ({:?})", self.event_id(), reason);
        TrackerOutcome {
            reason,
            event: self.event,
        }
    }
}
