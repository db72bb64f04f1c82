use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::clock::EventClock;
use super::event_tracker::{EventTracker, TrackerDeps, TrackerError, TrackerOutcome, TrackerState};
use crate::db::models::{GamePhase, ScheduledGame};

/// Which teams' games get a tracker. An empty filter accepts every game.
#[derive(Debug, Clone, Default)]
pub struct TeamFilter {
    teams: Vec<String>,
}

impl TeamFilter {
    pub fn new<I, S>(teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        TeamFilter {
            teams: teams
                .into_iter()
                .map(|t| t.as_ref().trim().to_uppercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, game: &ScheduledGame) -> bool {
        self.teams.is_empty() || self.teams.iter().any(|t| game.involves(t))
    }

    /// Games worth tracking: on the filter, not postponed, not already over.
    pub fn select<'a>(&self, games: &'a [ScheduledGame]) -> Vec<&'a ScheduledGame> {
        games
            .iter()
            .filter(|g| self.matches(g))
            .filter(|g| {
                if g.postponed {
                    info!("Skipping postponed game {} ({} @ {})", g.event_id, g.away_team, g.home_team);
                }
                !g.postponed && g.phase != GamePhase::Final
            })
            .collect()
    }
}

/// Lifecycle handle for one running tracker. The supervisor never touches
/// tracker state, it only cancels and observes.
pub struct TrackerHandle {
    pub event_id: String,
    cancel: CancellationToken,
    state: watch::Receiver<TrackerState>,
    task: JoinHandle<TrackerOutcome>,
}

impl TrackerHandle {
    pub fn state(&self) -> TrackerState {
        *self.state.borrow()
    }
}

/// Starts one tracker task per game and owns their handles.
pub struct Supervisor {
    deps: TrackerDeps,
    shutdown: CancellationToken,
    trackers: Vec<TrackerHandle>,
}

impl Supervisor {
    pub fn new(deps: TrackerDeps) -> Self {
        Supervisor {
            deps,
            shutdown: CancellationToken::new(),
            trackers: Vec::new(),
        }
    }

    /// Spawn a tracker for `game`. Configuration errors are returned once
    /// and nothing is spawned; a game already being tracked is ignored.
    pub fn track(&mut self, game: &ScheduledGame) -> Result<(), TrackerError> {
        if self.trackers.iter().any(|t| t.event_id == game.event_id) {
            warn!("Game {} is already tracked", game.event_id);
            return Ok(());
        }

        let cancel = self.shutdown.child_token();
        let tracker = EventTracker::new(game, self.deps.clone(), EventClock::new(cancel.clone()))?;
        let state = tracker.subscribe();
        let event_id = tracker.event_id().to_string();
        let task = tokio::spawn(tracker.run());

        info!(
            "Tracking game {} ({} @ {})",
            event_id, game.away_team, game.home_team
        );
        self.trackers.push(TrackerHandle {
            event_id,
            cancel,
            state,
            task,
        });
        Ok(())
    }

    /// Stop tracking one game, e.g. after it was postponed.
    pub fn cancel(&self, event_id: &str) -> bool {
        match self.trackers.iter().find(|t| t.event_id == event_id) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn states(&self) -> Vec<(String, TrackerState)> {
        self.trackers
            .iter()
            .map(|t| (t.event_id.clone(), t.state()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Cancel every tracker.
    pub fn shutdown(&self) {
        info!("Stopping {} tracker(s)", self.trackers.len());
        self.shutdown.cancel();
    }

    /// Resolves once every tracker has reached `Terminated`, without
    /// taking ownership of the handles.
    pub async fn wait_idle(&self) {
        join_all(self.trackers.iter().map(|t| {
            let mut state = t.state.clone();
            async move {
                // A closed channel means the task is gone as well.
                let _ = state.wait_for(|s| *s == TrackerState::Terminated).await;
            }
        }))
        .await;
    }

    /// Wait for every tracker to finish and collect their outcomes.
    pub async fn join_all(self) -> Vec<TrackerOutcome> {
        let ids: Vec<String> = self.trackers.iter().map(|t| t.event_id.clone()).collect();
        let results = join_all(self.trackers.into_iter().map(|t| t.task)).await;

        results
            .into_iter()
            .zip(ids)
            .filter_map(|(res, id)| match res {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!("Tracker for game {} panicked: {}", id, e);
                    None
                }
            })
            .collect()
    }
}
