//! In-memory collaborators for tracker tests. Source, sink and store share
//! one journal so tests can assert on the interleaving of their calls.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::clock::EventClock;
use super::event_tracker::TrackerDeps;
use super::poller::AdaptivePoller;
use crate::db::models::{GamePhase, GameSnapshot, ScheduledGame};
use crate::db::SnapshotStore;
use crate::live_scores::StatusSource;
use crate::notify::{Notification, NotificationSink};

pub const EVENT_ID: &str = "2024021230";

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Fetch,
    Store(GamePhase, u32),
    Notify(Notification),
}

pub type Journal = Arc<Mutex<Vec<Entry>>>;

/// 22:00 UTC, one hour before the default puck drop.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 3, 22, 0, 0).unwrap()
}

pub fn start() -> DateTime<Utc> {
    t0() + TimeDelta::hours(1)
}

pub fn snapshot(phase: GamePhase, period: u32, seconds_remaining: u32) -> GameSnapshot {
    GameSnapshot {
        event_id: EVENT_ID.into(),
        away_team: "OTT".into(),
        home_team: "TOR".into(),
        away_score: period,
        home_score: 0,
        phase,
        period,
        seconds_remaining,
        start_time: start(),
    }
}

pub fn live(period: u32) -> Result<GameSnapshot, &'static str> {
    Ok(snapshot(GamePhase::Live, period, 600))
}

pub fn intermission(period: u32, seconds_remaining: u32) -> Result<GameSnapshot, &'static str> {
    Ok(snapshot(GamePhase::Intermission, period, seconds_remaining))
}

pub fn final_(period: u32) -> Result<GameSnapshot, &'static str> {
    Ok(snapshot(GamePhase::Final, period, 0))
}

pub fn scheduled_game() -> ScheduledGame {
    ScheduledGame {
        event_id: EVENT_ID.into(),
        away_team: "OTT".into(),
        home_team: "TOR".into(),
        start_time: Some(start()),
        phase: GamePhase::Scheduled,
        postponed: false,
    }
}

/// Replays a fixed list of responses, then fails every call.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<GameSnapshot, &'static str>>>,
    latency: Duration,
    calls: Mutex<Vec<Instant>>,
    journal: Journal,
}

#[async_trait]
impl StatusSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, _event_id: &str) -> Result<GameSnapshot> {
        self.calls.lock().unwrap().push(Instant::now());
        self.journal.lock().unwrap().push(Entry::Fetch);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(snap)) => Ok(snap),
            Some(Err(msg)) => Err(anyhow::anyhow!(msg)),
            None => Err(anyhow::anyhow!("script exhausted")),
        }
    }
}

pub struct CollectingSink {
    fail: bool,
    sent: Mutex<Vec<(Notification, GameSnapshot)>>,
    journal: Journal,
}

#[async_trait]
impl NotificationSink for CollectingSink {
    async fn send(&self, notification: &Notification, context: &GameSnapshot) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((*notification, context.clone()));
        self.journal
            .lock()
            .unwrap()
            .push(Entry::Notify(*notification));
        if self.fail {
            anyhow::bail!("webhook returned 500");
        }
        Ok(())
    }
}

pub struct MemoryStore {
    writes: Mutex<Vec<GameSnapshot>>,
    journal: Journal,
}

impl SnapshotStore for MemoryStore {
    fn upsert(&self, snapshot: &GameSnapshot) -> Result<()> {
        self.writes.lock().unwrap().push(snapshot.clone());
        self.journal
            .lock()
            .unwrap()
            .push(Entry::Store(snapshot.phase, snapshot.period));
        Ok(())
    }
}

/// Wires the fakes together around a paused-clock anchor.
pub struct Harness {
    pub journal: Journal,
    pub source: Arc<ScriptedSource>,
    pub sink: Arc<CollectingSink>,
    pub store: Arc<MemoryStore>,
    pub token: CancellationToken,
    base: Instant,
}

impl Harness {
    pub fn new(script: Vec<Result<GameSnapshot, &'static str>>) -> Self {
        Self::build(script, Duration::ZERO, false)
    }

    pub fn build(
        script: Vec<Result<GameSnapshot, &'static str>>,
        latency: Duration,
        failing_sink: bool,
    ) -> Self {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        Harness {
            source: Arc::new(ScriptedSource {
                script: Mutex::new(script.into()),
                latency,
                calls: Mutex::new(Vec::new()),
                journal: journal.clone(),
            }),
            sink: Arc::new(CollectingSink {
                fail: failing_sink,
                sent: Mutex::new(Vec::new()),
                journal: journal.clone(),
            }),
            store: Arc::new(MemoryStore {
                writes: Mutex::new(Vec::new()),
                journal: journal.clone(),
            }),
            journal,
            token: CancellationToken::new(),
            base: Instant::now(),
        }
    }

    pub fn deps(&self, poller: AdaptivePoller) -> TrackerDeps {
        TrackerDeps {
            source: self.source.clone(),
            sink: self.sink.clone(),
            store: Some(self.store.clone() as Arc<dyn SnapshotStore>),
            poller,
        }
    }

    /// Clock reading `t0()` at the moment the harness was built.
    pub fn clock(&self) -> EventClock {
        let skew = TimeDelta::from_std(self.base.elapsed()).unwrap();
        EventClock::anchored_at(t0() + skew, self.token.clone())
    }

    /// Wall-clock time of every fetch so far.
    pub fn fetch_times(&self) -> Vec<DateTime<Utc>> {
        self.source
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|i| t0() + TimeDelta::from_std(*i - self.base).unwrap())
            .collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.source.calls.lock().unwrap().len()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.sink.sent.lock().unwrap().iter().map(|(n, _)| *n).collect()
    }

    pub fn store_writes(&self) -> Vec<GameSnapshot> {
        self.store.writes.lock().unwrap().clone()
    }

    pub fn journal(&self) -> Vec<Entry> {
        self.journal.lock().unwrap().clone()
    }
}
