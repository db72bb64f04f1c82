use chrono::{DateTime, Utc};
use std::fmt;

/// Lifecycle phase of a game as reported by the status source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Scheduled,
    Pregame,
    Live,
    Intermission,
    Final,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Scheduled => "scheduled",
            GamePhase::Pregame => "pregame",
            GamePhase::Live => "live",
            GamePhase::Intermission => "intermission",
            GamePhase::Final => "final",
        }
    }

    /// True before the puck drops.
    pub fn is_pre_game(&self) -> bool {
        matches!(self, GamePhase::Scheduled | GamePhase::Pregame)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time state of one game, produced by every successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    /// Opaque identifier from the status source (NHL game id)
    pub event_id: String,
    /// Team abbreviations, e.g. "OTT"
    pub away_team: String,
    pub home_team: String,
    pub away_score: u32,
    pub home_score: u32,
    pub phase: GamePhase,
    /// 0 before play starts
    pub period: u32,
    /// Only meaningful while live or in intermission
    pub seconds_remaining: u32,
    pub start_time: DateTime<Utc>,
}

impl GameSnapshot {
    /// "OTT @ TOR"
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }
}

/// One row of the daily schedule; the seed a tracker is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledGame {
    pub event_id: String,
    pub away_team: String,
    pub home_team: String,
    /// `None` when the source gave no usable start time
    pub start_time: Option<DateTime<Utc>>,
    pub phase: GamePhase,
    /// Postponed or cancelled by the league
    pub postponed: bool,
}

impl ScheduledGame {
    pub fn involves(&self, team: &str) -> bool {
        self.away_team.eq_ignore_ascii_case(team) || self.home_team.eq_ignore_ascii_case(team)
    }
}

/// A notification attempt, kept for reporting
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRecord {
    pub event_id: String,
    /// "period_started" | "game_ended"
    pub kind: String,
    pub period: u32,
    pub message: String,
    pub delivered: bool,
    pub sent_at: DateTime<Utc>,
}
