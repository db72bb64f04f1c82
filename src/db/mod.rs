use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::*;

use crate::tracker::TeamFilter;

/// Game dates are filed in league time, so a late puck drop stays on its day.
pub const LEAGUE_TIMEZONE: Tz = chrono_tz::America::New_York;

/// Sink for accepted snapshots. Write-only from the tracker's point of view:
/// nothing in the scheduler reads these rows back.
pub trait SnapshotStore: Send + Sync {
    fn upsert(&self, snapshot: &GameSnapshot) -> Result<()>;
}

/// Thread-safe SQLite connection pool (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    tz: Tz,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
            tz: LEAGUE_TIMEZONE,
        };
        db.create_schema()?;
        Ok(db)
    }

    /// Time zone used to derive `game_date` for rows not written by the schedule
    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    fn create_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Games ────────────────────────────────────────────────────────────────

    /// Write the day's slate, flagging the games picked for tracking.
    /// Live fields of rows that already exist are left alone.
    pub fn upsert_schedule(
        &self,
        date: NaiveDate,
        games: &[ScheduledGame],
        filter: &TeamFilter,
    ) -> Result<usize> {
        let tracked: Vec<&str> = filter
            .select(games)
            .into_iter()
            .map(|g| g.event_id.as_str())
            .collect();

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO games (
                    event_id, game_date, start_time, away_team, home_team,
                    phase, postponed, tracked, updated_at
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
                 ON CONFLICT(event_id) DO UPDATE SET
                    game_date=excluded.game_date,
                    start_time=excluded.start_time,
                    postponed=excluded.postponed,
                    tracked=excluded.tracked,
                    updated_at=excluded.updated_at",
            )?;
            for game in games {
                stmt.execute(params![
                    game.event_id,
                    date.to_string(),
                    game.start_time,
                    game.away_team,
                    game.home_team,
                    game.phase.as_str(),
                    game.postponed,
                    tracked.contains(&game.event_id.as_str()),
                    Utc::now(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(games.len())
    }

    /// Event ids flagged for tracking on `date`, earliest start first
    pub fn tracked_games_on(&self, date: NaiveDate) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT event_id FROM games
             WHERE game_date = ?1 AND tracked = 1
             ORDER BY start_time, event_id",
        )?;
        let ids = stmt
            .query_map(params![date.to_string()], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    /// Insert the snapshot, or refresh the live fields of an existing row
    pub fn upsert_game(&self, snap: &GameSnapshot) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO games (
                event_id, game_date, start_time, away_team, home_team,
                away_score, home_score, phase, period, seconds_remaining, updated_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)
             ON CONFLICT(event_id) DO UPDATE SET
                start_time=excluded.start_time,
                away_score=excluded.away_score,
                home_score=excluded.home_score,
                phase=excluded.phase,
                period=excluded.period,
                seconds_remaining=excluded.seconds_remaining,
                updated_at=excluded.updated_at",
            params![
                snap.event_id,
                snap.start_time.with_timezone(&self.tz).date_naive().to_string(),
                snap.start_time,
                snap.away_team,
                snap.home_team,
                snap.away_score,
                snap.home_score,
                snap.phase.as_str(),
                snap.period,
                snap.seconds_remaining,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    // ── Notifications ────────────────────────────────────────────────────────

    /// Append a notification attempt
    pub fn record_notification(&self, rec: &NotificationRecord) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO notifications (event_id, kind, period, message, delivered, sent_at)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                rec.event_id,
                rec.kind,
                rec.period,
                rec.message,
                rec.delivered,
                rec.sent_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Every recorded attempt for one game, oldest first
    pub fn notifications_for(&self, event_id: &str) -> Result<Vec<NotificationRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT event_id, kind, period, message, delivered, sent_at
             FROM notifications WHERE event_id = ?1 ORDER BY id",
        )?;
        let records = stmt
            .query_map(params![event_id], |r| {
                Ok(NotificationRecord {
                    event_id: r.get(0)?,
                    kind: r.get(1)?,
                    period: r.get(2)?,
                    message: r.get(3)?,
                    delivered: r.get(4)?,
                    sent_at: r.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

impl SnapshotStore for Database {
    fn upsert(&self, snapshot: &GameSnapshot) -> Result<()> {
        self.upsert_game(snapshot)
    }
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS games (
    event_id          TEXT    PRIMARY KEY,
    game_date         TEXT    NOT NULL,
    start_time        TEXT,
    away_team         TEXT    NOT NULL,
    home_team         TEXT    NOT NULL,
    away_score        INTEGER NOT NULL DEFAULT 0,
    home_score        INTEGER NOT NULL DEFAULT 0,
    phase             TEXT    NOT NULL,
    period            INTEGER NOT NULL DEFAULT 0,
    seconds_remaining INTEGER NOT NULL DEFAULT 0,
    postponed         INTEGER NOT NULL DEFAULT 0,
    tracked           INTEGER NOT NULL DEFAULT 0,
    updated_at        TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id    TEXT    NOT NULL,
    kind        TEXT    NOT NULL,
    period      INTEGER NOT NULL,
    message     TEXT    NOT NULL,
    delivered   INTEGER NOT NULL DEFAULT 0,
    sent_at     TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_games_date ON games(game_date);
CREATE INDEX IF NOT EXISTS idx_notifications_event ON notifications(event_id);
"#;
