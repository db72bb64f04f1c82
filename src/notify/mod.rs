pub mod digest;
pub mod discord;

pub use digest::{daily_digest, game_day_line};
pub use discord::DiscordWebhook;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::models::{GameSnapshot, NotificationRecord};
use crate::db::Database;

/// A transition worth telling someone about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    PeriodStarted(u32),
    GameEnded,
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::PeriodStarted(_) => "period_started",
            Notification::GameEnded => "game_ended",
        }
    }

    /// One-line summary for chat channels.
    pub fn message(&self, snap: &GameSnapshot) -> String {
        let score = format!(
            "{} {}-{} {}",
            snap.away_team, snap.away_score, snap.home_score, snap.home_team
        );
        match self {
            Notification::PeriodStarted(1) => format!("{} starting soon", snap.matchup()),
            Notification::PeriodStarted(p) => {
                format!("{} period {} starting soon ({})", snap.matchup(), p, score)
            }
            Notification::GameEnded => format!("Final: {}", score),
        }
    }
}

/// Delivers notifications. Delivery is fire-and-forget from the tracker's
/// side: an error is logged and never retried.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: &Notification, context: &GameSnapshot) -> Result<()>;
}

/// Writes notifications to the log. Used when no webhook is configured.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, notification: &Notification, context: &GameSnapshot) -> Result<()> {
        info!("📣 [{}] {}", context.event_id, notification.message(context));
        Ok(())
    }
}

/// Forwards to another sink and records every attempt in the database.
pub struct RecordingSink {
    inner: Arc<dyn NotificationSink>,
    db: Database,
}

impl RecordingSink {
    pub fn new(inner: Arc<dyn NotificationSink>, db: Database) -> Self {
        RecordingSink { inner, db }
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, notification: &Notification, context: &GameSnapshot) -> Result<()> {
        let result = self.inner.send(notification, context).await;
        let record = NotificationRecord {
            event_id: context.event_id.clone(),
            kind: notification.kind().to_string(),
            period: context.period,
            message: notification.message(context),
            delivered: result.is_ok(),
            sent_at: Utc::now(),
        };
        if let Err(e) = self.db.record_notification(&record) {
            warn!("Failed to record notification for {}: {}", context.event_id, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::GamePhase;
    use chrono::TimeZone;

    fn snap(phase: GamePhase, period: u32) -> GameSnapshot {
        GameSnapshot {
            event_id: "2024021230".into(),
            away_team: "OTT".into(),
            home_team: "TOR".into(),
            away_score: 2,
            home_score: 1,
            phase,
            period,
            seconds_remaining: 0,
            start_time: Utc.with_ymd_and_hms(2025, 4, 3, 23, 0, 0).unwrap(),
        }
    }

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn send(&self, _: &Notification, _: &GameSnapshot) -> Result<()> {
            anyhow::bail!("channel unavailable")
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Notification::PeriodStarted(1).message(&snap(GamePhase::Live, 1)),
            "OTT @ TOR starting soon"
        );
        assert_eq!(
            Notification::PeriodStarted(2).message(&snap(GamePhase::Live, 2)),
            "OTT @ TOR period 2 starting soon (OTT 2-1 TOR)"
        );
        assert_eq!(
            Notification::GameEnded.message(&snap(GamePhase::Final, 3)),
            "Final: OTT 2-1 TOR"
        );
    }

    #[tokio::test]
    async fn test_log_sink_accepts() {
        LogSink
            .send(&Notification::GameEnded, &snap(GamePhase::Final, 3))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_recording_sink_keeps_failures() {
        let db = Database::open(":memory:").unwrap();
        let period_two = snap(GamePhase::Live, 2);
        let failing = RecordingSink::new(Arc::new(FailingSink), db.clone());
        assert!(failing
            .send(&Notification::PeriodStarted(2), &period_two)
            .await
            .is_err());

        let final_snap = snap(GamePhase::Final, 3);
        let ok = RecordingSink::new(Arc::new(LogSink), db.clone());
        ok.send(&Notification::GameEnded, &final_snap).await.unwrap();

        let records = db.notifications_for("2024021230").unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].kind, "period_started");
        assert_eq!(records[0].period, 2);
        assert!(!records[0].delivered);
        assert_eq!(
            records[0].message,
            Notification::PeriodStarted(2).message(&period_two)
        );

        assert_eq!(records[1].kind, "game_ended");
        assert_eq!(records[1].period, 3);
        assert!(records[1].delivered);
        assert_eq!(records[1].message, Notification::GameEnded.message(&final_snap));
    }
}
