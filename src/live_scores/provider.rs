use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::models::{GameSnapshot, ScheduledGame};

/// Current state of a single game. Any error means "try again later";
/// callers never look inside it.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self, event_id: &str) -> Result<GameSnapshot>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// The league schedule for one calendar day.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn games_on(&self, date: NaiveDate) -> Result<Vec<ScheduledGame>>;
}
