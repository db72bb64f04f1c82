use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::provider::{ScheduleSource, StatusSource};
use crate::db::models::{GamePhase, GameSnapshot, ScheduledGame};

pub const DEFAULT_BASE_URL: &str = "https://api-web.nhle.com/v1";

/// Status source backed by the public NHL web API.
/// Schedule: `/score/{date}`, live state: `/gamecenter/{id}/landing`.
#[derive(Clone)]
pub struct NhlApi {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
}

impl NhlApi {
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        // The per-request timeout bounds every fetch; a timeout surfaces
        // as an ordinary fetch error.
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(NhlApi {
            http,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("NHL API request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("NHL API error: {}", resp.status());
        }

        resp.json()
            .await
            .context("Failed to parse NHL API response")
    }
}

#[async_trait]
impl StatusSource for NhlApi {
    fn name(&self) -> &str {
        "NHL"
    }

    async fn fetch(&self, event_id: &str) -> Result<GameSnapshot> {
        let url = format!("{}/gamecenter/{}/landing", self.base_url, event_id);
        let raw = self.get_json(&url).await?;
        parse_landing(event_id, raw)
    }
}

#[async_trait]
impl ScheduleSource for NhlApi {
    async fn games_on(&self, date: NaiveDate) -> Result<Vec<ScheduledGame>> {
        let url = format!("{}/score/{}", self.base_url, date.format("%Y-%m-%d"));
        let raw = self.get_json(&url).await?;
        parse_score_day(raw)
    }
}

// ── Payloads ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamLine {
    abbrev: String,
    #[serde(default)]
    score: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeriodDescriptor {
    #[serde(default)]
    number: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Clock {
    #[serde(default)]
    seconds_remaining: u32,
    #[serde(default)]
    in_intermission: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Landing {
    game_state: String,
    #[serde(rename = "startTimeUTC")]
    start_time_utc: DateTime<Utc>,
    away_team: TeamLine,
    home_team: TeamLine,
    #[serde(default)]
    period_descriptor: Option<PeriodDescriptor>,
    #[serde(default)]
    clock: Option<Clock>,
}

#[derive(Debug, Deserialize)]
struct ScoreDay {
    #[serde(default)]
    games: Vec<ScheduleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleEntry {
    id: u64,
    game_state: String,
    #[serde(default)]
    game_schedule_state: Option<String>,
    #[serde(rename = "startTimeUTC", default)]
    start_time_utc: Option<String>,
    away_team: TeamLine,
    home_team: TeamLine,
}

/// Map the API's `gameState` onto our phases. `LIVE` and `CRIT` (last minutes
/// of a close game) both count as live play.
fn phase_from_state(state: &str, in_intermission: bool) -> Option<GamePhase> {
    match state.to_uppercase().as_str() {
        "FUT" => Some(GamePhase::Scheduled),
        "PRE" => Some(GamePhase::Pregame),
        "LIVE" | "CRIT" if in_intermission => Some(GamePhase::Intermission),
        "LIVE" | "CRIT" => Some(GamePhase::Live),
        "OFF" | "FINAL" => Some(GamePhase::Final),
        _ => None,
    }
}

fn parse_landing(event_id: &str, raw: serde_json::Value) -> Result<GameSnapshot> {
    let landing: Landing =
        serde_json::from_value(raw).context("Unexpected gamecenter landing payload")?;
    let clock = landing.clock.unwrap_or_default();
    let phase = phase_from_state(&landing.game_state, clock.in_intermission)
        .with_context(|| format!("Unknown gameState '{}'", landing.game_state))?;

    // Before puck drop the feed carries placeholder clock and period values.
    let (period, seconds_remaining) = if phase.is_pre_game() {
        (0, 0)
    } else {
        (
            landing.period_descriptor.unwrap_or_default().number,
            clock.seconds_remaining,
        )
    };

    Ok(GameSnapshot {
        event_id: event_id.to_string(),
        away_team: landing.away_team.abbrev,
        home_team: landing.home_team.abbrev,
        away_score: landing.away_team.score.unwrap_or(0),
        home_score: landing.home_team.score.unwrap_or(0),
        phase,
        period,
        seconds_remaining,
        start_time: landing.start_time_utc,
    })
}

fn parse_score_day(raw: serde_json::Value) -> Result<Vec<ScheduledGame>> {
    let day: ScoreDay = serde_json::from_value(raw).context("Unexpected score payload")?;

    let games = day
        .games
        .into_iter()
        .map(|g| {
            let start_time = g
                .start_time_utc
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc));
            let postponed = matches!(
                g.game_schedule_state.as_deref(),
                Some("PPD") | Some("CNCL") | Some("SUSP")
            );
            ScheduledGame {
                event_id: g.id.to_string(),
                away_team: g.away_team.abbrev,
                home_team: g.home_team.abbrev,
                start_time,
                phase: phase_from_state(&g.game_state, false).unwrap_or(GamePhase::Scheduled),
                postponed,
            }
        })
        .collect();

    Ok(games)
}
