use chrono::{NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use clap::Parser;
use url::Url;

use crate::live_scores::nhl::DEFAULT_BASE_URL;
use crate::tracker::poller::{DEFAULT_LIVE_INTERVAL_SECS, DEFAULT_RETRY_DELAY_SECS};
use crate::tracker::{AdaptivePoller, TeamFilter};

/// NHL period tracker: posts a message when each period of a game starts
#[derive(Parser, Debug, Clone)]
#[command(name = "nhl-period-tracker", version, about)]
pub struct Config {
    /// NHL web API base URL
    #[arg(long, env = "NHL_API_URL", default_value = DEFAULT_BASE_URL)]
    pub nhl_api_url: String,

    /// Comma-separated team codes to track (empty tracks every game)
    #[arg(long, env = "TRACKED_TEAMS", default_value = "OTT", value_delimiter = ',')]
    pub teams: Vec<String>,

    /// Schedule date to track (YYYY-MM-DD, defaults to today in `timezone`)
    #[arg(long, env = "SCHEDULE_DATE")]
    pub date: Option<NaiveDate>,

    /// IANA time zone for start times and game dates
    #[arg(long, env = "DISPLAY_TIMEZONE", default_value = "America/New_York")]
    pub timezone: Tz,

    /// Seconds between fetches while a period is being played
    #[arg(long, env = "LIVE_POLL_INTERVAL_SECS", default_value_t = DEFAULT_LIVE_INTERVAL_SECS)]
    pub live_poll_interval_secs: i64,

    /// Seconds to wait after a failed fetch
    #[arg(long, env = "RETRY_DELAY_SECS", default_value_t = DEFAULT_RETRY_DELAY_SECS)]
    pub retry_delay_secs: i64,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "nhl_tracker.db")]
    pub database_path: String,

    /// Discord webhook for period notifications (logged when unset)
    #[arg(long, env = "DISCORD_TEAM_WEBHOOK_URL")]
    pub team_webhook_url: Option<String>,

    /// Discord webhook for the daily list of games
    #[arg(long, env = "DISCORD_DIGEST_WEBHOOK_URL")]
    pub digest_webhook_url: Option<String>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        check_http_url("nhl_api_url", &self.nhl_api_url)?;
        if let Some(url) = &self.team_webhook_url {
            check_http_url("team_webhook_url", url)?;
        }
        if let Some(url) = &self.digest_webhook_url {
            check_http_url("digest_webhook_url", url)?;
        }
        if !(5..=1200).contains(&self.live_poll_interval_secs) {
            anyhow::bail!("live_poll_interval_secs must be between 5 and 1200");
        }
        if self.retry_delay_secs <= 0 {
            anyhow::bail!("retry_delay_secs must be positive");
        }
        Ok(())
    }

    /// The schedule date to load.
    pub fn schedule_date(&self) -> NaiveDate {
        self.date
            .unwrap_or_else(|| Utc::now().with_timezone(&self.timezone).date_naive())
    }

    pub fn team_filter(&self) -> TeamFilter {
        TeamFilter::new(&self.teams)
    }

    pub fn poller(&self) -> AdaptivePoller {
        AdaptivePoller::new(
            TimeDelta::seconds(self.live_poll_interval_secs),
            TimeDelta::seconds(self.retry_delay_secs),
        )
    }
}

fn check_http_url(name: &str, value: &str) -> anyhow::Result<()> {
    let url = Url::parse(value).map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("{} must be an http(s) URL", name);
    }
    Ok(())
}
