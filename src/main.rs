use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

mod config;
mod db;
mod live_scores;
mod notify;
mod tracker;

use config::Config;
use db::models::ScheduledGame;
use db::{Database, SnapshotStore};
use live_scores::{NhlApi, ScheduleSource};
use notify::{DiscordWebhook, LogSink, NotificationSink, RecordingSink};
use tracker::{Supervisor, TrackerDeps};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let db = Database::open(&config.database_path)?.with_timezone(config.timezone);
    info!("Database opened: {}", config.database_path);

    let nhl = Arc::new(NhlApi::new(Some(&config.nhl_api_url))?);
    let date = config.schedule_date();
    let games = nhl.games_on(date).await?;
    info!("{} game(s) scheduled for {}", games.len(), date);

    let filter = config.team_filter();
    db.upsert_schedule(date, &games, &filter)?;
    let tracked_ids = db.tracked_games_on(date)?;
    let selected: Vec<&ScheduledGame> = tracked_ids
        .iter()
        .filter_map(|id| games.iter().find(|g| &g.event_id == id))
        .collect();

    let team_hook = config
        .team_webhook_url
        .as_deref()
        .map(DiscordWebhook::new)
        .transpose()?;

    post_digest(&config, date, &games, &selected, team_hook.as_ref()).await;

    // Period notifications go to the team channel, or the log without one.
    let inner: Arc<dyn NotificationSink> = match team_hook {
        Some(hook) => Arc::new(hook),
        None => {
            info!("No team webhook configured, notifications will be logged");
            Arc::new(LogSink)
        }
    };
    let deps = TrackerDeps {
        source: nhl.clone(),
        sink: Arc::new(RecordingSink::new(inner, db.clone())),
        store: Some(Arc::new(db.clone()) as Arc<dyn SnapshotStore>),
        poller: config.poller(),
    };

    let mut supervisor = Supervisor::new(deps);
    for game in selected {
        if let Err(e) = supervisor.track(game) {
            error!("Cannot track game {}: {}", game.event_id, e);
        }
    }
    if supervisor.is_empty() {
        info!("Nothing to track on {}", date);
        return Ok(());
    }

    tokio::select! {
        _ = supervisor.wait_idle() => info!("All tracked games are over"),
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutting down");
            supervisor.shutdown();
        }
    }
    let outcomes = supervisor.join_all().await;

    for outcome in &outcomes {
        let snap = &outcome.event.snapshot;
        let attempts = db.notifications_for(&snap.event_id)?;
        let delivered = attempts.iter().filter(|n| n.delivered).count();
        info!(
            "{} finished ({:?}), last period announced: {}, {}/{} notification(s) delivered",
            snap.matchup(),
            outcome.reason,
            outcome.event.last_notified_period,
            delivered,
            attempts.len()
        );
    }
    Ok(())
}

/// Post the day's slate to the digest channel and a heads-up per tracked
/// game to the team channel. Failures are logged and never stop tracking.
async fn post_digest(
    config: &Config,
    date: chrono::NaiveDate,
    games: &[ScheduledGame],
    selected: &[&ScheduledGame],
    team_hook: Option<&DiscordWebhook>,
) {
    let tz = config.timezone;

    match config.digest_webhook_url.as_deref().map(DiscordWebhook::new) {
        Some(Ok(hook)) => {
            if let Err(e) = hook.post_message(&notify::daily_digest(date, games, &tz)).await {
                warn!("Failed to post daily digest: {:#}", e);
            }
        }
        Some(Err(e)) => warn!("Digest webhook unavailable: {:#}", e),
        None => info!("{}", notify::daily_digest(date, games, &tz)),
    }

    if let Some(hook) = team_hook {
        for game in selected {
            if let Err(e) = hook.post_message(&notify::game_day_line(game, &tz)).await {
                warn!("Failed to post game-day message for {}: {:#}", game.event_id, e);
            }
        }
    }
}
