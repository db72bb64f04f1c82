use chrono::{NaiveDate, TimeZone};

use crate::db::models::ScheduledGame;

fn start_label<Tz: TimeZone>(game: &ScheduledGame, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match game.start_time {
        Some(t) => t.with_timezone(tz).format("%-I:%M %p").to_string(),
        None => "TBD".to_string(),
    }
}

fn game_line<Tz: TimeZone>(game: &ScheduledGame, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut line = format!(
        "{} @ {} at {}",
        game.away_team,
        game.home_team,
        start_label(game, tz)
    );
    if game.postponed {
        line.push_str(" (postponed)");
    }
    line
}

/// The day's slate, one game per line.
pub fn daily_digest<Tz: TimeZone>(date: NaiveDate, games: &[ScheduledGame], tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if games.is_empty() {
        return format!("No games scheduled for {}.", date);
    }
    let mut out = format!("Today's Games ({}):", date);
    for game in games {
        out.push('\n');
        out.push_str(&game_line(game, tz));
    }
    out
}

/// Heads-up for a team channel that its game is on today.
pub fn game_day_line<Tz: TimeZone>(game: &ScheduledGame, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("Game day! {}", game_line(game, tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::GamePhase;
    use chrono::Utc;

    fn game(away: &str, home: &str, hour: u32) -> ScheduledGame {
        ScheduledGame {
            event_id: format!("{}{}", away, home),
            away_team: away.into(),
            home_team: home.into(),
            start_time: Some(Utc.with_ymd_and_hms(2025, 4, 3, hour, 0, 0).unwrap()),
            phase: GamePhase::Scheduled,
            postponed: false,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 3).unwrap()
    }

    #[test]
    fn test_digest_lists_every_game() {
        let mut ppd = game("BOS", "MTL", 23);
        ppd.postponed = true;
        let text = daily_digest(date(), &[game("OTT", "TOR", 23), ppd], &Utc);
        assert_eq!(
            text,
            "Today's Games (2025-04-03):\nOTT @ TOR at 11:00 PM\nBOS @ MTL at 11:00 PM (postponed)"
        );
    }

    #[test]
    fn test_empty_digest() {
        assert_eq!(
            daily_digest(date(), &[], &Utc),
            "No games scheduled for 2025-04-03."
        );
    }

    #[test]
    fn test_game_day_line_without_start() {
        let mut g = game("OTT", "TOR", 23);
        g.start_time = None;
        assert_eq!(game_day_line(&g, &Utc), "Game day! OTT @ TOR at TBD");
    }
}
