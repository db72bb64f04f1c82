use crate::db::models::{GamePhase, GameSnapshot};

use super::event_tracker::TrackedEvent;

/// What a freshly fetched snapshot means relative to what we already know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    NoChange,
    /// Play is live in a period we have not announced yet
    PeriodStarted(u32),
    GameEnded,
    /// Older than the accepted snapshot; discard it
    Stale,
}

/// Classify `next` against the tracker's accepted state.
///
/// Staleness wins over everything else so an out-of-order response can never
/// produce a notification. A period is announced when live play is seen in
/// any period above the last one announced, which keeps repeated fetches of
/// the same period silent.
pub fn classify(previous: &TrackedEvent, next: &GameSnapshot) -> Transition {
    let prev = &previous.snapshot;
    if prev.phase == GamePhase::Final {
        return Transition::NoChange;
    }
    if next.period < prev.period {
        return Transition::Stale;
    }
    match next.phase {
        GamePhase::Final => Transition::GameEnded,
        GamePhase::Live if next.period > previous.last_notified_period => {
            Transition::PeriodStarted(next.period)
        }
        _ => Transition::NoChange,
    }
}
