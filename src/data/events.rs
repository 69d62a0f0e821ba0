//! Per-game event logs
//!
//! Event pages are carried through as opaque logs: rows are filtered to real
//! clock entries and grouped by game, nothing more.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of a game's event table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    pub game_id: String,
    /// Game clock, `MM:SS`
    pub time: String,
    pub event: String,
    pub team: String,
    pub players: String,
    pub on_ice: String,
}

/// Shot totals from the top of an event page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub game_id: String,
    pub league: String,
    pub shots_home: String,
    pub shots_home_period: String,
    pub shots_away: String,
    pub shots_away_period: String,
}

/// True for event rows that carry a game clock.
///
/// Section headers (`1st period`, `Overtime`) and blank spacer rows fail
/// this test.
pub fn is_clock_row(time: &str) -> bool {
    time.chars().count() == 5
}

/// Keep only timed rows
pub fn filter_timed(events: Vec<GameEvent>) -> Vec<GameEvent> {
    events.into_iter().filter(|e| is_clock_row(&e.time)).collect()
}

/// Group events by game, keeping page order within each game
pub fn group_by_game(events: Vec<GameEvent>) -> BTreeMap<String, Vec<GameEvent>> {
    let mut grouped: BTreeMap<String, Vec<GameEvent>> = BTreeMap::new();
    for event in events {
        grouped.entry(event.game_id.clone()).or_default().push(event);
    }
    grouped
}
