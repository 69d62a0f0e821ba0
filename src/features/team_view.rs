//! Team-view expansion
//!
//! Every game becomes two rows, one per participating team, in a single
//! "team vs opponent" schema.

use crate::{Game, HomeAway, PeriodScore, ScheduleId, TeamResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One team's view of one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamGameRecord {
    pub team: String,
    pub opponent: String,
    pub h_a: HomeAway,
    pub date: NaiveDate,
    pub schedule_id: ScheduleId,
    pub game_id: Option<String>,
    /// 1-based count of this team's games in the schedule; set by the engine
    pub matchday: usize,
    /// Same count restricted to home or away games
    pub matchday_h_a: usize,
    pub score_team: Option<u32>,
    pub score_opponent: Option<u32>,
    pub result: Option<TeamResult>,
    pub period_scores: Vec<PeriodScore>,
    pub period_results: Vec<Option<TeamResult>>,
    pub points: u32,
    pub spectators: Option<u32>,
    /// Ingestion order of the underlying game
    pub seq: usize,
}

impl TeamGameRecord {
    fn from_game(game: &Game, h_a: HomeAway) -> Self {
        let outcome = game.outcome();
        let (team, opponent, score_team, score_opponent) = match h_a {
            HomeAway::Home => (&game.home_team, &game.away_team, game.score_home, game.score_away),
            HomeAway::Away => (&game.away_team, &game.home_team, game.score_away, game.score_home),
        };
        let period_scores = game
            .period_scores
            .iter()
            .map(|p| match h_a {
                HomeAway::Home => *p,
                HomeAway::Away => p.flipped(),
            })
            .collect();

        TeamGameRecord {
            team: team.clone(),
            opponent: opponent.clone(),
            h_a,
            date: game.date,
            schedule_id: game.schedule_id.clone(),
            game_id: game.game_id.clone(),
            matchday: 0,
            matchday_h_a: 0,
            score_team,
            score_opponent,
            result: outcome.result.map(|side| TeamResult::from_side(side, h_a)),
            period_results: outcome
                .period_results
                .iter()
                .map(|r| r.map(|side| TeamResult::from_side(side, h_a)))
                .collect(),
            period_scores,
            points: outcome.points(h_a),
            spectators: game.spectators,
            seq: game.seq,
        }
    }

    /// 1.0 when the result matches, 0.0 otherwise (including unplayed games)
    pub fn indicator(&self, result: TeamResult) -> f64 {
        if self.result == Some(result) {
            1.0
        } else {
            0.0
        }
    }
}

/// Expand one game into its home and away records
pub fn expand_game(game: &Game) -> [TeamGameRecord; 2] {
    [
        TeamGameRecord::from_game(game, HomeAway::Home),
        TeamGameRecord::from_game(game, HomeAway::Away),
    ]
}

/// Expand all games; home record first, then away, in game order
pub fn expand(games: &[Game]) -> Vec<TeamGameRecord> {
    games.iter().flat_map(expand_game).collect()
}
