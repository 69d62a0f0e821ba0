//! Result classification
//!
//! Derives the match result and per-period results of a game from its
//! period scores, and the league points each side earns.

use crate::{Game, HomeAway, PeriodScore, Side, TeamResult, REGULATION_PERIODS};
use serde::{Deserialize, Serialize};

/// Points for a regulation win
pub const POINTS_WIN: u32 = 3;
/// Points for winning in overtime or a shootout
pub const POINTS_EXTRA_WIN: u32 = 2;
/// Points for losing in overtime or a shootout, or an undecided tie
pub const POINTS_EXTRA_LOSS: u32 = 1;

/// Match and period results of one game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// `None` for a game without a final score
    pub result: Option<Side>,
    /// One entry per recorded period; `None` when a period score is missing
    pub period_results: Vec<Option<Side>>,
}

impl MatchOutcome {
    /// Winner of the deciding overtime/shootout period, if any.
    ///
    /// The last decisive extra period wins: a scoreless overtime followed by
    /// a shootout is decided by the shootout.
    pub fn extra_period_winner(&self) -> Option<Side> {
        self.period_results
            .iter()
            .skip(REGULATION_PERIODS)
            .flatten()
            .rev()
            .copied()
            .find(|side| *side != Side::Draw)
    }

    /// Points earned by one side of the game
    pub fn points(&self, h_a: HomeAway) -> u32 {
        let Some(result) = self.result else {
            return 0;
        };

        match TeamResult::from_side(result, h_a) {
            TeamResult::Win => POINTS_WIN,
            TeamResult::Lost => 0,
            TeamResult::Draw => match self.extra_period_winner() {
                Some(side) if TeamResult::from_side(side, h_a) == TeamResult::Win => {
                    POINTS_EXTRA_WIN
                }
                _ => POINTS_EXTRA_LOSS,
            },
        }
    }
}

/// Strict comparison of one period; undefined when either side is missing
pub fn period_result(period: &PeriodScore) -> Option<Side> {
    Some(Side::compare(period.home?, period.away?))
}

impl Game {
    /// Classify the game.
    ///
    /// A game with any overtime or shootout period is a draw at full time,
    /// whatever the final score says; the extra periods themselves are
    /// compared strictly like any other period.
    pub fn outcome(&self) -> MatchOutcome {
        let period_results = self.period_scores.iter().map(period_result).collect();

        let result = if !self.is_played() {
            None
        } else if self.went_to_extra_periods() {
            Some(Side::Draw)
        } else {
            match (self.score_home, self.score_away) {
                (Some(home), Some(away)) => Some(Side::compare(home, away)),
                _ => None,
            }
        };

        MatchOutcome {
            result,
            period_results,
        }
    }
}
