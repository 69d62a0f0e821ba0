//! Temporal feature extraction
//!
//! Rolling form, cumulative totals and head-to-head ratios per team. Every
//! pre-game value attached to a record is computed only from games that
//! come strictly before it in the same partition.
//!
//! Partitions (scope is `schedule_id` or season, see [`SeasonKey`]):
//! - `(team, scope)`: matchday, form, cumulative totals, lags
//! - `(team, scope, h_a)`: home/away matchday and points
//! - `(team, opponent)`: head-to-head, across all scopes
//!
//! Each partition is folded on its own into `(record index, value)` pairs;
//! [`TemporalFeatureEngine::compute`] assembles them.

use super::team_view::TeamGameRecord;
use super::window::{
    average, cumulative_sum, lag, partition, pre_game_rolling_mean, pre_game_sum,
};
use crate::{FeatureConfig, HomeAway, Result, SeasonKey, TeamResult};
use serde::{Deserialize, Serialize};

/// Features attached to one team-game record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalFeatures {
    // === Rolling form (pre-game) ===
    pub win_ratio: Option<f64>,
    pub draw_ratio: Option<f64>,
    pub lost_ratio: Option<f64>,
    pub scored_avg_rolling: Option<f64>,
    pub conceded_avg_rolling: Option<f64>,

    // === Cumulative, including this game ===
    pub scored_cum: u32,
    pub conceded_cum: u32,
    pub points_cum: u32,
    pub goal_difference_cum: i64,

    // === Cumulative before this game ===
    pub scored_cum_prev: u32,
    pub conceded_cum_prev: u32,
    pub points_cum_prev: u32,
    pub scored_cum_prev_avg: Option<f64>,
    pub conceded_cum_prev_avg: Option<f64>,
    pub points_cum_prev_avg: Option<f64>,

    // === Home/away split ===
    pub points_cum_h_a: u32,
    pub points_cum_h_a_prev: u32,
    pub points_cum_h_a_prev_avg: Option<f64>,

    // === Head-to-head (pre-game, normalized) ===
    pub h2h_win: f64,
    pub h2h_draw: f64,
    pub h2h_lost: f64,

    /// Results of the previous 1..=n games in the scope
    pub result_lags: Vec<Option<TeamResult>>,
}

/// Home/away split for one record
#[derive(Debug, Clone, Copy, PartialEq)]
struct HomeAwayPoints {
    matchday_h_a: usize,
    cum: u32,
    prev: u32,
    prev_avg: Option<f64>,
}

/// Normalized head-to-head shares for one record
#[derive(Debug, Clone, Copy, PartialEq)]
struct HeadToHead {
    win: f64,
    draw: f64,
    lost: f64,
}

/// Computes temporal features for a full set of team-game records
pub struct TemporalFeatureEngine {
    config: FeatureConfig,
}

impl TemporalFeatureEngine {
    pub fn new(config: FeatureConfig) -> Self {
        TemporalFeatureEngine { config }
    }

    pub fn season_key(&self) -> SeasonKey {
        self.config.season_key
    }

    fn scope(&self, record: &TeamGameRecord) -> String {
        self.config.season_key.scope(&record.schedule_id, record.date)
    }

    /// Assign matchdays on `records` and compute features for each of them.
    ///
    /// The returned vector is parallel to `records`.
    pub fn compute(&self, records: &mut [TeamGameRecord]) -> Result<Vec<TemporalFeatures>> {
        let season = self.season_features(records)?;
        let home_away = self.home_away_features(records)?;
        let head_to_head = self.head_to_head_features(records)?;

        let mut features = vec![TemporalFeatures::default(); records.len()];
        for (i, matchday, f) in season {
            records[i].matchday = matchday;
            features[i] = f;
        }
        for (i, h_a) in home_away {
            records[i].matchday_h_a = h_a.matchday_h_a;
            let f = &mut features[i];
            f.points_cum_h_a = h_a.cum;
            f.points_cum_h_a_prev = h_a.prev;
            f.points_cum_h_a_prev_avg = h_a.prev_avg;
        }
        for (i, h2h) in head_to_head {
            let f = &mut features[i];
            f.h2h_win = h2h.win;
            f.h2h_draw = h2h.draw;
            f.h2h_lost = h2h.lost;
        }

        Ok(features)
    }

    /// Per `(team, scope)`: matchday plus form, cumulative and lag features
    fn season_features(
        &self,
        records: &[TeamGameRecord],
    ) -> Result<Vec<(usize, usize, TemporalFeatures)>> {
        let groups = partition(
            records.len(),
            |i| (records[i].team.clone(), self.scope(&records[i])),
            |i| (records[i].date, records[i].seq),
        )?;
        log::debug!(
            "{} team/{:?} partitions",
            groups.len(),
            self.config.season_key
        );

        let mut out = Vec::with_capacity(records.len());
        for indices in groups.values() {
            let games: Vec<&TeamGameRecord> = indices.iter().map(|&i| &records[i]).collect();
            let folded = self.fold_season(&games);
            out.extend(
                indices
                    .iter()
                    .zip(folded)
                    .enumerate()
                    .map(|(pos, (&i, f))| (i, pos + 1, f)),
            );
        }
        Ok(out)
    }

    fn fold_season(&self, games: &[&TeamGameRecord]) -> Vec<TemporalFeatures> {
        let window = self.config.window;
        let policy = self.config.rolling_policy;

        let form = |result: TeamResult| {
            let values: Vec<Option<f64>> =
                games.iter().map(|r| Some(r.indicator(result))).collect();
            pre_game_rolling_mean(&values, window, policy)
        };
        let wins = form(TeamResult::Win);
        let draws = form(TeamResult::Draw);
        let losses = form(TeamResult::Lost);

        let scored_goals: Vec<Option<f64>> =
            games.iter().map(|r| r.score_team.map(f64::from)).collect();
        let conceded_goals: Vec<Option<f64>> =
            games.iter().map(|r| r.score_opponent.map(f64::from)).collect();
        let scored_rolling = pre_game_rolling_mean(&scored_goals, window, policy);
        let conceded_rolling = pre_game_rolling_mean(&conceded_goals, window, policy);

        let scored: Vec<u32> = games.iter().map(|r| r.score_team.unwrap_or(0)).collect();
        let conceded: Vec<u32> = games.iter().map(|r| r.score_opponent.unwrap_or(0)).collect();
        let points: Vec<u32> = games.iter().map(|r| r.points).collect();

        let scored_cum = cumulative_sum(&scored);
        let conceded_cum = cumulative_sum(&conceded);
        let points_cum = cumulative_sum(&points);
        let scored_prev = pre_game_sum(&scored);
        let conceded_prev = pre_game_sum(&conceded);
        let points_prev = pre_game_sum(&points);

        let results: Vec<Option<TeamResult>> = games.iter().map(|r| r.result).collect();
        let lags: Vec<Vec<Option<TeamResult>>> =
            (1..=self.config.lags).map(|k| lag(&results, k)).collect();

        (0..games.len())
            .map(|pos| {
                let played_before = pos;
                TemporalFeatures {
                    win_ratio: wins[pos],
                    draw_ratio: draws[pos],
                    lost_ratio: losses[pos],
                    scored_avg_rolling: scored_rolling[pos],
                    conceded_avg_rolling: conceded_rolling[pos],
                    scored_cum: scored_cum[pos],
                    conceded_cum: conceded_cum[pos],
                    points_cum: points_cum[pos],
                    goal_difference_cum: scored_cum[pos] as i64 - conceded_cum[pos] as i64,
                    scored_cum_prev: scored_prev[pos],
                    conceded_cum_prev: conceded_prev[pos],
                    points_cum_prev: points_prev[pos],
                    scored_cum_prev_avg: average(scored_prev[pos], played_before),
                    conceded_cum_prev_avg: average(conceded_prev[pos], played_before),
                    points_cum_prev_avg: average(points_prev[pos], played_before),
                    result_lags: lags.iter().map(|l| l[pos]).collect(),
                    ..TemporalFeatures::default()
                }
            })
            .collect()
    }

    /// Per `(team, scope, h_a)`: home/away matchday and points
    fn home_away_features(&self, records: &[TeamGameRecord]) -> Result<Vec<(usize, HomeAwayPoints)>> {
        let groups: std::collections::BTreeMap<(String, String, HomeAway), Vec<usize>> =
            partition(
                records.len(),
                |i| (records[i].team.clone(), self.scope(&records[i]), records[i].h_a),
                |i| (records[i].date, records[i].seq),
            )?;

        let mut out = Vec::with_capacity(records.len());
        for indices in groups.values() {
            let points: Vec<u32> = indices.iter().map(|&i| records[i].points).collect();
            let cum = cumulative_sum(&points);
            let prev = pre_game_sum(&points);

            out.extend(indices.iter().enumerate().map(|(pos, &i)| {
                (
                    i,
                    HomeAwayPoints {
                        matchday_h_a: pos + 1,
                        cum: cum[pos],
                        prev: prev[pos],
                        prev_avg: average(prev[pos], pos),
                    },
                )
            }));
        }
        Ok(out)
    }

    /// Per `(team, opponent)` over all scopes: pre-game meeting shares
    fn head_to_head_features(&self, records: &[TeamGameRecord]) -> Result<Vec<(usize, HeadToHead)>> {
        let groups = partition(
            records.len(),
            |i| (records[i].team.clone(), records[i].opponent.clone()),
            |i| (records[i].date, records[i].seq),
        )?;

        let mut out = Vec::with_capacity(records.len());
        for indices in groups.values() {
            let count = |result: TeamResult| {
                let values: Vec<u32> = indices
                    .iter()
                    .map(|&i| u32::from(records[i].result == Some(result)))
                    .collect();
                pre_game_sum(&values)
            };
            let wins = count(TeamResult::Win);
            let draws = count(TeamResult::Draw);
            let losses = count(TeamResult::Lost);

            out.extend(indices.iter().enumerate().map(|(pos, &i)| {
                let (win, draw, lost) = normalize_counts(wins[pos], draws[pos], losses[pos]);
                (i, HeadToHead { win, draw, lost })
            }));
        }
        Ok(out)
    }
}

/// Turn counts into shares; no meetings means all zero
fn normalize_counts(win: u32, draw: u32, lost: u32) -> (f64, f64, f64) {
    let total = win + draw + lost;
    if total == 0 {
        return (0.0, 0.0, 0.0);
    }
    let total = total as f64;
    (win as f64 / total, draw as f64 / total, lost as f64 / total)
}
