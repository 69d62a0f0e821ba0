//! League table position per matchday
//!
//! Teams are ranked within each `(scope, matchday)` bucket on points
//! after the game, with goal difference breaking ties. Equal points and
//! goal difference share a position and the next group skips ahead by the
//! size of the tie (competition ranking).

use super::team_view::TeamGameRecord;
use super::temporal::TemporalFeatures;
use crate::SeasonKey;
use std::collections::BTreeMap;

/// One team's standing inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
    pub points: u32,
    pub goal_difference: i64,
}

/// Competition-rank a bucket of standings; output is parallel to the input
pub fn rank(standings: &[Standing]) -> Vec<usize> {
    standings
        .iter()
        .map(|s| {
            let points_rank = 1 + standings.iter().filter(|o| o.points > s.points).count();
            let goal_rank = 1 + standings
                .iter()
                .filter(|o| o.points == s.points && o.goal_difference > s.goal_difference)
                .count();
            points_rank + goal_rank - 1
        })
        .collect()
}

/// Table position for every record, parallel to `records`.
///
/// Uses cumulative totals *including* the record's own game, since the
/// table reflects the state after each round. `season_key` must be the one
/// the matchdays were assigned with.
pub fn table_positions(
    records: &[TeamGameRecord],
    features: &[TemporalFeatures],
    season_key: SeasonKey,
) -> Vec<usize> {
    let mut buckets: BTreeMap<(String, usize), Vec<usize>> = BTreeMap::new();
    for (i, record) in records.iter().enumerate() {
        buckets
            .entry((season_key.scope(&record.schedule_id, record.date), record.matchday))
            .or_default()
            .push(i);
    }

    let mut positions = vec![0; records.len()];
    for indices in buckets.values() {
        let standings: Vec<Standing> = indices
            .iter()
            .map(|&i| Standing {
                points: features[i].points_cum,
                goal_difference: features[i].goal_difference_cum,
            })
            .collect();

        for (&i, position) in indices.iter().zip(rank(&standings)) {
            positions[i] = position;
        }
    }

    positions
}
