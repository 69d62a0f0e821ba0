//! End-to-end feature pipeline
//!
//! raw rows → games → outcomes → team views → temporal features → table
//! position. Each stage returns new data; nothing is shared between stages.

use super::standings::table_positions;
use super::team_view::{expand, TeamGameRecord};
use super::temporal::{TemporalFeatureEngine, TemporalFeatures};
use crate::data::{normalize_batch, NormalizedBatch, RawScheduleRow, TeamDirectory};
use crate::{FeatureConfig, Game, Result};
use serde::{Deserialize, Serialize};

/// Final feature row: one team, one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamGameFeatures {
    #[serde(flatten)]
    pub record: TeamGameRecord,
    #[serde(flatten)]
    pub features: TemporalFeatures,
    pub table_position: usize,
}

/// Output of a full pipeline run
#[derive(Debug)]
pub struct PipelineOutput {
    pub rows: Vec<TeamGameFeatures>,
    pub batch: NormalizedBatch,
}

pub struct FeaturePipeline {
    config: FeatureConfig,
    teams: TeamDirectory,
}

impl FeaturePipeline {
    pub fn new(config: FeatureConfig) -> Self {
        FeaturePipeline {
            config,
            teams: TeamDirectory::new(),
        }
    }

    /// Use a custom team-name directory
    pub fn with_teams(mut self, teams: TeamDirectory) -> Self {
        self.teams = teams;
        self
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Normalize several ingestion batches, each forward-filled on its own.
    ///
    /// Ingestion order continues across batches so that same-day games keep
    /// their page order as the tie-breaker.
    pub fn normalize(&self, batches: &[Vec<RawScheduleRow>]) -> NormalizedBatch {
        let mut combined = NormalizedBatch::default();
        let mut offset = 0;
        for rows in batches {
            let batch = normalize_batch(rows, &self.teams, offset);
            offset += rows.len();
            combined.games.extend(batch.games);
            combined.rejected.extend(batch.rejected);
        }
        combined
    }

    /// Derive feature rows from normalized games
    pub fn run_games(&self, games: &[Game]) -> Result<Vec<TeamGameFeatures>> {
        let mut records = expand(games);
        let engine = TemporalFeatureEngine::new(self.config.clone());
        let features = engine.compute(&mut records)?;
        let positions = table_positions(&records, &features, engine.season_key());

        let mut rows: Vec<TeamGameFeatures> = records
            .into_iter()
            .zip(features)
            .zip(positions)
            .map(|((record, features), table_position)| TeamGameFeatures {
                record,
                features,
                table_position,
            })
            .collect();

        rows.sort_by(|a, b| {
            (&a.record.schedule_id, &a.record.team, a.record.matchday).cmp(&(
                &b.record.schedule_id,
                &b.record.team,
                b.record.matchday,
            ))
        });

        log::info!(
            "Derived {} team rows from {} games",
            rows.len(),
            games.len()
        );
        Ok(rows)
    }

    /// Normalize raw rows and derive features in one go
    pub fn run(&self, batches: &[Vec<RawScheduleRow>]) -> Result<PipelineOutput> {
        let batch = self.normalize(batches);
        if !batch.rejected.is_empty() {
            log::warn!("{} rows rejected during normalization", batch.rejected.len());
        }
        let rows = self.run_games(&batch.games)?;
        Ok(PipelineOutput { rows, batch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HomeAway, ScheduleId, TeamResult};

    fn rows() -> Vec<Vec<RawScheduleRow>> {
        let s = ScheduleId::new("12345");
        let t = ScheduleId::new("12346");
        vec![
            vec![
                RawScheduleRow::new(&s, 0, "2023-01-05 19:00", "AIK IF - Linköpings HC", "4-2", "(1-0,2-1,1-1)"),
                RawScheduleRow::new(&s, 1, "19:00", "Frölunda HC - Luleå HF", "2-2", "(1-1,0-0,1-1,0-0,1-0)"),
                RawScheduleRow::new(&s, 2, "2023-01-07 15:00", "Linköping HC - Frölunda HC", "1-3", "(0-1,1-1,0-1)"),
                RawScheduleRow::new(&s, 3, "", "Luleå HF - AIK", "bad", "(0-1)"),
                RawScheduleRow::new(&s, 4, "2023-01-09 19:00", "AIK - Frölunda HC", "", ""),
            ],
            vec![RawScheduleRow::new(&t, 0, "2023-09-15 19:00", "AIK - Linköping HC", "0-1", "(0-0,0-1,0-0)")],
        ]
    }

    #[test]
    fn test_pipeline_end_to_end() {
        let output = FeaturePipeline::new(FeatureConfig::default()).run(&rows()).unwrap();

        assert_eq!(output.batch.games.len(), 5);
        assert_eq!(output.batch.rejected.len(), 1);
        assert_eq!(output.rows.len(), 10);

        let aik: Vec<_> = output
            .rows
            .iter()
            .filter(|r| r.record.team == "AIK" && r.record.schedule_id.as_str() == "12345")
            .collect();
        assert_eq!(aik.len(), 2);
        assert_eq!(aik[0].record.opponent, "Linköping HC");
        assert_eq!(aik[0].record.result, Some(TeamResult::Win));
        assert_eq!(aik[0].table_position, 1);
        assert_eq!(aik[1].record.matchday, 2);
        assert_eq!(aik[1].record.result, None);
        assert_eq!(aik[1].features.points_cum_prev, 3);

        // Second schedule starts over but head-to-head carries across
        let next = output
            .rows
            .iter()
            .find(|r| r.record.team == "AIK" && r.record.schedule_id.as_str() == "12346")
            .unwrap();
        assert_eq!(next.record.matchday, 1);
        assert_eq!(next.features.points_cum_prev, 0);
        assert_eq!(next.features.h2h_win, 1.0);
        assert_eq!(next.record.h_a, HomeAway::Home);
    }

    #[test]
    fn test_shootout_points_in_pipeline() {
        let output = FeaturePipeline::new(FeatureConfig::default()).run(&rows()).unwrap();
        let points = |team: &str| {
            output
                .rows
                .iter()
                .find(|r| r.record.team == team && r.record.matchday == 1)
                .map(|r| (r.record.result, r.record.points))
                .unwrap()
        };
        assert_eq!(points("Frölunda HC"), (Some(TeamResult::Draw), 2));
        assert_eq!(points("Luleå HF"), (Some(TeamResult::Draw), 1));
    }

    #[test]
    fn test_same_day_games_keep_page_order() {
        let output = FeaturePipeline::new(FeatureConfig::default()).run(&rows()).unwrap();
        let seqs: Vec<_> = output.batch.games.iter().map(|g| g.seq).collect();
        assert_eq!(seqs, [0, 1, 2, 4, 5]);
    }
}
