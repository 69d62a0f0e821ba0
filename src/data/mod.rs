//! Data ingestion and normalization
//!
//! Scrapers for swehockey pages, team-name canonicalization and the row
//! normalizer that turns raw schedule rows into typed games.

pub mod events;
pub mod normalize;
pub mod scrapers;
pub mod teams;

pub use normalize::{normalize_batch, NormalizedBatch};
pub use teams::TeamDirectory;

use crate::ScheduleId;
use serde::{Deserialize, Serialize};

/// One schedule table row exactly as extracted from the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScheduleRow {
    pub schedule_id: ScheduleId,
    /// Row position in the schedule page
    pub row_index: usize,
    pub date_text: String,
    pub game_text: String,
    pub score_text: String,
    pub periodscore_text: String,
    pub spectators_text: Option<String>,
    pub game_id: Option<String>,
}

impl RawScheduleRow {
    /// Row without spectators or game id
    pub fn new(
        schedule_id: &ScheduleId,
        row_index: usize,
        date_text: &str,
        game_text: &str,
        score_text: &str,
        periodscore_text: &str,
    ) -> Self {
        RawScheduleRow {
            schedule_id: schedule_id.clone(),
            row_index,
            date_text: date_text.to_string(),
            game_text: game_text.to_string(),
            score_text: score_text.to_string(),
            periodscore_text: periodscore_text.to_string(),
            spectators_text: None,
            game_id: None,
        }
    }
}
