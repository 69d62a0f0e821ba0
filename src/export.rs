//! Tabular output
//!
//! Feature rows go to CSV (one column per feature, empty cell for missing
//! values) or JSON. Raw schedule rows are kept as JSON between the sync and
//! features steps.

use crate::data::events::{GameEvent, GameSummary};
use crate::data::RawScheduleRow;
use crate::features::TeamGameFeatures;
use crate::{Result, MAX_PERIODS};
use serde::Serialize;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Output format for feature tables
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use csv or json.", s)),
        }
    }
}

impl OutputFormat {
    /// Guess from a file extension, defaulting to CSV
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Csv,
        }
    }
}

fn create<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn cell<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Column names for a feature table with `lags` lagged results
pub fn feature_header(lags: usize) -> Vec<String> {
    let mut header: Vec<String> = [
        "team",
        "opponent",
        "h_a",
        "date",
        "schedule_id",
        "game_id",
        "matchday",
        "matchday_h_a",
        "score_team",
        "score_opponent",
        "result",
        "points",
        "spectators",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    for p in 1..=MAX_PERIODS {
        header.push(format!("p{}score_team", p));
        header.push(format!("p{}score_opponent", p));
        header.push(format!("result_p{}", p));
    }

    header.extend(
        [
            "win_ratio",
            "draw_ratio",
            "lost_ratio",
            "scored_avg_rolling",
            "conceded_avg_rolling",
            "scored_cum",
            "conceded_cum",
            "points_cum",
            "goal_difference_cum",
            "scored_cum_prev",
            "conceded_cum_prev",
            "points_cum_prev",
            "scored_cum_prev_avg",
            "conceded_cum_prev_avg",
            "points_cum_prev_avg",
            "points_cum_h_a",
            "points_cum_h_a_prev",
            "points_cum_h_a_prev_avg",
            "h2h_win",
            "h2h_draw",
            "h2h_lost",
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    header.extend((1..=lags).map(|k| format!("result_l{}", k)));
    header.push("table_position".to_string());
    header
}

/// One CSV record, matching [`feature_header`]
pub fn feature_record(row: &TeamGameFeatures, lags: usize) -> Vec<String> {
    let r = &row.record;
    let f = &row.features;

    let mut record = vec![
        r.team.clone(),
        r.opponent.clone(),
        r.h_a.to_string(),
        r.date.to_string(),
        r.schedule_id.to_string(),
        cell(r.game_id.as_ref()),
        r.matchday.to_string(),
        r.matchday_h_a.to_string(),
        cell(r.score_team),
        cell(r.score_opponent),
        cell(r.result),
        r.points.to_string(),
        cell(r.spectators),
    ];

    for p in 0..MAX_PERIODS {
        let score = r.period_scores.get(p);
        record.push(cell(score.and_then(|s| s.home)));
        record.push(cell(score.and_then(|s| s.away)));
        record.push(cell(r.period_results.get(p).copied().flatten()));
    }

    record.extend([
        cell(f.win_ratio),
        cell(f.draw_ratio),
        cell(f.lost_ratio),
        cell(f.scored_avg_rolling),
        cell(f.conceded_avg_rolling),
        f.scored_cum.to_string(),
        f.conceded_cum.to_string(),
        f.points_cum.to_string(),
        f.goal_difference_cum.to_string(),
        f.scored_cum_prev.to_string(),
        f.conceded_cum_prev.to_string(),
        f.points_cum_prev.to_string(),
        cell(f.scored_cum_prev_avg),
        cell(f.conceded_cum_prev_avg),
        cell(f.points_cum_prev_avg),
        f.points_cum_h_a.to_string(),
        f.points_cum_h_a_prev.to_string(),
        cell(f.points_cum_h_a_prev_avg),
        f.h2h_win.to_string(),
        f.h2h_draw.to_string(),
        f.h2h_lost.to_string(),
    ]);

    record.extend((0..lags).map(|k| cell(f.result_lags.get(k).copied().flatten())));
    record.push(row.table_position.to_string());
    record
}

/// Write feature rows as CSV
pub fn write_features_csv<W: Write>(writer: W, rows: &[TeamGameFeatures], lags: usize) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(feature_header(lags))?;
    for row in rows {
        wtr.write_record(feature_record(row, lags))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write feature rows to a file in the given format
pub fn save_features<P: AsRef<Path>>(
    path: P,
    rows: &[TeamGameFeatures],
    lags: usize,
    format: OutputFormat,
) -> Result<()> {
    let writer = create(&path)?;
    match format {
        OutputFormat::Csv => write_features_csv(writer, rows, lags)?,
        OutputFormat::Json => serde_json::to_writer_pretty(writer, rows)?,
    }
    log::info!("Wrote {} feature rows to {}", rows.len(), path.as_ref().display());
    Ok(())
}

/// Write any flat serializable rows as CSV
fn save_csv<P: AsRef<Path>, T: Serialize>(path: P, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(create(&path)?);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_events<P: AsRef<Path>>(path: P, events: &[GameEvent]) -> Result<()> {
    save_csv(path, events)
}

pub fn save_summaries<P: AsRef<Path>>(path: P, summaries: &[GameSummary]) -> Result<()> {
    save_csv(path, summaries)
}

/// Store raw schedule batches between CLI steps
pub fn save_rows<P: AsRef<Path>>(path: P, batches: &[Vec<RawScheduleRow>]) -> Result<()> {
    serde_json::to_writer_pretty(create(&path)?, batches)?;
    Ok(())
}

pub fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<RawScheduleRow>>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
