//! Row normalizer
//!
//! Parses raw schedule rows into typed [`Game`]s. Schedule pages list the
//! date only on the first game of each day, so dates are forward-filled in
//! page order before anything is reordered.

use super::{RawScheduleRow, TeamDirectory};
use crate::{Game, HockeyError, PeriodScore, Result, MAX_PERIODS};
use chrono::NaiveDate;

/// Output of normalizing one ingestion batch
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub games: Vec<Game>,
    /// Rows that could not be parsed; the rest of the batch is unaffected
    pub rejected: Vec<HockeyError>,
}

/// Normalize a batch of raw rows in page order.
///
/// `seq_offset` is added to each game's ingestion position so that several
/// batches can be concatenated without colliding tie-breakers.
pub fn normalize_batch(
    rows: &[RawScheduleRow],
    teams: &TeamDirectory,
    seq_offset: usize,
) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    let mut last_date: Option<NaiveDate> = None;

    for (i, row) in rows.iter().enumerate() {
        // Forward fill happens even for rows rejected later on
        let date = match parse_date(&row.date_text) {
            Ok(Some(date)) => {
                last_date = Some(date);
                Some(date)
            }
            Ok(None) => last_date,
            Err(message) => {
                batch.rejected.push(malformed(row, message));
                continue;
            }
        };

        let Some(date) = date else {
            batch
                .rejected
                .push(malformed(row, "blank date with no previous date".to_string()));
            continue;
        };

        match normalize_row(row, date, teams, seq_offset + i) {
            Ok(game) => {
                if !game.is_score_consistent() {
                    log::debug!(
                        "{} {} - {}: score does not match regulation periods",
                        game.date,
                        game.home_team,
                        game.away_team
                    );
                }
                batch.games.push(game);
            }
            Err(e) => batch.rejected.push(e),
        }
    }

    for error in &batch.rejected {
        log::warn!("Skipping row: {}", error);
    }

    batch
}

/// Normalize a single row with an already resolved date
pub fn normalize_row(
    row: &RawScheduleRow,
    date: NaiveDate,
    teams: &TeamDirectory,
    seq: usize,
) -> Result<Game> {
    let (home, away) = split_teams(&row.game_text)
        .ok_or_else(|| malformed(row, format!("cannot split teams in {:?}", row.game_text)))?;

    let (score_home, score_away) = parse_score(&row.score_text)
        .ok_or_else(|| malformed(row, format!("cannot split score {:?}", row.score_text)))?;

    Ok(Game {
        date,
        schedule_id: row.schedule_id.clone(),
        home_team: teams.canonical(home),
        away_team: teams.canonical(away),
        score_home,
        score_away,
        period_scores: parse_period_scores(&row.periodscore_text),
        spectators: row.spectators_text.as_deref().and_then(parse_spectators),
        game_id: row.game_id.clone(),
        seq,
    })
}

fn malformed(row: &RawScheduleRow, message: String) -> HockeyError {
    HockeyError::MalformedRow {
        schedule_id: row.schedule_id.clone(),
        row: row.row_index,
        message,
    }
}

/// Parse a schedule date cell; `Ok(None)` for a blank cell.
///
/// Cells look like `2023-01-05 19:00` on the first game of a day and just
/// `19:00` on the following ones; the trailing time is dropped.
fn parse_date(text: &str) -> std::result::Result<Option<NaiveDate>, String> {
    let date_part = strip_clock(text.trim());
    if date_part.is_empty() || date_part.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| format!("invalid date {:?}: {}", text, e))
}

/// Drop a trailing `HH:MM`
fn strip_clock(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() < 5 {
        return text;
    }
    let tail = &bytes[bytes.len() - 5..];
    if tail[2] == b':' && [0, 1, 3, 4].iter().all(|&i| tail[i].is_ascii_digit()) {
        text[..text.len() - 5].trim_end()
    } else {
        text
    }
}

/// Split `"Home Team - Away Team"`.
///
/// Club names can contain hyphens (`IF Troja-Ljungby`), so the spaced
/// separator wins over a bare one.
fn split_teams(text: &str) -> Option<(&str, &str)> {
    let (home, away) = text.split_once(" - ").or_else(|| text.split_once('-'))?;
    let (home, away) = (home.trim(), away.trim());
    if home.is_empty() || away.is_empty() {
        return None;
    }
    Some((home, away))
}

/// Parse `"4-2"`. An empty cell is an unplayed game; a cell without a
/// separator is malformed. Unparseable halves become missing.
fn parse_score(text: &str) -> Option<(Option<u32>, Option<u32>)> {
    let text = text.trim();
    if text.is_empty() {
        return Some((None, None));
    }
    let (home, away) = text.split_once('-')?;
    Some((parse_goals(home), parse_goals(away)))
}

fn parse_goals(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}

/// Parse `"(1-0,2-1,1-1)"` into at most five periods
fn parse_period_scores(text: &str) -> Vec<PeriodScore> {
    let inner = text.trim().trim_start_matches('(').trim_end_matches(')');
    if inner.trim().is_empty() {
        return vec![];
    }

    inner
        .splitn(MAX_PERIODS, ',')
        .map(|period| match period.split_once('-') {
            Some((home, away)) => PeriodScore {
                home: parse_goals(home),
                away: parse_goals(away),
            },
            None => PeriodScore::default(),
        })
        .collect()
}

/// Spectator counts are printed with thousand separators
fn parse_spectators(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScheduleId;

    fn schedule() -> ScheduleId {
        ScheduleId::new("12345")
    }

    #[test]
    fn test_end_to_end_row() {
        let mut row = RawScheduleRow::new(
            &schedule(),
            0,
            "2023-01-05",
            "AIK IF - Linköpings HC",
            "4-2",
            "(1-0,2-1,1-1)",
        );
        row.spectators_text = Some("4000".to_string());

        let batch = normalize_batch(&[row], &TeamDirectory::new(), 0);
        assert!(batch.rejected.is_empty());
        let game = &batch.games[0];
        assert_eq!(game.date, NaiveDate::from_ymd_opt(2023, 1, 5).unwrap());
        assert_eq!(game.home_team, "AIK");
        assert_eq!(game.away_team, "Linköping HC");
        assert_eq!(game.score_home, Some(4));
        assert_eq!(game.score_away, Some(2));
        assert_eq!(game.spectators, Some(4000));
        assert_eq!(
            game.period_scores,
            vec![
                PeriodScore::new(1, 0),
                PeriodScore::new(2, 1),
                PeriodScore::new(1, 1)
            ]
        );
    }

    #[test]
    fn test_forward_fill_dates() {
        let s = schedule();
        let rows = vec![
            RawScheduleRow::new(&s, 0, "2023-01-05 19:00", "A - B", "1-0", "(1-0,0-0,0-0)"),
            RawScheduleRow::new(&s, 1, "19:30", "C - D", "2-1", "(1-0,1-1,0-0)"),
            RawScheduleRow::new(&s, 2, "2023-01-07 15:15", "E - F", "0-3", "(0-1,0-1,0-1)"),
            RawScheduleRow::new(&s, 3, "  ", "G - H", "", ""),
        ];

        let batch = normalize_batch(&rows, &TeamDirectory::new(), 10);
        assert!(batch.rejected.is_empty());
        let dates: Vec<_> = batch.games.iter().map(|g| g.date.to_string()).collect();
        assert_eq!(dates, ["2023-01-05", "2023-01-05", "2023-01-07", "2023-01-07"]);
        let seqs: Vec<_> = batch.games.iter().map(|g| g.seq).collect();
        assert_eq!(seqs, [10, 11, 12, 13]);
    }

    #[test]
    fn test_malformed_rows_do_not_abort_batch() {
        let s = schedule();
        let rows = vec![
            RawScheduleRow::new(&s, 0, "2023-01-05", "A - B", "3:1", "(1-0,1-0,1-1)"),
            RawScheduleRow::new(&s, 1, "", "No separator here", "1-0", ""),
            RawScheduleRow::new(&s, 2, "", "C - D", "2-1", "(1-0,1-1,0-0)"),
        ];

        let batch = normalize_batch(&rows, &TeamDirectory::new(), 0);
        assert_eq!(batch.games.len(), 1);
        assert_eq!(batch.games[0].home_team, "C");
        // Date still filled from the rejected first row
        assert_eq!(batch.games[0].date.to_string(), "2023-01-05");
        assert_eq!(batch.rejected.len(), 2);
        match &batch.rejected[0] {
            HockeyError::MalformedRow {
                schedule_id, row, ..
            } => {
                assert_eq!(schedule_id.as_str(), "12345");
                assert_eq!(*row, 0);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_oversized_period_scores_do_not_abort_batch() {
        let s = schedule();
        let rows = vec![
            RawScheduleRow::new(&s, 0, "2023-01-05", "A - B", "1-0", "(4294967295-0,1-0,0-0)"),
            RawScheduleRow::new(&s, 1, "", "C - D", "2-1", "(1-0,1-1,0-0)"),
        ];

        let batch = normalize_batch(&rows, &TeamDirectory::new(), 0);
        assert_eq!(batch.games.len() + batch.rejected.len(), 2);
        assert!(!batch.games[0].is_score_consistent());
        assert_eq!(batch.games[1].home_team, "C");
        assert!(batch.games[1].is_score_consistent());
    }

    #[test]
    fn test_blank_first_date_rejected() {
        let s = schedule();
        let rows = vec![RawScheduleRow::new(&s, 0, "", "A - B", "1-0", "")];
        let batch = normalize_batch(&rows, &TeamDirectory::new(), 0);
        assert!(batch.games.is_empty());
        assert_eq!(batch.rejected.len(), 1);
    }

    #[test]
    fn test_hyphenated_team_names() {
        assert_eq!(
            split_teams("IF Troja-Ljungby - Tingsryds AIF"),
            Some(("IF Troja-Ljungby", "Tingsryds AIF"))
        );
        assert_eq!(split_teams("A-B"), Some(("A", "B")));
        assert_eq!(split_teams("A -"), None);
    }

    #[test]
    fn test_period_scores_with_extra_periods() {
        let periods = parse_period_scores("(1-0, 0-1, 1-1, 0-0, 1-0)");
        assert_eq!(periods.len(), 5);
        assert_eq!(periods[3], PeriodScore::new(0, 0));
        assert_eq!(periods[4], PeriodScore::new(1, 0));

        let broken = parse_period_scores("(1-0,x-1,3)");
        assert_eq!(broken[1], PeriodScore { home: None, away: Some(1) });
        assert_eq!(broken[2], PeriodScore::default());

        assert!(parse_period_scores("()").is_empty());
    }

    #[test]
    fn test_unplayed_score() {
        assert_eq!(parse_score(""), Some((None, None)));
        assert_eq!(parse_score(" 5 - 1 "), Some((Some(5), Some(1))));
        assert_eq!(parse_score("5:1"), None);
    }

    #[test]
    fn test_spectators() {
        assert_eq!(parse_spectators("5 800"), Some(5800));
        assert_eq!(parse_spectators("12,004"), Some(12004));
        assert_eq!(parse_spectators(""), None);
    }
}
