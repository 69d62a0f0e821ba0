//! swehockey scraper for schedule and game event pages
//!
//! Schedule pages: `{base}/ScheduleAndResults/Schedule/{schedule_id}`.
//! Event pages: `{base}/Game/Events/{game_id}`.
//! Supports caching HTML files for offline runs and reduced load.

use super::{scraper_error, with_retry, ScheduleSource};
use crate::data::events::{filter_timed, GameEvent, GameSummary};
use crate::data::RawScheduleRow;
use crate::{HockeyError, Result, ScheduleId, ScraperConfig};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::path::{Path, PathBuf};

/// Position of the schedule table among the page's tables
const SCHEDULE_TABLE: usize = 2;
/// Position of the shot summary table on an event page
const SUMMARY_TABLE: usize = 2;
/// Position of the event log table on an event page
const EVENT_TABLE: usize = 5;

/// Schedule table columns for date, game, score, period score, spectators.
///
/// The table gained a leading `Round` column in 2018/19; older seasons have
/// an extra column between the date and the game instead.
const ROUND_LAYOUT: [usize; 5] = [1, 2, 3, 4, 5];
const LEGACY_LAYOUT: [usize; 5] = [1, 3, 4, 5, 6];

/// Scraper for stats.swehockey.se
pub struct SwehockeyScraper {
    client: reqwest::blocking::Client,
    base_url: String,
    max_attempts: u32,
    /// Optional cache directory for offline HTML files
    cache_dir: Option<PathBuf>,
    /// If true, only use cache (no network requests)
    offline_only: bool,
}

impl SwehockeyScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("hockey-features/0.1")
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(SwehockeyScraper {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_attempts: config.max_attempts,
            cache_dir: None,
            offline_only: false,
        })
    }

    /// Create scraper with a cache directory
    pub fn with_cache<P: AsRef<Path>>(mut self, cache_dir: P) -> Self {
        self.cache_dir = Some(cache_dir.as_ref().to_path_buf());
        self
    }

    /// Set offline-only mode (no network requests, cache must exist)
    pub fn offline_only(mut self, offline: bool) -> Self {
        self.offline_only = offline;
        self
    }

    pub fn schedule_url(&self, schedule_id: &ScheduleId) -> String {
        format!("{}/ScheduleAndResults/Schedule/{}", self.base_url, schedule_id)
    }

    pub fn events_url(&self, game_id: &str) -> String {
        format!("{}/Game/Events/{}", self.base_url, game_id)
    }

    /// Get the cache file path for a URL
    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(cache_file_name(url)))
    }

    fn load_from_cache(&self, url: &str) -> Option<String> {
        let path = self.cache_path(url)?;
        if path.exists() {
            log::debug!("Loading from cache: {}", path.display());
            std::fs::read_to_string(&path).ok()
        } else {
            None
        }
    }

    fn save_to_cache(&self, url: &str, html: &str) -> Result<()> {
        if let Some(path) = self.cache_path(url) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, html)?;
            log::debug!("Saved to cache: {}", path.display());
        }
        Ok(())
    }

    /// Fetch a page, preferring the cache
    fn fetch_html(&self, url: &str) -> Result<String> {
        if let Some(html) = self.load_from_cache(url) {
            return Ok(html);
        }

        if self.offline_only {
            return Err(scraper_error(format!(
                "No cached data for {} (offline mode)",
                url
            )));
        }

        log::debug!("Fetching {}", url);
        let html = with_retry(|| self.download(url), self.max_attempts)?;

        if let Err(e) = self.save_to_cache(url, &html) {
            log::warn!("Failed to cache {}: {}", url, e);
        }

        Ok(html)
    }

    fn download(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(scraper_error(format!("HTTP {}: {}", response.status(), url)));
        }
        Ok(response.text()?)
    }

    /// Fetch the event log and shot summary of one game
    pub fn fetch_game(&self, game_id: &str) -> Result<(Vec<GameEvent>, Option<GameSummary>)> {
        let url = self.events_url(game_id);
        log::info!("Fetching game {} from {}", game_id, url);
        let html = self.fetch_html(&url)?;
        parse_event_page(&html, game_id)
    }

    /// Parse every cached schedule page in a directory
    pub fn parse_directory<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<Vec<RawScheduleRow>>> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map(|e| e == "html").unwrap_or(false))
            .collect();
        entries.sort();

        let mut batches = Vec::new();
        for path in entries {
            let Some(schedule_id) = schedule_id_from_cache_file(&path) else {
                continue;
            };
            log::info!("Parsing {}", path.display());
            let html = std::fs::read_to_string(&path)?;
            match parse_schedule_page(&html, &schedule_id) {
                Ok(rows) => {
                    log::info!("  Found {} rows", rows.len());
                    batches.push(rows);
                }
                Err(e) => log::warn!("  Failed: {}", e),
            }
        }

        Ok(batches)
    }
}

impl ScheduleSource for SwehockeyScraper {
    fn fetch_schedule(&self, schedule_id: &ScheduleId) -> Result<Vec<RawScheduleRow>> {
        let url = self.schedule_url(schedule_id);
        log::info!("Collecting schedule {} from {}", schedule_id, url);
        let html = self.fetch_html(&url)?;
        parse_schedule_page(&html, schedule_id)
    }
}

/// Safe file name for a cached URL
fn cache_file_name(url: &str) -> String {
    url.replace("https://", "")
        .replace("http://", "")
        .replace(['/', '?'], "_")
        + ".html"
}

/// Recover the schedule id from a cached schedule page's file name
fn schedule_id_from_cache_file(path: &Path) -> Option<ScheduleId> {
    let stem = path.file_stem()?.to_str()?;
    let (_, id) = stem.split_once("ScheduleAndResults_Schedule_")?;
    if id.is_empty() {
        return None;
    }
    Some(ScheduleId::new(id))
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| HockeyError::Parse(format!("bad selector {}: {:?}", css, e)))
}

/// Cell text with whitespace collapsed
fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn nth_table<'a>(document: &'a Html, index: usize, what: &str) -> Result<ElementRef<'a>> {
    let table_selector = selector("table")?;
    document
        .select(&table_selector)
        .nth(index)
        .ok_or_else(|| scraper_error(format!("{} table not found", what)))
}

/// Parse a schedule page into raw rows, in page order
pub fn parse_schedule_page(html: &str, schedule_id: &ScheduleId) -> Result<Vec<RawScheduleRow>> {
    let document = Html::parse_document(html);
    let table = nth_table(&document, SCHEDULE_TABLE, "schedule")?;

    let tr_selector = selector("tr")?;
    let th_selector = selector("th")?;
    let td_selector = selector("td")?;
    let a_selector = selector("a")?;
    let digits = Regex::new(r"\d+").map_err(|e| HockeyError::Parse(e.to_string()))?;

    let has_round_column = table.select(&tr_selector).any(|row| {
        row.select(&th_selector)
            .next()
            .map(|th| cell_text(&th) == "Round")
            .unwrap_or(false)
    });
    let layout = if has_round_column {
        ROUND_LAYOUT
    } else {
        LEGACY_LAYOUT
    };
    let [date_col, game_col, score_col, period_col, spectators_col] = layout;

    let mut rows = Vec::new();
    for tr in table.select(&tr_selector) {
        let cells: Vec<ElementRef> = tr.select(&td_selector).collect();
        if cells.len() <= spectators_col {
            continue;
        }

        let game_text = cell_text(&cells[game_col]);
        if game_text.is_empty() {
            continue;
        }

        let spectators = cell_text(&cells[spectators_col]);
        let game_id = tr
            .select(&a_selector)
            .filter_map(|a| a.value().attr("href").or_else(|| a.value().attr("onclick")))
            .find_map(|target| digits.find(target).map(|m| m.as_str().to_string()));

        rows.push(RawScheduleRow {
            schedule_id: schedule_id.clone(),
            row_index: rows.len(),
            date_text: cell_text(&cells[date_col]),
            game_text,
            score_text: cell_text(&cells[score_col]),
            periodscore_text: cell_text(&cells[period_col]),
            spectators_text: (!spectators.is_empty()).then_some(spectators),
            game_id,
        });
    }

    log::debug!("parse_schedule_page found {} rows", rows.len());
    Ok(rows)
}

/// Parse a game event page into timed events and the shot summary
pub fn parse_event_page(html: &str, game_id: &str) -> Result<(Vec<GameEvent>, Option<GameSummary>)> {
    let document = Html::parse_document(html);
    let tr_selector = selector("tr")?;
    let td_selector = selector("td")?;

    let data_rows = |table: ElementRef| -> Vec<Vec<String>> {
        table
            .select(&tr_selector)
            .map(|tr| tr.select(&td_selector).map(|td| cell_text(&td)).collect::<Vec<_>>())
            .filter(|cells| !cells.is_empty())
            .collect()
    };

    let event_table = nth_table(&document, EVENT_TABLE, "event")?;
    let logged: Vec<GameEvent> = data_rows(event_table)
        .into_iter()
        .map(|cells| {
            let col = |i: usize| cells.get(i).cloned().unwrap_or_default();
            GameEvent {
                game_id: game_id.to_string(),
                time: col(0),
                event: col(1),
                team: col(2),
                players: col(3),
                on_ice: col(4),
            }
        })
        .collect();
    let events = filter_timed(logged);

    let summary = nth_table(&document, SUMMARY_TABLE, "summary")
        .ok()
        .and_then(|table| {
            let rows = data_rows(table);
            let league = rows.first()?.get(3)?.clone();
            let shots = rows.get(1)?;
            Some(GameSummary {
                game_id: game_id.to_string(),
                league,
                shots_home: shots.get(1)?.clone(),
                shots_home_period: shots.get(2)?.clone(),
                shots_away: shots.get(5)?.clone(),
                shots_away_period: shots.get(6)?.clone(),
            })
        });

    Ok((events, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILLER: &str = "<table><tr><td>menu</td></tr></table><table><tr><td>logo</td></tr></table>";

    fn round_page() -> String {
        format!(
            r#"<html><body>{FILLER}
            <table>
              <tr><th colspan="7">SHL 2022/23</th></tr>
              <tr><th>Round</th><th>Date</th><th>Game</th><th>Result</th><th>Periods</th><th>Spectators</th><th>Venue</th></tr>
              <tr class="tdOdd">
                <td>1</td><td>2023-01-05 19:00</td>
                <td><a href="javascript:openonlinewindow('/Game/Events/404541','')">AIK IF - Linköpings HC</a></td>
                <td>4 - 2</td><td>(1-0, 2-1, 1-1)</td><td>4 000</td><td>Hovet</td>
              </tr>
              <tr class="tdNormal">
                <td>1</td><td>19:30</td>
                <td><a href="javascript:openonlinewindow('/Game/Events/404542','')">Frölunda HC - Luleå HF</a></td>
                <td></td><td></td><td></td><td>Scandinavium</td>
              </tr>
            </table></body></html>"#
        )
    }

    #[test]
    fn test_parse_round_layout() {
        let rows = parse_schedule_page(&round_page(), &ScheduleId::new("12345")).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].row_index, 0);
        assert_eq!(rows[0].date_text, "2023-01-05 19:00");
        assert_eq!(rows[0].game_text, "AIK IF - Linköpings HC");
        assert_eq!(rows[0].score_text, "4 - 2");
        assert_eq!(rows[0].periodscore_text, "(1-0, 2-1, 1-1)");
        assert_eq!(rows[0].spectators_text.as_deref(), Some("4 000"));
        assert_eq!(rows[0].game_id.as_deref(), Some("404541"));

        assert_eq!(rows[1].date_text, "19:30");
        assert_eq!(rows[1].score_text, "");
        assert_eq!(rows[1].spectators_text, None);
        assert_eq!(rows[1].game_id.as_deref(), Some("404542"));
    }

    #[test]
    fn test_parse_legacy_layout() {
        let html = format!(
            r#"<html><body>{FILLER}
            <table>
              <tr><th>#</th><th>Date</th><th></th><th>Game</th><th>Result</th><th>Periods</th><th>Spectators</th></tr>
              <tr><td>1</td><td>2017-09-16 15:00</td><td>x</td><td>Brynäs IF - HV 71</td><td>3-1</td><td>(1-0,1-1,1-0)</td><td>6 100</td></tr>
            </table></body></html>"#
        );
        let rows = parse_schedule_page(&html, &ScheduleId::new("8121")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].game_text, "Brynäs IF - HV 71");
        assert_eq!(rows[0].score_text, "3-1");
        assert_eq!(rows[0].game_id, None);
    }

    #[test]
    fn test_missing_schedule_table() {
        let result = parse_schedule_page("<html><body></body></html>", &ScheduleId::new("1"));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_event_page() {
        let html = r#"<html><body>
            <table><tr><td>a</td></tr></table>
            <table><tr><td>b</td></tr></table>
            <table>
              <tr><td>x</td><td>x</td><td>x</td><td>SHL</td></tr>
              <tr><td>Shots</td><td>31</td><td>(10-11-10)</td><td></td><td></td><td>25</td><td>(8-9-8)</td></tr>
            </table>
            <table><tr><td>c</td></tr></table>
            <table><tr><td>d</td></tr></table>
            <table>
              <tr><td>1st period</td></tr>
              <tr><td>04:12</td><td>1-0 (EQ)</td><td>AIK</td><td>12. Player</td><td>Pos. Part.: 3, 12</td></tr>
              <tr><td>2nd period</td></tr>
              <tr><td>25:40</td><td>Penalty</td><td>LHC</td><td>7. Other</td></tr>
            </table>
            </body></html>"#;

        let (events, summary) = parse_event_page(html, "404541").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].time, "04:12");
        assert_eq!(events[0].event, "1-0 (EQ)");
        assert_eq!(events[1].on_ice, "");
        assert!(events.iter().all(|e| e.game_id == "404541"));

        let summary = summary.unwrap();
        assert_eq!(summary.league, "SHL");
        assert_eq!(summary.shots_home, "31");
        assert_eq!(summary.shots_away_period, "(8-9-8)");
    }

    #[test]
    fn test_cache_file_names() {
        let name = cache_file_name("http://stats.swehockey.se/ScheduleAndResults/Schedule/12345");
        assert_eq!(name, "stats.swehockey.se_ScheduleAndResults_Schedule_12345.html");
        let id = schedule_id_from_cache_file(Path::new(&name)).unwrap();
        assert_eq!(id.as_str(), "12345");
        assert!(schedule_id_from_cache_file(Path::new("stats.swehockey.se_Game_Events_1.html")).is_none());
    }
}
