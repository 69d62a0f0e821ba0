//! Swedish ice hockey schedule features
//!
//! Scrapes schedule and event pages from swehockey and derives leak-free,
//! per-team-per-game features (form, cumulative standings, head-to-head,
//! table position) for downstream modeling.

pub mod data;
pub mod export;
pub mod features;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of one competition instance (a league season on swehockey)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(pub String);

impl ScheduleId {
    pub fn new(id: impl Into<String>) -> Self {
        ScheduleId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Winner of a game or period, seen from the schedule (home/away) perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
    Draw,
}

impl Side {
    /// Strict comparison of two scores
    pub fn compare(home: u32, away: u32) -> Self {
        match home.cmp(&away) {
            std::cmp::Ordering::Greater => Side::Home,
            std::cmp::Ordering::Less => Side::Away,
            std::cmp::Ordering::Equal => Side::Draw,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Home => write!(f, "home"),
            Side::Away => write!(f, "away"),
            Side::Draw => write!(f, "draw"),
        }
    }
}

/// Whether a team played a game at home or away
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeAway {
    Home,
    Away,
}

impl fmt::Display for HomeAway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomeAway::Home => write!(f, "home"),
            HomeAway::Away => write!(f, "away"),
        }
    }
}

/// Result of a game or period from one team's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamResult {
    Win,
    Draw,
    Lost,
}

impl TeamResult {
    /// Map a schedule-perspective result onto the given side of the game
    pub fn from_side(side: Side, h_a: HomeAway) -> Self {
        match (side, h_a) {
            (Side::Draw, _) => TeamResult::Draw,
            (Side::Home, HomeAway::Home) | (Side::Away, HomeAway::Away) => TeamResult::Win,
            (Side::Home, HomeAway::Away) | (Side::Away, HomeAway::Home) => TeamResult::Lost,
        }
    }
}

impl fmt::Display for TeamResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamResult::Win => write!(f, "win"),
            TeamResult::Draw => write!(f, "draw"),
            TeamResult::Lost => write!(f, "lost"),
        }
    }
}

/// Goals in one period; either side may be missing on malformed pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodScore {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

impl PeriodScore {
    pub fn new(home: u32, away: u32) -> Self {
        PeriodScore {
            home: Some(home),
            away: Some(away),
        }
    }

    /// True when at least one side has a score
    pub fn is_recorded(&self) -> bool {
        self.home.is_some() || self.away.is_some()
    }

    /// The same period seen from the away team
    pub fn flipped(&self) -> Self {
        PeriodScore {
            home: self.away,
            away: self.home,
        }
    }
}

/// Number of regulation periods in a hockey game
pub const REGULATION_PERIODS: usize = 3;

/// Periods 4 and 5 are overtime and shootout
pub const MAX_PERIODS: usize = 5;

/// One scheduled game, normalized from a schedule page row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub date: NaiveDate,
    pub schedule_id: ScheduleId,
    pub home_team: String,
    pub away_team: String,
    pub score_home: Option<u32>,
    pub score_away: Option<u32>,
    pub period_scores: Vec<PeriodScore>,
    pub spectators: Option<u32>,
    pub game_id: Option<String>,
    /// Position in the ingestion batch; breaks ties between same-day games
    pub seq: usize,
}

impl Game {
    /// True when the final score is known
    pub fn is_played(&self) -> bool {
        self.score_home.is_some() && self.score_away.is_some()
    }

    /// True when overtime or a shootout was recorded
    pub fn went_to_extra_periods(&self) -> bool {
        self.period_scores
            .iter()
            .skip(REGULATION_PERIODS)
            .any(PeriodScore::is_recorded)
    }

    /// True when all regulation periods have both sides recorded
    pub fn has_full_regulation(&self) -> bool {
        self.period_scores
            .get(..REGULATION_PERIODS)
            .map_or(false, |periods| {
                periods.iter().all(|p| p.home.is_some() && p.away.is_some())
            })
    }

    /// Sum of the regulation periods, if every regulation period is complete
    /// and the sum fits
    pub fn regulation_total(&self) -> Option<(u32, u32)> {
        let regulation = self.period_scores.get(..REGULATION_PERIODS)?;
        regulation.iter().try_fold((0u32, 0u32), |(h, a), p| {
            Some((h.checked_add(p.home?)?, a.checked_add(p.away?)?))
        })
    }

    /// Check that the final score matches the regulation periods.
    ///
    /// Unplayed games and incomplete period lists pass; an overflowing
    /// period sum never matches.
    pub fn is_score_consistent(&self) -> bool {
        match (self.score_home, self.score_away) {
            (Some(h), Some(a)) if self.has_full_regulation() => {
                self.regulation_total() == Some((h, a))
            }
            _ => true,
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum HockeyError {
    #[error("Malformed row {row} in schedule {schedule_id}: {message}")]
    MalformedRow {
        schedule_id: ScheduleId,
        row: usize,
        message: String,
    },

    #[error("Partition {partition} is not in date order at position {position}")]
    PartitionOrdering { partition: String, position: usize },

    #[error("Scraper failed: {message}")]
    Scraper { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, HockeyError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub data: DataConfig,
}

/// How rolling form is reported before a full window of prior games exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollingPolicy {
    /// Mean over whatever prior games exist (up to the window), 0 for the first game
    Partial,
    /// A full window is required; 0 otherwise
    #[default]
    FillZero,
    /// A full window is required; missing otherwise
    Strict,
}

/// First month of a hockey season; games before it belong to the previous one
pub const SEASON_START_MONTH: u32 = 7;

/// What matchday counters and cumulative totals reset on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonKey {
    /// Each schedule on its own (regular season and playoffs are separate)
    #[default]
    ScheduleId,
    /// Every schedule within one July-to-June hockey season together
    Season,
}

impl SeasonKey {
    /// Scope label of a game played on `date` in `schedule_id`
    pub fn scope(&self, schedule_id: &ScheduleId, date: NaiveDate) -> String {
        match self {
            SeasonKey::ScheduleId => schedule_id.to_string(),
            SeasonKey::Season => season_label(date),
        }
    }
}

/// `2023-2024` for any date from July 2023 to June 2024
pub fn season_label(date: NaiveDate) -> String {
    let start = if date.month() >= SEASON_START_MONTH {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}-{}", start, start + 1)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub window: usize,
    pub rolling_policy: RollingPolicy,
    pub lags: usize,
    #[serde(default)]
    pub season_key: SeasonKey,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            window: 5,
            rolling_policy: RollingPolicy::FillZero,
            lags: 5,
            season_key: SeasonKey::ScheduleId,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub schedules: Vec<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            base_url: "http://stats.swehockey.se".to_string(),
            timeout_secs: 30,
            max_attempts: 3,
            schedules: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub cache_dir: String,
    pub rows_path: String,
    pub features_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            cache_dir: "data/cache".to_string(),
            rows_path: "data/rows.json".to_string(),
            features_path: "data/features.csv".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HockeyError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| HockeyError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HockeyError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.features.window == 0 {
            return Err(HockeyError::Config(
                "features.window must be at least 1".to_string(),
            ));
        }
        if self.scraper.max_attempts == 0 {
            return Err(HockeyError::Config(
                "scraper.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_game(periods: Vec<PeriodScore>, score: Option<(u32, u32)>) -> Game {
        Game {
            date: NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
            schedule_id: ScheduleId::new("12345"),
            home_team: "AIK".to_string(),
            away_team: "Linköping HC".to_string(),
            score_home: score.map(|s| s.0),
            score_away: score.map(|s| s.1),
            period_scores: periods,
            spectators: None,
            game_id: None,
            seq: 0,
        }
    }

    #[test]
    fn test_team_result_mapping() {
        assert_eq!(TeamResult::from_side(Side::Home, HomeAway::Home), TeamResult::Win);
        assert_eq!(TeamResult::from_side(Side::Home, HomeAway::Away), TeamResult::Lost);
        assert_eq!(TeamResult::from_side(Side::Away, HomeAway::Away), TeamResult::Win);
        assert_eq!(TeamResult::from_side(Side::Away, HomeAway::Home), TeamResult::Lost);
        assert_eq!(TeamResult::from_side(Side::Draw, HomeAway::Away), TeamResult::Draw);
    }

    #[test]
    fn test_regulation_total() {
        let game = make_game(
            vec![
                PeriodScore::new(1, 0),
                PeriodScore::new(2, 1),
                PeriodScore::new(1, 1),
            ],
            Some((4, 2)),
        );
        assert_eq!(game.regulation_total(), Some((4, 2)));
        assert!(game.is_score_consistent());
        assert!(!game.went_to_extra_periods());

        let short = make_game(vec![PeriodScore::new(1, 0)], Some((1, 0)));
        assert_eq!(short.regulation_total(), None);
        assert!(short.is_score_consistent());
    }

    #[test]
    fn test_extra_periods() {
        let game = make_game(
            vec![
                PeriodScore::new(1, 0),
                PeriodScore::new(0, 1),
                PeriodScore::new(1, 1),
                PeriodScore::new(1, 0),
            ],
            Some((2, 2)),
        );
        assert!(game.went_to_extra_periods());
        assert!(game.is_played());
    }

    #[test]
    fn test_overflowing_regulation_is_inconsistent() {
        let game = make_game(
            vec![
                PeriodScore::new(u32::MAX, 0),
                PeriodScore::new(1, 0),
                PeriodScore::new(0, 0),
            ],
            Some((1, 0)),
        );
        assert!(game.has_full_regulation());
        assert_eq!(game.regulation_total(), None);
        assert!(!game.is_score_consistent());
    }

    #[test]
    fn test_config_roundtrip_defaults() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.features.window, 5);
        assert_eq!(parsed.features.rolling_policy, RollingPolicy::FillZero);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_config_partial_file() {
        let parsed: Config = toml::from_str(
            "[features]\nwindow = 3\nrolling_policy = \"strict\"\nlags = 2\n",
        )
        .unwrap();
        assert_eq!(parsed.features.window, 3);
        assert_eq!(parsed.features.rolling_policy, RollingPolicy::Strict);
        assert_eq!(parsed.data.rows_path, "data/rows.json");
    }

    #[test]
    fn test_season_key_from_config() {
        let parsed: Config = toml::from_str(
            "[features]\nwindow = 5\nrolling_policy = \"fill_zero\"\nlags = 5\nseason_key = \"season\"\n",
        )
        .unwrap();
        assert_eq!(parsed.features.season_key, SeasonKey::Season);
        assert_eq!(Config::default().features.season_key, SeasonKey::ScheduleId);
    }

    #[test]
    fn test_season_label_spans_new_year() {
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(season_label(day(2023, 9, 15)), "2023-2024");
        assert_eq!(season_label(day(2024, 3, 20)), "2023-2024");
        assert_eq!(season_label(day(2024, 7, 1)), "2024-2025");

        let schedule = ScheduleId::new("12345");
        assert_eq!(SeasonKey::ScheduleId.scope(&schedule, day(2024, 3, 20)), "12345");
        assert_eq!(SeasonKey::Season.scope(&schedule, day(2024, 3, 20)), "2023-2024");
    }
}
