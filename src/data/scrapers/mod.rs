//! Web scrapers for hockey schedule data

pub mod swehockey;

pub use swehockey::SwehockeyScraper;

use super::RawScheduleRow;
use crate::{HockeyError, Result, ScheduleId};

/// Anything that can produce raw schedule rows for a schedule id
pub trait ScheduleSource {
    /// Fetch every row of one schedule page, in page order
    fn fetch_schedule(&self, schedule_id: &ScheduleId) -> Result<Vec<RawScheduleRow>>;

    /// Fetch several schedules; failed schedules are logged and skipped
    fn fetch_all(&self, schedule_ids: &[ScheduleId]) -> Vec<Vec<RawScheduleRow>> {
        let mut batches = Vec::new();
        for id in schedule_ids {
            match self.fetch_schedule(id) {
                Ok(rows) => {
                    log::info!("Schedule {}: {} rows", id, rows.len());
                    batches.push(rows);
                }
                Err(e) => log::warn!("Failed to fetch schedule {}: {}", id, e),
            }
        }
        batches
    }
}

/// Retry an operation with exponential backoff
pub fn with_retry<T, F>(mut operation: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if attempt + 1 >= max_attempts => return Err(e),
            Err(e) => {
                log::warn!("Attempt {} failed: {}", attempt + 1, e);
                let delay = std::time::Duration::from_millis(100 * 2u64.pow(attempt));
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

pub(crate) fn scraper_error(message: impl Into<String>) -> HockeyError {
    HockeyError::Scraper {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_retry_succeeds_after_failures() {
        let calls = Cell::new(0);
        let result = with_retry(
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 2 {
                    Err(scraper_error("flaky"))
                } else {
                    Ok(42)
                }
            },
            3,
        );
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_retry_gives_up() {
        let calls = Cell::new(0);
        let result: Result<()> = with_retry(
            || {
                calls.set(calls.get() + 1);
                Err(scraper_error("down"))
            },
            2,
        );
        assert!(result.is_err());
        assert_eq!(calls.get(), 2);
    }

    struct FixedSource;

    impl ScheduleSource for FixedSource {
        fn fetch_schedule(&self, schedule_id: &ScheduleId) -> Result<Vec<RawScheduleRow>> {
            if schedule_id.as_str() == "bad" {
                return Err(scraper_error("missing"));
            }
            Ok(vec![RawScheduleRow::new(
                schedule_id,
                0,
                "2023-01-05",
                "A - B",
                "1-0",
                "",
            )])
        }
    }

    #[test]
    fn test_fetch_all_skips_failures() {
        let ids = [ScheduleId::new("1"), ScheduleId::new("bad"), ScheduleId::new("2")];
        let batches = FixedSource.fetch_all(&ids);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1][0].schedule_id.as_str(), "2");
    }
}
