//! Ordered-sequence helpers
//!
//! Every temporal feature is built from the same few pure operations over a
//! partition that is already in game order: shift by k with a fill value,
//! running sums, and trailing-window means.

use crate::{HockeyError, Result, RollingPolicy};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Shift values forward by `k` positions, filling the first `k` with `fill`.
///
/// Position `i` of the result holds `values[i - k]`, i.e. the value from `k`
/// games earlier.
pub fn shift<T: Clone>(values: &[T], k: usize, fill: T) -> Vec<T> {
    (0..values.len())
        .map(|i| {
            if i >= k {
                values[i - k].clone()
            } else {
                fill.clone()
            }
        })
        .collect()
}

/// Running sum, including the current position; saturates at `u32::MAX`
pub fn cumulative_sum(values: &[u32]) -> Vec<u32> {
    values
        .iter()
        .scan(0u32, |total, &v| {
            *total = total.saturating_add(v);
            Some(*total)
        })
        .collect()
}

/// Running sum of everything strictly before each position
pub fn pre_game_sum(values: &[u32]) -> Vec<u32> {
    shift(&cumulative_sum(values), 1, 0)
}

/// `total / games`, or missing when there are no games to divide by
pub fn average(total: u32, games: usize) -> Option<f64> {
    if games == 0 {
        None
    } else {
        Some(total as f64 / games as f64)
    }
}

/// Trailing mean over the last `window` positions, including the current one.
///
/// Missing observations are skipped; a position needs at least
/// `min_periods` present observations in its window, otherwise it is missing.
pub fn rolling_mean(values: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let present: Vec<f64> = values[start..=i].iter().flatten().copied().collect();
            if present.is_empty() || present.len() < min_periods {
                None
            } else {
                Some(present.iter().sum::<f64>() / present.len() as f64)
            }
        })
        .collect()
}

/// Trailing mean of the `window` games strictly before each position.
///
/// The rolling mean is computed over games up to and including each
/// position and then shifted back by one, so game N sees games
/// `[N - window, N - 1]`. `policy` decides what games with too little
/// history get.
pub fn pre_game_rolling_mean(
    values: &[Option<f64>],
    window: usize,
    policy: RollingPolicy,
) -> Vec<Option<f64>> {
    let min_periods = match policy {
        RollingPolicy::Partial => 1,
        RollingPolicy::FillZero | RollingPolicy::Strict => window,
    };
    let shifted = shift(&rolling_mean(values, window, min_periods), 1, None);

    match policy {
        RollingPolicy::Strict => shifted,
        RollingPolicy::Partial | RollingPolicy::FillZero => {
            shifted.into_iter().map(|v| Some(v.unwrap_or(0.0))).collect()
        }
    }
}

/// Value from exactly `k` positions earlier, missing when there is none
pub fn lag<T: Copy>(values: &[Option<T>], k: usize) -> Vec<Option<T>> {
    shift(values, k, None)
}

/// Group record indices by key, each group ordered by `(date, seq)`.
///
/// The sort is stable, so equal `(date, seq)` pairs keep input order. The
/// result is checked for date order before it is handed to any window.
pub fn partition<K, F>(
    len: usize,
    key: impl Fn(usize) -> K,
    order: F,
) -> Result<BTreeMap<K, Vec<usize>>>
where
    K: Ord + std::fmt::Debug,
    F: Fn(usize) -> (NaiveDate, usize),
{
    let mut groups: BTreeMap<K, Vec<usize>> = BTreeMap::new();
    for i in 0..len {
        groups.entry(key(i)).or_default().push(i);
    }

    for (k, indices) in groups.iter_mut() {
        indices.sort_by_key(|&i| order(i));
        ensure_date_order(indices.iter().map(|&i| order(i).0), || format!("{:?}", k))?;
    }

    Ok(groups)
}

/// Verify that dates never go backwards
pub fn ensure_date_order(
    dates: impl Iterator<Item = NaiveDate>,
    partition: impl Fn() -> String,
) -> Result<()> {
    let mut previous: Option<NaiveDate> = None;
    for (position, date) in dates.enumerate() {
        if previous.map_or(false, |p| date < p) {
            return Err(HockeyError::PartitionOrdering {
                partition: partition(),
                position,
            });
        }
        previous = Some(date);
    }
    Ok(())
}
