//! Baseline level, day-of-week multipliers and volatility for one item.
//!
//! This is the fallback when a fitted strategy cannot be used, and a complete
//! strategy on its own for short histories.

use std::collections::BTreeMap;

use crate::models::{DemandSeries, SeasonalEstimate};
use crate::services::feature_builder::day_of_week;

pub const RECENT_WINDOW_DAYS: usize = 30;
pub const RECENT_WEIGHT: f64 = 0.7;
/// Share of the overall mean used as volatility when the recent window is flat
pub const FALLBACK_VOLATILITY_RATIO: f64 = 0.2;
/// Spreads at or below this are rounding noise from an exact fit
const MIN_VOLATILITY: f64 = 1e-9;

pub fn estimate(series: &DemandSeries) -> SeasonalEstimate {
    let values = &series.quantities;
    let overall_mean = series.mean();
    let recent = recent_window(values);

    let baseline = RECENT_WEIGHT * mean(recent) + (1.0 - RECENT_WEIGHT) * overall_mean;

    SeasonalEstimate {
        baseline,
        dow_multipliers: dow_multipliers(series, overall_mean),
        volatility: volatility_with_fallback(recent, overall_mean),
    }
}

/// Last `RECENT_WINDOW_DAYS` values (or all of them for shorter slices)
pub fn recent_window(values: &[f64]) -> &[f64] {
    &values[values.len().saturating_sub(RECENT_WINDOW_DAYS)..]
}

/// Mean demand per day of week divided by the overall mean. Unobserved days,
/// and every day when the overall mean is zero, get 1.0.
fn dow_multipliers(series: &DemandSeries, overall_mean: f64) -> BTreeMap<u32, f64> {
    let mut sums = [0.0_f64; 7];
    let mut counts = [0_usize; 7];

    for (date, quantity) in series.iter() {
        let dow = day_of_week(date) as usize;
        sums[dow] += quantity;
        counts[dow] += 1;
    }

    (0..7u32)
        .map(|dow| {
            let d = dow as usize;
            let multiplier = if overall_mean > 0.0 && counts[d] > 0 {
                (sums[d] / counts[d] as f64) / overall_mean
            } else {
                1.0
            };
            (dow, multiplier)
        })
        .collect()
}

/// Sample standard deviation of `window`; falls back to a share of
/// `overall_mean` when it is zero or undefined (fewer than 2 values).
pub fn volatility_with_fallback(window: &[f64], overall_mean: f64) -> f64 {
    match sample_std(window) {
        Some(std) if std > MIN_VOLATILITY && std.is_finite() => std,
        _ => overall_mean.abs() * FALLBACK_VOLATILITY_RATIO,
    }
}

/// Standard deviation with n-1 denominator, `None` below 2 values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    Some(variance.sqrt())
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
