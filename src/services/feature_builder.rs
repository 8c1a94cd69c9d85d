//! Feature construction for the linear demand model.
//!
//! Every row has the fixed column layout
//! `[bias, trend, holiday, dow_0 (Mon), ..., dow_6 (Sun)]`, so weights fitted on
//! history line up with rows built for future dates. Days of week are calendar
//! days numbered from Monday = 0.
//!
//! This module is also the validation boundary for raw demand observations:
//! non-monotonic dates and negative or non-finite quantities are rejected here.

use chrono::{Datelike, Duration, NaiveDate};
use ndarray::Array2;

use crate::errors::AppError;
use crate::models::{DemandObservation, DemandSeries, HolidayCalendar};

pub const FEATURE_COUNT: usize = 10;
pub const COL_BIAS: usize = 0;
pub const COL_TREND: usize = 1;
pub const COL_HOLIDAY: usize = 2;
pub const COL_DOW_START: usize = 3;

/// One design-matrix row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow([f64; FEATURE_COUNT]);

impl FeatureRow {
    pub fn new(date: NaiveDate, start: NaiveDate, is_holiday: bool) -> Self {
        let mut values = [0.0; FEATURE_COUNT];
        values[COL_BIAS] = 1.0;
        values[COL_TREND] = (date - start).num_days() as f64;
        values[COL_HOLIDAY] = if is_holiday { 1.0 } else { 0.0 };
        values[COL_DOW_START + day_of_week(date) as usize] = 1.0;
        Self(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn trend(&self) -> f64 {
        self.0[COL_TREND]
    }

    pub fn is_holiday(&self) -> bool {
        self.0[COL_HOLIDAY] == 1.0
    }

    pub fn day_of_week(&self) -> Option<u32> {
        self.0[COL_DOW_START..]
            .iter()
            .position(|&v| v == 1.0)
            .map(|i| i as u32)
    }
}

/// Monday = 0 ... Sunday = 6
pub fn day_of_week(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

/// Build one row per date. `dates` must be non-decreasing so the trend column is.
pub fn build_feature_rows(
    dates: &[NaiveDate],
    start: NaiveDate,
    calendar: &HolidayCalendar,
) -> Result<Vec<FeatureRow>, AppError> {
    if let Some(pair) = dates.windows(2).find(|w| w[1] < w[0]) {
        return Err(AppError::Validation(format!(
            "Feature dates must be non-decreasing: {} follows {}",
            pair[1], pair[0]
        )));
    }

    Ok(dates
        .iter()
        .map(|&date| FeatureRow::new(date, start, calendar.is_holiday(date)))
        .collect())
}

pub fn design_matrix(rows: &[FeatureRow]) -> Array2<f64> {
    Array2::from_shape_fn((rows.len(), FEATURE_COUNT), |(i, j)| rows[i].0[j])
}

/// Rows for `dates` as an `n x FEATURE_COUNT` matrix
pub fn build_features(
    dates: &[NaiveDate],
    start: NaiveDate,
    calendar: &HolidayCalendar,
) -> Result<Array2<f64>, AppError> {
    let rows = build_feature_rows(dates, start, calendar)?;
    Ok(design_matrix(&rows))
}

/// Reject observations that indicate an upstream data-integrity problem.
pub fn validate_observations(
    item_id: &str,
    observations: &[DemandObservation],
) -> Result<(), AppError> {
    for (idx, obs) in observations.iter().enumerate() {
        if !obs.quantity.is_finite() {
            return Err(AppError::Validation(format!(
                "{}: non-finite quantity on {}",
                item_id, obs.date
            )));
        }
        if obs.quantity < 0.0 {
            return Err(AppError::Validation(format!(
                "{}: negative quantity {} on {}",
                item_id, obs.quantity, obs.date
            )));
        }
        if idx > 0 && obs.date < observations[idx - 1].date {
            return Err(AppError::Validation(format!(
                "{}: dates are not monotonic ({} follows {})",
                item_id,
                obs.date,
                observations[idx - 1].date
            )));
        }
    }
    Ok(())
}

/// Validate raw observations and turn them into a contiguous daily series.
/// Same-day observations are summed; missing days are filled with 0.
pub fn assemble_series(
    item_id: &str,
    observations: &[DemandObservation],
) -> Result<DemandSeries, AppError> {
    validate_observations(item_id, observations)?;

    let (first, last) = match (observations.first(), observations.last()) {
        (Some(first), Some(last)) => (first.date, last.date),
        _ => {
            return Err(AppError::DegenerateSeries(format!(
                "{}: no demand history",
                item_id
            )))
        }
    };

    let days = (last - first).num_days() as usize + 1;
    let mut quantities = vec![0.0; days];
    for obs in observations {
        quantities[(obs.date - first).num_days() as usize] += obs.quantity;
    }

    Ok(DemandSeries::new(item_id, first, quantities))
}

/// The `count` consecutive dates following `last`
pub fn future_dates(last: NaiveDate, count: usize) -> Vec<NaiveDate> {
    (1..=count as i64).map(|i| last + Duration::days(i)).collect()
}
