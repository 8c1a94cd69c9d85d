use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::services::feature_builder;

/// One observed consumption record for an item, as delivered by a demand source.
/// Several observations may share a date; they are summed into one daily bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandObservation {
    pub date: NaiveDate,
    pub quantity: f64,
}

impl DemandObservation {
    pub fn new(date: NaiveDate, quantity: f64) -> Self {
        Self { date, quantity }
    }
}

/// Contiguous daily demand for one catalog item. Day `i` is `start + i`;
/// days without observations hold 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandSeries {
    pub item_id: String,
    pub start: NaiveDate,
    pub quantities: Vec<f64>,
}

impl DemandSeries {
    pub fn new(item_id: impl Into<String>, start: NaiveDate, quantities: Vec<f64>) -> Self {
        Self {
            item_id: item_id.into(),
            start,
            quantities,
        }
    }

    /// Validate raw observations and fill them into daily buckets
    pub fn from_observations(
        item_id: &str,
        observations: &[DemandObservation],
    ) -> Result<Self, AppError> {
        feature_builder::assemble_series(item_id, observations)
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// Empty, or no demand on any day
    pub fn is_degenerate(&self) -> bool {
        self.quantities.iter().all(|&q| q == 0.0)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        (0..self.quantities.len())
            .map(|i| self.start + Duration::days(i as i64))
            .collect()
    }

    pub fn end(&self) -> Option<NaiveDate> {
        if self.quantities.is_empty() {
            None
        } else {
            Some(self.start + Duration::days(self.quantities.len() as i64 - 1))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.quantities
            .iter()
            .enumerate()
            .map(move |(i, &q)| (self.start + Duration::days(i as i64), q))
    }

    pub fn mean(&self) -> f64 {
        if self.quantities.is_empty() {
            0.0
        } else {
            self.quantities.iter().sum::<f64>() / self.quantities.len() as f64
        }
    }

    /// First `len` days as a new series (used for hold-out back-testing)
    pub fn prefix(&self, len: usize) -> DemandSeries {
        DemandSeries {
            item_id: self.item_id.clone(),
            start: self.start,
            quantities: self.quantities[..len.min(self.quantities.len())].to_vec(),
        }
    }
}

/// Known holiday dates. Dates not in the set (including all unknown future
/// dates) are treated as regular days.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HolidayCalendar {
    dates: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate) {
        self.dates.insert(date);
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

impl FromIterator<NaiveDate> for HolidayCalendar {
    fn from_iter<T: IntoIterator<Item = NaiveDate>>(iter: T) -> Self {
        Self {
            dates: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_from_observations_fills_daily_buckets() {
        let observations = vec![
            DemandObservation::new(day(1), 4.0),
            DemandObservation::new(day(1), 2.0),
            DemandObservation::new(day(4), 5.0),
        ];

        let series = DemandSeries::from_observations("Dolo 650", &observations).unwrap();

        assert_eq!(series.start, day(1));
        assert_eq!(series.quantities, vec![6.0, 0.0, 0.0, 5.0]);
        assert_eq!(series.end(), Some(day(4)));
    }

    #[test]
    fn test_from_observations_rejects_negative_quantity() {
        let observations = vec![DemandObservation::new(day(1), -1.0)];
        assert!(matches!(
            DemandSeries::from_observations("Dolo 650", &observations),
            Err(AppError::Validation(_))
        ));
    }
}
