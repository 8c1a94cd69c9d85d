use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::DemandSeries;

/// Demand model strategy used for an item's forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    LinearRegression,
    SeasonalBaseline,
    Autoregressive,
}

impl ForecastMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMethod::LinearRegression => "linear_regression",
            ForecastMethod::SeasonalBaseline => "seasonal_baseline",
            ForecastMethod::Autoregressive => "autoregressive",
        }
    }
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForecastMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear_regression" | "regression" | "ols" => Ok(ForecastMethod::LinearRegression),
            "seasonal_baseline" | "baseline" => Ok(ForecastMethod::SeasonalBaseline),
            "autoregressive" | "arima" => Ok(ForecastMethod::Autoregressive),
            other => Err(AppError::Validation(format!(
                "Unknown forecast strategy: {}. Must be 'linear_regression', 'seasonal_baseline' or 'autoregressive'",
                other
            ))),
        }
    }
}

/// Per-item level, day-of-week profile and volatility from the seasonal estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalEstimate {
    pub baseline: f64,
    /// Monday = 0 ... Sunday = 6
    pub dow_multipliers: BTreeMap<u32, f64>,
    pub volatility: f64,
}

impl SeasonalEstimate {
    pub fn multiplier(&self, dow: u32) -> f64 {
        self.dow_multipliers.get(&dow).copied().unwrap_or(1.0)
    }
}

/// Single point in a demand forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl ForecastPoint {
    /// Half-width of the band above the point estimate
    pub fn margin(&self) -> f64 {
        self.upper_bound - self.point_estimate
    }
}

/// Hold-out accuracy of the strategy that produced a forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    pub holdout_days: usize,
    pub mae: f64,
    pub rmse: f64,
}

/// Complete forecast for one catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemForecast {
    pub item_id: String,
    pub method: ForecastMethod,
    /// Strategy that was configured but could not be fit, if the run fell back
    pub fallback_from: Option<ForecastMethod>,
    pub fallback_reason: Option<String>,
    pub volatility: f64,
    pub history: DemandSeries,
    pub points: Vec<ForecastPoint>,
    pub accuracy: Option<ForecastAccuracy>,
}

impl ItemForecast {
    /// Mean point estimate over the first `window_days` forecast days
    pub fn average_daily_demand(&self, window_days: usize) -> f64 {
        let window = window_days.min(self.points.len());
        if window == 0 {
            return 0.0;
        }
        self.points[..window]
            .iter()
            .map(|p| p.point_estimate)
            .sum::<f64>()
            / window as f64
    }

    /// Total forecast demand for days in `[from, until)`
    pub fn demand_between(&self, from: NaiveDate, until: NaiveDate) -> f64 {
        self.points
            .iter()
            .filter(|p| p.date >= from && p.date < until)
            .map(|p| p.point_estimate)
            .sum()
    }

    pub fn rows(&self) -> Vec<ForecastRow> {
        let history = self.history.iter().map(|(date, quantity)| ForecastRow {
            item_id: self.item_id.clone(),
            date,
            row_type: RowType::History,
            value: quantity,
            lower_bound: None,
            upper_bound: None,
        });
        let forecast = self.points.iter().map(|p| ForecastRow {
            item_id: self.item_id.clone(),
            date: p.date,
            row_type: RowType::Forecast,
            value: p.point_estimate,
            lower_bound: Some(p.lower_bound),
            upper_bound: Some(p.upper_bound),
        });
        history.chain(forecast).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowType {
    History,
    Forecast,
}

/// Tidy output row consumable by a dashboard or API as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub item_id: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub row_type: RowType,
    pub value: f64,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyHistory,
    DegenerateSeries,
    InvalidInput,
    SourceFailure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub item_id: String,
    pub reason: SkipReason,
    pub detail: String,
}

/// Result of one forecast request across the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastBatch {
    pub horizon_days: usize,
    pub confidence_level: f64,
    pub items: Vec<ItemForecast>,
    pub skipped: Vec<SkippedItem>,
    pub generated_at: DateTime<Utc>,
}

impl ForecastBatch {
    pub fn item(&self, item_id: &str) -> Option<&ItemForecast> {
        self.items.iter().find(|f| f.item_id == item_id)
    }

    /// History rows followed by forecast rows, per item, in date order
    pub fn rows(&self) -> Vec<ForecastRow> {
        self.items.iter().flat_map(ItemForecast::rows).collect()
    }
}
