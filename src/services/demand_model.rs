//! Interchangeable demand strategies behind one fit/predict capability.
//!
//! Each variant of [`DemandModel`] is an immutable fitted model. `predict`
//! returns the per-day demand level before the seasonal profile is applied;
//! the forecast generator combines level, profile and volatility into points.

use chrono::NaiveDate;
use ndarray::{Array1, Array2};

use crate::config::ForecastConfig;
use crate::errors::AppError;
use crate::models::{DemandSeries, ForecastMethod, HolidayCalendar, SeasonalEstimate};
use crate::services::feature_builder::{self, day_of_week, FEATURE_COUNT};
use crate::services::linear_model::{self, ModelWeights};
use crate::services::seasonal_estimator::{self, recent_window, volatility_with_fallback};

/// Day-of-week multipliers and trend growth applied on top of a model's level
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalProfile {
    dow_multipliers: [f64; 7],
    trend_growth_rate: f64,
}

impl SeasonalProfile {
    /// Multipliers of 1.0 and no extra growth
    pub fn neutral() -> Self {
        Self {
            dow_multipliers: [1.0; 7],
            trend_growth_rate: 0.0,
        }
    }

    pub fn from_estimate(estimate: &SeasonalEstimate, trend_growth_rate: f64) -> Self {
        let mut dow_multipliers = [1.0; 7];
        for (dow, slot) in dow_multipliers.iter_mut().enumerate() {
            *slot = estimate.multiplier(dow as u32);
        }
        Self {
            dow_multipliers,
            trend_growth_rate,
        }
    }

    pub fn dow_multiplier(&self, date: NaiveDate) -> f64 {
        self.dow_multipliers[day_of_week(date) as usize]
    }

    /// `1 + rate * day_index`, with `day_index` 0 for the first forecast day
    pub fn trend_factor(&self, day_index: usize) -> f64 {
        1.0 + self.trend_growth_rate * day_index as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionModel {
    start: NaiveDate,
    weights: ModelWeights,
    volatility: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaselineModel {
    estimate: SeasonalEstimate,
    trend_growth_rate: f64,
}

/// ARIMA(p,1,0) fit by conditional least squares
#[derive(Debug, Clone, PartialEq)]
pub struct AutoregressiveModel {
    lags: usize,
    weights: ModelWeights,
    last_date: NaiveDate,
    last_level: f64,
    /// Most recent `lags` first differences, oldest first
    recent_diffs: Vec<f64>,
    volatility: f64,
    estimate: SeasonalEstimate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DemandModel {
    Regression(RegressionModel),
    Baseline(BaselineModel),
    Autoregressive(AutoregressiveModel),
}

impl DemandModel {
    pub fn fit(
        method: ForecastMethod,
        series: &DemandSeries,
        calendar: &HolidayCalendar,
        config: &ForecastConfig,
    ) -> Result<Self, AppError> {
        if series.is_empty() {
            return Err(AppError::DegenerateSeries(format!(
                "{}: no demand history",
                series.item_id
            )));
        }

        match method {
            ForecastMethod::LinearRegression => fit_regression(series, calendar).map(Self::Regression),
            ForecastMethod::SeasonalBaseline => Ok(Self::Baseline(BaselineModel {
                estimate: seasonal_estimator::estimate(series),
                trend_growth_rate: config.trend_growth_rate,
            })),
            ForecastMethod::Autoregressive => {
                fit_autoregressive(series, config.ar_lags).map(Self::Autoregressive)
            }
        }
    }

    pub fn method(&self) -> ForecastMethod {
        match self {
            DemandModel::Regression(_) => ForecastMethod::LinearRegression,
            DemandModel::Baseline(_) => ForecastMethod::SeasonalBaseline,
            DemandModel::Autoregressive(_) => ForecastMethod::Autoregressive,
        }
    }

    /// Demand level for each date, unclamped. Dates must be non-decreasing;
    /// the autoregressive variant only forecasts dates after its history.
    pub fn predict(
        &self,
        dates: &[NaiveDate],
        calendar: &HolidayCalendar,
    ) -> Result<Vec<f64>, AppError> {
        match self {
            DemandModel::Regression(model) => {
                let x = feature_builder::build_features(dates, model.start, calendar)?;
                Ok(linear_model::predict(&x, &model.weights)?.to_vec())
            }
            DemandModel::Baseline(model) => Ok(vec![model.estimate.baseline; dates.len()]),
            DemandModel::Autoregressive(model) => model.predict(dates),
        }
    }

    pub fn volatility(&self) -> f64 {
        match self {
            DemandModel::Regression(model) => model.volatility,
            DemandModel::Baseline(model) => model.estimate.volatility,
            DemandModel::Autoregressive(model) => model.volatility,
        }
    }

    /// Regression weights already carry day-of-week and trend effects, so its
    /// profile is neutral. The autoregressive model carries drift itself.
    pub fn profile(&self) -> SeasonalProfile {
        match self {
            DemandModel::Regression(_) => SeasonalProfile::neutral(),
            DemandModel::Baseline(model) => {
                SeasonalProfile::from_estimate(&model.estimate, model.trend_growth_rate)
            }
            DemandModel::Autoregressive(model) => SeasonalProfile::from_estimate(&model.estimate, 0.0),
        }
    }
}

fn fit_regression(
    series: &DemandSeries,
    calendar: &HolidayCalendar,
) -> Result<RegressionModel, AppError> {
    if series.len() < FEATURE_COUNT {
        return Err(AppError::InsufficientData {
            required: FEATURE_COUNT,
            actual: series.len(),
        });
    }

    let x = feature_builder::build_features(&series.dates(), series.start, calendar)?;
    let y = Array1::from(series.quantities.clone());
    let weights = linear_model::fit(&x, &y)?;
    let residuals = linear_model::residuals(&x, &y, &weights)?.to_vec();

    Ok(RegressionModel {
        start: series.start,
        weights,
        volatility: volatility_with_fallback(recent_window(&residuals), series.mean()),
    })
}

fn fit_autoregressive(series: &DemandSeries, lags: usize) -> Result<AutoregressiveModel, AppError> {
    let levels = &series.quantities;
    let required = 2 * lags + 2;
    if levels.len() < required {
        return Err(AppError::InsufficientData {
            required,
            actual: levels.len(),
        });
    }

    let diffs: Vec<f64> = levels.windows(2).map(|w| w[1] - w[0]).collect();
    let rows = diffs.len() - lags;

    // [1, d(t-1), ..., d(t-p)] -> d(t)
    let x = Array2::from_shape_fn((rows, lags + 1), |(i, j)| {
        let t = i + lags;
        if j == 0 {
            1.0
        } else {
            diffs[t - j]
        }
    });
    let y = Array1::from_iter((lags..diffs.len()).map(|t| diffs[t]));

    let weights = linear_model::fit(&x, &y)?;
    let residuals = linear_model::residuals(&x, &y, &weights)?.to_vec();

    let last_date = series.end().ok_or_else(|| {
        AppError::DegenerateSeries(format!("{}: no demand history", series.item_id))
    })?;

    Ok(AutoregressiveModel {
        lags,
        weights,
        last_date,
        last_level: levels[levels.len() - 1],
        recent_diffs: diffs[diffs.len() - lags..].to_vec(),
        volatility: volatility_with_fallback(recent_window(&residuals), series.mean()),
        estimate: seasonal_estimator::estimate(series),
    })
}

impl AutoregressiveModel {
    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<f64>, AppError> {
        let mut steps = Vec::with_capacity(dates.len());
        for &date in dates {
            let step = (date - self.last_date).num_days();
            if step < 1 {
                return Err(AppError::Validation(format!(
                    "Autoregressive model can only forecast after {}, got {}",
                    self.last_date, date
                )));
            }
            steps.push(step as usize);
        }

        let horizon = steps.iter().copied().max().unwrap_or(0);
        let path = self.forecast_path(horizon);
        Ok(steps.into_iter().map(|s| path[s - 1]).collect())
    }

    /// Levels for the next `horizon` days, feeding each predicted difference
    /// back in as a lag
    fn forecast_path(&self, horizon: usize) -> Vec<f64> {
        let weights = self.weights.as_array();
        let mut diffs = self.recent_diffs.clone();
        let mut level = self.last_level;
        let mut path = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let n = diffs.len();
            let next_diff = weights[0]
                + (1..=self.lags)
                    .map(|j| weights[j] * diffs[n - j])
                    .sum::<f64>();
            level += next_diff;
            diffs.push(next_diff);
            path.push(level);
        }

        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn config() -> ForecastConfig {
        ForecastConfig::default()
    }

    #[test]
    fn test_regression_needs_one_row_per_feature() {
        let series = DemandSeries::new("Dolo 650", start(), vec![10.0, 12.0]);
        let err = DemandModel::fit(
            ForecastMethod::LinearRegression,
            &series,
            &HolidayCalendar::new(),
            &config(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InsufficientData { required: 10, actual: 2 }));
    }

    #[test]
    fn test_regression_recovers_weekly_pattern() {
        let quantities: Vec<f64> = (0..56)
            .map(|i| if i % 7 == 5 { 30.0 } else { 10.0 })
            .collect();
        let series = DemandSeries::new("Augmentin", start(), quantities);
        let model = DemandModel::fit(
            ForecastMethod::LinearRegression,
            &series,
            &HolidayCalendar::new(),
            &config(),
        )
        .unwrap();

        let saturday = start() + Duration::days(61);
        let sunday = start() + Duration::days(62);
        let levels = model.predict(&[saturday, sunday], &HolidayCalendar::new()).unwrap();
        assert!((levels[0] - 30.0).abs() < 1e-6);
        assert!((levels[1] - 10.0).abs() < 1e-6);
        assert_eq!(model.profile(), SeasonalProfile::neutral());
    }

    #[test]
    fn test_regression_volatility_falls_back_on_perfect_fit() {
        let series = DemandSeries::new("Dolo 650", start(), vec![10.0; 40]);
        let model = DemandModel::fit(
            ForecastMethod::LinearRegression,
            &series,
            &HolidayCalendar::new(),
            &config(),
        )
        .unwrap();
        assert!((model.volatility() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_baseline_profile_uses_configured_growth() {
        let series = DemandSeries::new("Pan 40", start(), vec![5.0; 14]);
        let model = DemandModel::fit(
            ForecastMethod::SeasonalBaseline,
            &series,
            &HolidayCalendar::new(),
            &config(),
        )
        .unwrap();

        let profile = model.profile();
        assert!((profile.trend_factor(0) - 1.0).abs() < 1e-12);
        assert!((profile.trend_factor(10) - 1.01).abs() < 1e-12);
        assert_eq!(model.predict(&[start()], &HolidayCalendar::new()).unwrap(), vec![5.0]);
    }

    #[test]
    fn test_autoregressive_extrapolates_linear_growth() {
        // Constant first difference of 2 is reproduced exactly by the intercept
        let quantities: Vec<f64> = (0..30).map(|i| 10.0 + 2.0 * i as f64).collect();
        let series = DemandSeries::new("Azithral", start(), quantities);
        let model = DemandModel::fit(
            ForecastMethod::Autoregressive,
            &series,
            &HolidayCalendar::new(),
            &config(),
        )
        .unwrap();

        let last = series.end().unwrap();
        let dates = feature_builder::future_dates(last, 3);
        let levels = model.predict(&dates, &HolidayCalendar::new()).unwrap();
        assert!((levels[0] - 70.0).abs() < 1e-6);
        assert!((levels[2] - 74.0).abs() < 1e-6);
    }

    #[test]
    fn test_autoregressive_short_history_is_insufficient() {
        let series = DemandSeries::new("Azithral", start(), vec![1.0; 8]);
        let err = DemandModel::fit(
            ForecastMethod::Autoregressive,
            &series,
            &HolidayCalendar::new(),
            &config(),
        )
        .unwrap_err();
        assert!(err.is_recoverable_by_fallback());
    }

    #[test]
    fn test_autoregressive_rejects_dates_inside_history() {
        let quantities: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let series = DemandSeries::new("Azithral", start(), quantities);
        let model = DemandModel::fit(
            ForecastMethod::Autoregressive,
            &series,
            &HolidayCalendar::new(),
            &config(),
        )
        .unwrap();
        assert!(model.predict(&[start()], &HolidayCalendar::new()).is_err());
    }
}
