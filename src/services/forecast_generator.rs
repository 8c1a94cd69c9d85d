use chrono::{NaiveDate, Utc};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::ForecastConfig;
use crate::errors::AppError;
use crate::models::{
    DemandObservation, DemandSeries, ForecastBatch, ForecastMethod, ForecastPoint,
    HolidayCalendar, ItemForecast, SkipReason, SkippedItem,
};
use crate::services::backtest;
use crate::services::demand_model::DemandModel;
use crate::services::feature_builder::future_dates;

/// Raw history for one catalog item as handed over by a demand source
#[derive(Debug, Clone)]
pub struct ItemInput {
    pub item_id: String,
    pub observations: Vec<DemandObservation>,
}

impl ItemInput {
    pub fn new(item_id: impl Into<String>, observations: Vec<DemandObservation>) -> Self {
        Self {
            item_id: item_id.into(),
            observations,
        }
    }
}

/// Linear widening of the band: `1 + rate * day_index`
pub fn uncertainty_growth(day_index: usize, rate: f64) -> f64 {
    1.0 + rate * day_index as f64
}

/// Project `horizon` days after `last_date`.
///
/// Point estimates are clamped at zero before the band is built around them,
/// so `0 <= lower <= point <= upper` holds for every point.
pub fn project(
    model: &DemandModel,
    last_date: NaiveDate,
    horizon: usize,
    calendar: &HolidayCalendar,
    config: &ForecastConfig,
) -> Result<Vec<ForecastPoint>, AppError> {
    let dates = future_dates(last_date, horizon);
    let levels = model.predict(&dates, calendar)?;
    let profile = model.profile();
    let z = config.z_score();
    let volatility = model.volatility().abs();

    let points = dates
        .into_iter()
        .zip(levels)
        .enumerate()
        .map(|(day_index, (date, level))| {
            let raw = level * profile.dow_multiplier(date) * profile.trend_factor(day_index);
            let point_estimate = if raw.is_finite() { raw.max(0.0) } else { 0.0 };
            let margin =
                z * volatility * uncertainty_growth(day_index, config.uncertainty_growth_rate);

            ForecastPoint {
                date,
                point_estimate,
                lower_bound: (point_estimate - margin).max(0.0),
                upper_bound: point_estimate + margin,
            }
        })
        .collect();

    Ok(points)
}

/// Fit and project with `method`
fn run_strategy(
    method: ForecastMethod,
    series: &DemandSeries,
    calendar: &HolidayCalendar,
    config: &ForecastConfig,
) -> Result<(DemandModel, Vec<ForecastPoint>), AppError> {
    let model = DemandModel::fit(method, series, calendar, config)?;
    let last_date = series
        .end()
        .ok_or_else(|| AppError::DegenerateSeries(format!("{}: no demand history", series.item_id)))?;
    let points = project(&model, last_date, config.horizon_days, calendar, config)?;
    Ok((model, points))
}

/// Forecast one assembled series with the configured strategy, switching the
/// whole run to the seasonal baseline when that strategy cannot be used.
pub fn forecast_series(
    series: &DemandSeries,
    calendar: &HolidayCalendar,
    config: &ForecastConfig,
) -> Result<ItemForecast, AppError> {
    if series.is_degenerate() {
        return Err(AppError::DegenerateSeries(format!(
            "{}: {} days of history with no demand",
            series.item_id,
            series.len()
        )));
    }

    let (model, points, fallback_from, fallback_reason) =
        match run_strategy(config.strategy, series, calendar, config) {
            Ok((model, points)) => (model, points, None, None),
            Err(e) if e.is_recoverable_by_fallback() => {
                warn!(
                    "Falling back to seasonal baseline for {} ({} failed: {})",
                    series.item_id, config.strategy, e
                );
                let (model, points) =
                    run_strategy(ForecastMethod::SeasonalBaseline, series, calendar, config)?;
                (model, points, Some(config.strategy), Some(e.to_string()))
            }
            Err(e) => return Err(e),
        };

    let method = model.method();
    let accuracy = backtest::evaluate_holdout(series, method, calendar, config);

    debug!(
        "Forecast for {}: method={}, volatility={:.3}, horizon={}",
        series.item_id,
        method,
        model.volatility(),
        points.len()
    );

    Ok(ItemForecast {
        item_id: series.item_id.clone(),
        method,
        fallback_from,
        fallback_reason,
        volatility: model.volatility(),
        history: series.clone(),
        points,
        accuracy,
    })
}

/// Full per-item run: validate, assemble, forecast. Anything that stops the
/// item is turned into a skip record instead of an error.
pub fn forecast_item(
    input: &ItemInput,
    calendar: &HolidayCalendar,
    config: &ForecastConfig,
) -> Result<ItemForecast, SkippedItem> {
    let skip = |reason: SkipReason, detail: String| {
        warn!("Skipping {} ({:?}): {}", input.item_id, reason, detail);
        SkippedItem {
            item_id: input.item_id.clone(),
            reason,
            detail,
        }
    };

    if input.observations.is_empty() {
        return Err(skip(SkipReason::EmptyHistory, "no demand history".to_string()));
    }

    let series = DemandSeries::from_observations(&input.item_id, &input.observations)
        .map_err(|e| skip(classify(&e), e.to_string()))?;

    forecast_series(&series, calendar, config).map_err(|e| skip(classify(&e), e.to_string()))
}

fn classify(err: &AppError) -> SkipReason {
    match err {
        AppError::DegenerateSeries(_) => SkipReason::DegenerateSeries,
        AppError::Source(_) => SkipReason::SourceFailure,
        _ => SkipReason::InvalidInput,
    }
}

/// Forecast every item. Items are independent, so with `config.parallel`
/// they run on the rayon pool; output order always follows `inputs`.
pub fn generate_batch(
    inputs: &[ItemInput],
    calendar: &HolidayCalendar,
    config: &ForecastConfig,
) -> ForecastBatch {
    info!(
        "Generating {}-day forecasts for {} items (strategy={}, parallel={})",
        config.horizon_days,
        inputs.len(),
        config.strategy,
        config.parallel
    );

    let results: Vec<Result<ItemForecast, SkippedItem>> = if config.parallel {
        inputs
            .par_iter()
            .map(|input| forecast_item(input, calendar, config))
            .collect()
    } else {
        inputs
            .iter()
            .map(|input| forecast_item(input, calendar, config))
            .collect()
    };

    let mut items = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();
    for result in results {
        match result {
            Ok(forecast) => items.push(forecast),
            Err(skip) => skipped.push(skip),
        }
    }

    let fallbacks = items.iter().filter(|f| f.fallback_from.is_some()).count();
    info!(
        "Forecast batch complete: {} forecast, {} skipped, {} on fallback",
        items.len(),
        skipped.len(),
        fallbacks
    );

    ForecastBatch {
        horizon_days: config.horizon_days,
        confidence_level: config.confidence_level,
        items,
        skipped,
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn observations(quantities: &[f64]) -> Vec<DemandObservation> {
        quantities
            .iter()
            .enumerate()
            .map(|(i, &q)| DemandObservation::new(start() + Duration::days(i as i64), q))
            .collect()
    }

    fn config() -> ForecastConfig {
        ForecastConfig {
            parallel: false,
            ..ForecastConfig::default()
        }
    }

    #[test]
    fn test_uncertainty_growth() {
        assert_eq!(uncertainty_growth(0, 0.05), 1.0);
        assert!((uncertainty_growth(10, 0.05) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_flat_history_forecasts_flat_demand() {
        let input = ItemInput::new("Dolo 650", observations(&[10.0; 40]));
        let forecast = forecast_item(&input, &HolidayCalendar::new(), &config()).unwrap();

        assert_eq!(forecast.method, ForecastMethod::LinearRegression);
        assert!(forecast.fallback_from.is_none());
        assert_eq!(forecast.points.len(), 90);

        let first = &forecast.points[0];
        assert_eq!(first.date, start() + Duration::days(40));
        assert!((first.point_estimate - 10.0).abs() < 1e-6);
        assert!(first.margin() > 0.0);
        assert!(first.lower_bound >= 0.0);
    }

    #[test]
    fn test_short_history_falls_back_to_baseline() {
        let input = ItemInput::new("Azithral", observations(&[4.0, 6.0]));
        let forecast = forecast_item(&input, &HolidayCalendar::new(), &config()).unwrap();

        assert_eq!(forecast.method, ForecastMethod::SeasonalBaseline);
        assert_eq!(forecast.fallback_from, Some(ForecastMethod::LinearRegression));
        assert!(forecast.fallback_reason.unwrap().contains("Insufficient data"));
        assert!(forecast.points.iter().all(|p| p.point_estimate > 0.0));
    }

    #[test]
    fn test_margin_grows_with_horizon() {
        let quantities: Vec<f64> = (0..60).map(|i| 10.0 + (i % 5) as f64).collect();
        let input = ItemInput::new("Pan 40", observations(&quantities));
        let forecast = forecast_item(&input, &HolidayCalendar::new(), &config()).unwrap();

        for pair in forecast.points.windows(2) {
            let m0 = pair[0].upper_bound - pair[0].point_estimate;
            let m1 = pair[1].upper_bound - pair[1].point_estimate;
            assert!(m1 >= m0);
        }
    }

    #[test]
    fn test_falling_trend_is_clamped_at_zero() {
        let quantities: Vec<f64> = (0..30).map(|i| 30.0 - i as f64).collect();
        let input = ItemInput::new("Cough Syrup", observations(&quantities));
        let forecast = forecast_item(&input, &HolidayCalendar::new(), &config()).unwrap();

        let last = forecast.points.last().unwrap();
        assert_eq!(last.point_estimate, 0.0);
        assert_eq!(last.lower_bound, 0.0);
        assert!(forecast
            .points
            .iter()
            .all(|p| p.lower_bound <= p.point_estimate && p.point_estimate <= p.upper_bound));
    }

    #[test]
    fn test_skip_reasons() {
        let calendar = HolidayCalendar::new();
        let empty = forecast_item(&ItemInput::new("A", vec![]), &calendar, &config()).unwrap_err();
        assert_eq!(empty.reason, SkipReason::EmptyHistory);

        let zeros = forecast_item(&ItemInput::new("B", observations(&[0.0; 20])), &calendar, &config())
            .unwrap_err();
        assert_eq!(zeros.reason, SkipReason::DegenerateSeries);

        let negative = forecast_item(&ItemInput::new("C", observations(&[1.0, -2.0])), &calendar, &config())
            .unwrap_err();
        assert_eq!(negative.reason, SkipReason::InvalidInput);
    }

    #[test]
    fn test_batch_keeps_going_past_bad_items() {
        let inputs = vec![
            ItemInput::new("Dolo 650", observations(&[10.0; 40])),
            ItemInput::new("Expired Stock", observations(&[0.0; 40])),
            ItemInput::new("Augmentin", observations(&[3.0; 12])),
        ];
        let batch = generate_batch(&inputs, &HolidayCalendar::new(), &config());

        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.items[0].item_id, "Dolo 650");
        assert_eq!(batch.items[1].item_id, "Augmentin");
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].item_id, "Expired Stock");
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let inputs: Vec<ItemInput> = (0..8)
            .map(|k| {
                let q: Vec<f64> = (0..50).map(|i| (k + 1) as f64 + (i % 7) as f64).collect();
                ItemInput::new(format!("SKU-{}", k), observations(&q))
            })
            .collect();

        let sequential = generate_batch(&inputs, &HolidayCalendar::new(), &config());
        let parallel = generate_batch(
            &inputs,
            &HolidayCalendar::new(),
            &ForecastConfig {
                parallel: true,
                ..config()
            },
        );
        assert_eq!(sequential.items, parallel.items);
    }

    #[test]
    fn test_rows_emit_history_then_forecast() {
        let input = ItemInput::new("Dolo 650", observations(&[10.0; 14]));
        let mut cfg = config();
        cfg.horizon_days = 3;
        let forecast = forecast_item(&input, &HolidayCalendar::new(), &cfg).unwrap();

        let rows = forecast.rows();
        assert_eq!(rows.len(), 17);
        assert!(rows[..14].iter().all(|r| r.lower_bound.is_none()));
        assert!(rows[14..].iter().all(|r| r.upper_bound.is_some()));
        assert!(rows.windows(2).all(|w| w[0].date < w[1].date));
    }
}
