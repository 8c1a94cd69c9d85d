use tracing::debug;

use crate::config::ForecastConfig;
use crate::models::{DemandSeries, ForecastAccuracy, ForecastMethod, HolidayCalendar};
use crate::services::demand_model::DemandModel;
use crate::services::forecast_generator::project;

/// Fit `method` on everything but the last `config.holdout_days` days and score
/// its projection of those days. Returns `None` when the series is too short
/// for the hold-out or the model cannot be fit on the shortened history.
pub fn evaluate_holdout(
    series: &DemandSeries,
    method: ForecastMethod,
    calendar: &HolidayCalendar,
    config: &ForecastConfig,
) -> Option<ForecastAccuracy> {
    let holdout = config.holdout_days;
    if holdout == 0 || series.len() <= holdout {
        return None;
    }

    let train = series.prefix(series.len() - holdout);
    if train.is_degenerate() {
        return None;
    }

    let model = match DemandModel::fit(method, &train, calendar, config) {
        Ok(model) => model,
        Err(e) => {
            debug!("Skipping hold-out evaluation for {}: {}", series.item_id, e);
            return None;
        }
    };
    let points = project(&model, train.end()?, holdout, calendar, config).ok()?;
    let predicted: Vec<f64> = points.iter().map(|p| p.point_estimate).collect();

    accuracy(&series.quantities[train.len()..], &predicted)
}

/// Mean absolute and root-mean-square error over paired values
pub fn accuracy(actual: &[f64], predicted: &[f64]) -> Option<ForecastAccuracy> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return None;
    }

    let n = actual.len() as f64;
    let (abs_sum, sq_sum) = actual
        .iter()
        .zip(predicted)
        .fold((0.0, 0.0), |(abs_sum, sq_sum), (a, p)| {
            let err = a - p;
            (abs_sum + err.abs(), sq_sum + err * err)
        });

    Some(ForecastAccuracy {
        holdout_days: actual.len(),
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
    })
}
