//! Property-based tests for the forecasting core.
//!
//! These use proptest to check the forecast band, margin growth, determinism
//! and reorder invariants across generated demand histories.

use chrono::{Duration, NaiveDate};
use ndarray::{Array1, Array2};
use proptest::prelude::*;

use pharmacy_forecast::config::ForecastConfig;
use pharmacy_forecast::models::{DemandObservation, ForecastMethod, HolidayCalendar, ReorderStatus};
use pharmacy_forecast::services::forecast_generator::{forecast_item, ItemInput};
use pharmacy_forecast::services::linear_model;
use pharmacy_forecast::services::reorder_policy::recommend;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn config(strategy: ForecastMethod) -> ForecastConfig {
    ForecastConfig {
        strategy,
        horizon_days: 30,
        holdout_days: 0,
        parallel: false,
        ..ForecastConfig::default()
    }
}

// Strategies for generating test data
fn demand_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0u32..60, 1..120)
        .prop_filter("needs some demand", |v| v.iter().any(|&q| q > 0))
        .prop_map(|v| v.into_iter().map(f64::from).collect())
}

fn method_strategy() -> impl Strategy<Value = ForecastMethod> {
    prop_oneof![
        Just(ForecastMethod::LinearRegression),
        Just(ForecastMethod::SeasonalBaseline),
        Just(ForecastMethod::Autoregressive),
    ]
}

fn input(quantities: &[f64]) -> ItemInput {
    let observations = quantities
        .iter()
        .enumerate()
        .map(|(i, &q)| DemandObservation::new(start() + Duration::days(i as i64), q))
        .collect();
    ItemInput::new("SKU-1", observations)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn forecast_band_is_ordered_and_non_negative(
        quantities in demand_strategy(),
        method in method_strategy(),
    ) {
        let forecast = forecast_item(&input(&quantities), &HolidayCalendar::new(), &config(method))
            .expect("series with demand is forecast");

        prop_assert_eq!(forecast.points.len(), 30);
        for p in &forecast.points {
            prop_assert!(p.lower_bound >= 0.0);
            prop_assert!(p.lower_bound <= p.point_estimate, "{:?}", p);
            prop_assert!(p.point_estimate <= p.upper_bound, "{:?}", p);
        }
    }

    #[test]
    fn margin_never_shrinks(quantities in demand_strategy(), method in method_strategy()) {
        let forecast = forecast_item(&input(&quantities), &HolidayCalendar::new(), &config(method))
            .expect("series with demand is forecast");

        let margins: Vec<f64> = forecast.points.iter().map(|p| p.margin()).collect();
        for pair in margins.windows(2) {
            prop_assert!(pair[1] >= pair[0] - 1e-9, "margins {:?}", pair);
        }
    }

    #[test]
    fn identical_history_gives_identical_forecast(
        quantities in demand_strategy(),
        method in method_strategy(),
    ) {
        let cfg = config(method);
        let first = forecast_item(&input(&quantities), &HolidayCalendar::new(), &cfg);
        let second = forecast_item(&input(&quantities), &HolidayCalendar::new(), &cfg);
        prop_assert_eq!(first, second);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn reorder_target_respects_floor_and_status(
        demand in 0.0f64..500.0,
        stock in 0.0f64..5_000.0,
        min_threshold in 0.0f64..200.0,
        coverage in 1.0f64..30.0,
    ) {
        let rec = recommend("SKU-1", demand, stock, min_threshold, coverage);

        prop_assert!(rec.target_stock >= min_threshold);
        prop_assert_eq!(rec.status == ReorderStatus::ReorderNeeded, stock < rec.target_stock);
        if rec.needs_reorder() {
            prop_assert!(rec.reorder_quantity as f64 >= rec.target_stock - stock);
            prop_assert!((rec.reorder_quantity as f64) < rec.target_stock - stock + 1.0);
        } else {
            prop_assert_eq!(rec.reorder_quantity, 0);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn full_rank_fit_reproduces_targets(
        n in 4usize..40,
        w in prop::array::uniform3(-10.0f64..10.0),
    ) {
        // Columns 1, t and sin(t) are linearly independent for n >= 3
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => 1.0,
            1 => i as f64,
            _ => (i as f64).sin(),
        });
        let y: Array1<f64> = x.dot(&Array1::from(w.to_vec()));

        let weights = linear_model::fit(&x, &y).expect("full-rank fit");
        let fitted = linear_model::predict(&x, &weights).expect("matching columns");
        for (f, t) in fitted.iter().zip(y.iter()) {
            prop_assert!((f - t).abs() < 1e-6, "fitted {} vs {}", f, t);
        }
    }
}
