use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate};
use tracing::info;

use crate::config::WasteConfig;
use crate::models::{ForecastBatch, InventoryBatch, WasteAlert, WasteRiskLevel};

/// Group batches expiring within the alert window into one alert per item,
/// soonest expiry first.
///
/// Batches already past their expiry count as expiring today. When a forecast
/// batch is supplied, demand expected before the earliest expiry is netted off
/// the at-risk quantity.
pub fn assess_expiry_risk(
    batches: &[InventoryBatch],
    as_of: NaiveDate,
    config: &WasteConfig,
    forecasts: Option<&ForecastBatch>,
    elevated: &HashSet<String>,
) -> Vec<WasteAlert> {
    let alert_date = as_of + Duration::days(config.alert_window_days);

    let mut by_item: BTreeMap<&str, Vec<&InventoryBatch>> = BTreeMap::new();
    for batch in batches
        .iter()
        .filter(|b| b.quantity > 0.0 && b.expiry_date <= alert_date)
    {
        by_item.entry(batch.item_id.as_str()).or_default().push(batch);
    }

    let mut alerts: Vec<WasteAlert> = by_item
        .into_iter()
        .filter_map(|(item_id, item_batches)| {
            let earliest = item_batches.iter().map(|b| b.expiry_date).min()?;
            let earliest_expiry_days = (earliest - as_of).num_days().max(0);
            let total_quantity: f64 = item_batches.iter().map(|b| b.quantity).sum();

            let costed: Vec<(f64, f64)> = item_batches
                .iter()
                .filter_map(|b| b.cost_price.map(|c| (b.quantity, c)))
                .collect();
            let projected_loss: f64 = costed.iter().map(|(q, c)| q * c).sum();
            let costed_quantity: f64 = costed.iter().map(|(q, _)| q).sum();
            let unit_cost = (costed_quantity > 0.0).then(|| projected_loss / costed_quantity);

            let expected_demand_before_expiry = forecasts
                .and_then(|batch| batch.item(item_id))
                .map(|forecast| forecast.demand_between(as_of, earliest));
            let units_at_risk =
                (total_quantity - expected_demand_before_expiry.unwrap_or(0.0)).max(0.0);

            let original_level = WasteRiskLevel::from_days_to_expiry(earliest_expiry_days);
            let mitigated = elevated.contains(item_id)
                && matches!(original_level, WasteRiskLevel::Critical | WasteRiskLevel::High);

            Some(WasteAlert {
                item_id: item_id.to_string(),
                batches_at_risk: item_batches.len(),
                total_quantity,
                earliest_expiry_days,
                risk_level: if mitigated {
                    WasteRiskLevel::Mitigated
                } else {
                    original_level
                },
                original_level,
                mitigated,
                projected_loss,
                expected_demand_before_expiry,
                units_at_risk,
                unit_cost,
            })
        })
        .collect();

    alerts.sort_by(|a, b| {
        a.earliest_expiry_days
            .cmp(&b.earliest_expiry_days)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });

    info!(
        "{} items have stock expiring within {} days (projected loss {:.2})",
        alerts.len(),
        config.alert_window_days,
        alerts.iter().map(|a| a.projected_loss).sum::<f64>()
    );

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::{DemandSeries, ForecastMethod, ForecastPoint, ItemForecast};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn batch(item: &str, id: &str, quantity: f64, days: i64, cost: Option<f64>) -> InventoryBatch {
        InventoryBatch {
            item_id: item.to_string(),
            batch_id: id.to_string(),
            quantity,
            expiry_date: today() + Duration::days(days),
            cost_price: cost,
        }
    }

    #[test]
    fn test_levels_and_grouping() {
        let batches = vec![
            batch("Cough Syrup", "B1", 40.0, 20, Some(2.0)),
            batch("Cough Syrup", "B2", 10.0, 10, Some(3.0)),
            batch("Insulin", "B3", 5.0, 40, None),
            batch("Dolo 650", "B4", 100.0, 200, Some(1.0)),
        ];
        let alerts = assess_expiry_risk(&batches, today(), &WasteConfig::default(), None, &HashSet::new());

        assert_eq!(alerts.len(), 2);
        let syrup = &alerts[0];
        assert_eq!(syrup.item_id, "Cough Syrup");
        assert_eq!(syrup.batches_at_risk, 2);
        assert_eq!(syrup.earliest_expiry_days, 10);
        assert_eq!(syrup.risk_level, WasteRiskLevel::Critical);
        assert!((syrup.projected_loss - 110.0).abs() < 1e-9);
        assert!((syrup.unit_cost.unwrap() - 2.2).abs() < 1e-9);
        assert_eq!(syrup.units_at_risk, 50.0);

        let insulin = &alerts[1];
        assert_eq!(insulin.risk_level, WasteRiskLevel::Moderate);
        assert_eq!(insulin.projected_loss, 0.0);
        assert!(insulin.unit_cost.is_none());
    }

    #[test]
    fn test_elevated_items_are_mitigated() {
        let batches = vec![
            batch("Azithral", "B1", 30.0, 20, Some(5.0)),
            batch("Paracetamol", "B2", 30.0, 35, Some(1.0)),
        ];
        let elevated: HashSet<String> =
            ["Azithral".to_string(), "Paracetamol".to_string()].into_iter().collect();
        let alerts = assess_expiry_risk(&batches, today(), &WasteConfig::default(), None, &elevated);

        assert_eq!(alerts[0].risk_level, WasteRiskLevel::Mitigated);
        assert_eq!(alerts[0].original_level, WasteRiskLevel::High);
        assert!(alerts[0].mitigated);
        // Moderate is left alone
        assert_eq!(alerts[1].risk_level, WasteRiskLevel::Moderate);
        assert!(!alerts[1].mitigated);
    }

    #[test]
    fn test_expired_batches_count_as_today() {
        let batches = vec![batch("Pan 40", "B1", 12.0, -3, Some(1.5))];
        let alerts = assess_expiry_risk(&batches, today(), &WasteConfig::default(), None, &HashSet::new());
        assert_eq!(alerts[0].earliest_expiry_days, 0);
        assert_eq!(alerts[0].risk_level, WasteRiskLevel::Critical);
    }

    #[test]
    fn test_forecast_demand_offsets_units_at_risk() {
        let forecast = ItemForecast {
            item_id: "Cough Syrup".to_string(),
            method: ForecastMethod::SeasonalBaseline,
            fallback_from: None,
            fallback_reason: None,
            volatility: 1.0,
            history: DemandSeries::new("Cough Syrup", today() - Duration::days(7), vec![3.0; 7]),
            points: (0..30)
                .map(|i| ForecastPoint {
                    date: today() + Duration::days(i),
                    point_estimate: 3.0,
                    lower_bound: 2.0,
                    upper_bound: 4.0,
                })
                .collect(),
            accuracy: None,
        };
        let forecasts = ForecastBatch {
            horizon_days: 30,
            confidence_level: 0.95,
            items: vec![forecast],
            skipped: vec![],
            generated_at: Utc::now(),
        };

        let batches = vec![batch("Cough Syrup", "B1", 40.0, 10, Some(2.0))];
        let alerts = assess_expiry_risk(
            &batches,
            today(),
            &WasteConfig::default(),
            Some(&forecasts),
            &HashSet::new(),
        );
        assert_eq!(alerts[0].expected_demand_before_expiry, Some(30.0));
        assert_eq!(alerts[0].units_at_risk, 10.0);
    }
}
