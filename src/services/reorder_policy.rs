use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info};

use crate::config::ReorderConfig;
use crate::models::{ForecastBatch, ReorderRecommendation, ReorderStatus};

/// Scale applied to an item's average daily demand before the stock check
#[derive(Debug, Clone, PartialEq)]
pub struct DemandAdjustment {
    pub multiplier: f64,
    pub label: String,
}

/// Pluggable pre-step that may scale an item's demand before the reorder
/// comparison (regional outbreak intelligence, promotions, ...).
pub trait DemandAdjuster: Send + Sync {
    fn adjustment_for(&self, item_id: &str) -> Option<DemandAdjustment>;
}

/// Leaves every item's demand unchanged
pub struct NoAdjustment;

impl DemandAdjuster for NoAdjustment {
    fn adjustment_for(&self, _item_id: &str) -> Option<DemandAdjustment> {
        None
    }
}

/// Boosts demand for items flagged by a regional risk signal
pub struct ElevatedRiskAdjuster {
    elevated: HashSet<String>,
    multiplier: f64,
}

impl ElevatedRiskAdjuster {
    /// Multipliers below 1.0 are raised to 1.0; the adjustment only scales up.
    pub fn new(elevated: HashSet<String>, multiplier: f64) -> Self {
        Self {
            elevated,
            multiplier: multiplier.max(1.0),
        }
    }
}

impl DemandAdjuster for ElevatedRiskAdjuster {
    fn adjustment_for(&self, item_id: &str) -> Option<DemandAdjustment> {
        self.elevated.contains(item_id).then(|| DemandAdjustment {
            multiplier: self.multiplier,
            label: format!("outbreak_boost_x{}", self.multiplier),
        })
    }
}

/// Reorder decision for one item.
///
/// The comparison uses the unrounded target; only the ordered quantity is
/// rounded up to whole units.
pub fn recommend(
    item_id: &str,
    average_daily_demand: f64,
    current_stock: f64,
    min_threshold: f64,
    coverage_days: f64,
) -> ReorderRecommendation {
    let average_daily_demand = average_daily_demand.max(0.0);
    let target_stock = (average_daily_demand * coverage_days).max(min_threshold);

    let (status, reorder_quantity) = if current_stock < target_stock {
        (
            ReorderStatus::ReorderNeeded,
            (target_stock - current_stock).ceil() as u64,
        )
    } else {
        (ReorderStatus::Ok, 0)
    };

    ReorderRecommendation {
        item_id: item_id.to_string(),
        current_stock,
        average_daily_demand,
        target_stock,
        status,
        reorder_quantity,
        adjustment: None,
    }
}

/// Recommendations for every forecast or stocked item, largest order first.
///
/// Forecast items without a stock entry count as out of stock. Stocked items
/// without a forecast use `config.default_daily_demand`.
pub fn recommend_all(
    batch: &ForecastBatch,
    stock_levels: &HashMap<String, f64>,
    config: &ReorderConfig,
    adjuster: &dyn DemandAdjuster,
) -> Vec<ReorderRecommendation> {
    let item_ids: BTreeSet<&str> = batch
        .items
        .iter()
        .map(|f| f.item_id.as_str())
        .chain(stock_levels.keys().map(String::as_str))
        .collect();

    let mut recommendations: Vec<ReorderRecommendation> = item_ids
        .into_iter()
        .map(|item_id| {
            let base_demand = batch
                .item(item_id)
                .map(|f| f.average_daily_demand(config.demand_window_days))
                .unwrap_or(config.default_daily_demand);
            let adjustment = adjuster.adjustment_for(item_id);
            let demand = match &adjustment {
                Some(adj) => {
                    debug!("Applying {} to {} demand", adj.label, item_id);
                    base_demand * adj.multiplier
                }
                None => base_demand,
            };
            let current_stock = stock_levels.get(item_id).copied().unwrap_or(0.0);

            let mut rec = recommend(
                item_id,
                demand,
                current_stock,
                config.min_threshold,
                config.coverage_days,
            );
            rec.adjustment = adjustment.map(|adj| adj.label);
            rec
        })
        .collect();

    recommendations.sort_by(|a, b| {
        b.reorder_quantity
            .cmp(&a.reorder_quantity)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });

    info!(
        "{} of {} items need reordering",
        recommendations.iter().filter(|r| r.needs_reorder()).count(),
        recommendations.len()
    );

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use crate::models::{DemandSeries, ForecastMethod, ForecastPoint, ItemForecast};

    fn forecast(item_id: &str, daily: f64) -> ItemForecast {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ItemForecast {
            item_id: item_id.to_string(),
            method: ForecastMethod::SeasonalBaseline,
            fallback_from: None,
            fallback_reason: None,
            volatility: 1.0,
            history: DemandSeries::new(item_id, start, vec![daily; 7]),
            points: (1..=10)
                .map(|i| ForecastPoint {
                    date: start + chrono::Duration::days(6 + i),
                    point_estimate: daily,
                    lower_bound: daily,
                    upper_bound: daily,
                })
                .collect(),
            accuracy: None,
        }
    }

    fn batch(items: Vec<ItemForecast>) -> ForecastBatch {
        ForecastBatch {
            horizon_days: 10,
            confidence_level: 0.95,
            items,
            skipped: vec![],
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_shelf_with_steady_demand() {
        let rec = recommend("Dolo 650", 20.0, 0.0, 30.0, 10.0);
        assert_eq!(rec.target_stock, 200.0);
        assert_eq!(rec.status, ReorderStatus::ReorderNeeded);
        assert_eq!(rec.reorder_quantity, 200);
    }

    #[test]
    fn test_min_threshold_floors_slow_movers() {
        let rec = recommend("Pan 40", 0.5, 8.0, 10.0, 10.0);
        assert_eq!(rec.target_stock, 10.0);
        assert_eq!(rec.reorder_quantity, 2);
    }

    #[test]
    fn test_quantity_rounds_up_but_comparison_does_not() {
        let rec = recommend("Azithral", 1.05, 10.0, 0.0, 10.0);
        assert!(rec.needs_reorder());
        assert_eq!(rec.reorder_quantity, 1);

        let rec = recommend("Azithral", 1.0, 10.0, 0.0, 10.0);
        assert_eq!(rec.status, ReorderStatus::Ok);
        assert_eq!(rec.reorder_quantity, 0);
    }

    #[test]
    fn test_elevated_items_get_boosted() {
        let adjuster = ElevatedRiskAdjuster::new(["Azithral".to_string()].into_iter().collect(), 1.5);
        let stock = HashMap::from([("Azithral".to_string(), 100.0), ("Dolo 650".to_string(), 100.0)]);
        let recs = recommend_all(
            &batch(vec![forecast("Azithral", 10.0), forecast("Dolo 650", 10.0)]),
            &stock,
            &ReorderConfig::default(),
            &adjuster,
        );

        assert_eq!(recs[0].item_id, "Azithral");
        assert_eq!(recs[0].average_daily_demand, 15.0);
        assert_eq!(recs[0].reorder_quantity, 50);
        assert_eq!(recs[0].adjustment.as_deref(), Some("outbreak_boost_x1.5"));
        assert_eq!(recs[1].status, ReorderStatus::Ok);
        assert!(recs[1].adjustment.is_none());
    }

    #[test]
    fn test_stocked_item_without_forecast_uses_default_demand() {
        let stock = HashMap::from([("Insulin".to_string(), 20.0)]);
        let recs = recommend_all(&batch(vec![]), &stock, &ReorderConfig::default(), &NoAdjustment);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].average_daily_demand, 5.0);
        assert_eq!(recs[0].reorder_quantity, 30);
    }

    #[test]
    fn test_sorted_by_quantity_descending() {
        let stock = HashMap::from([("A".to_string(), 0.0), ("B".to_string(), 0.0)]);
        let recs = recommend_all(
            &batch(vec![forecast("A", 2.0), forecast("B", 8.0), forecast("C", 5.0)]),
            &stock,
            &ReorderConfig::default(),
            &NoAdjustment,
        );
        let order: Vec<&str> = recs.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
    }
}
