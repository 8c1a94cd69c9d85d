use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Utc};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{
    ForecastBatch, PlanningReport, PricingContext, RevenueRecovery, SkipReason, SkippedItem,
    WasteAlert,
};
use crate::services::forecast_generator::{generate_batch, ItemInput};
use crate::services::pricing_model::ElasticityModel;
use crate::services::reorder_policy::{recommend_all, ElevatedRiskAdjuster};
use crate::services::waste_risk::assess_expiry_risk;
use crate::state::AppState;

/// Load everything through the collaborators, forecast every item and derive
/// reorder, waste and pricing decisions.
///
/// A failed history fetch skips that item. Failures loading the item list,
/// calendar, stock or risk signals fail the whole run.
pub async fn build_planning_report(
    state: &AppState,
    as_of: NaiveDate,
) -> Result<PlanningReport, AppError> {
    let config = state.config.clone();
    info!("Building planning report as of {}", as_of);

    let item_ids = state.demand_source.list_items().await?;
    let calendar = state.demand_source.fetch_holidays().await?;
    let stock_levels = state.stock_source.fetch_stock_levels().await?;
    let batches = state.stock_source.fetch_expiry_batches().await?;
    let elevated = state.risk_source.fetch_elevated_items().await?;

    let (inputs, source_skips) = load_histories(state, &item_ids).await;

    // CPU-bound from here on
    let batch_config = config.clone();
    let mut forecasts: ForecastBatch =
        tokio::task::spawn_blocking(move || generate_batch(&inputs, &calendar, &batch_config))
            .await
            .map_err(|e| AppError::Internal(format!("Forecast worker failed: {}", e)))?;
    forecasts.skipped.extend(source_skips);

    let adjuster = ElevatedRiskAdjuster::new(elevated.clone(), config.reorder.outbreak_multiplier);
    let reorders = recommend_all(&forecasts, &stock_levels, &config.reorder, &adjuster);

    let waste_alerts = assess_expiry_risk(&batches, as_of, &config.waste, Some(&forecasts), &elevated);

    let revenue_recovery = match &state.pricing_model {
        Some(model) => {
            let context = PricingContext {
                product_score: config.pricing.product_score,
                freight: config.pricing.freight,
                month: as_of.month(),
            };
            recovery_for_alerts(model, &waste_alerts, &context, &config.pricing.discount_ladder, &elevated)
        }
        None => Vec::new(),
    };

    let mut elevated_items: Vec<String> = elevated.into_iter().collect();
    elevated_items.sort();

    let report = PlanningReport {
        as_of,
        forecasts,
        reorders,
        waste_alerts,
        revenue_recovery,
        elevated_items,
        generated_at: Utc::now(),
    };

    info!(
        "Planning report ready: {} forecasts, {} skipped, {} reorders, {} waste alerts",
        report.forecasts.items.len(),
        report.forecasts.skipped.len(),
        report.reorder_count(),
        report.waste_alerts.len()
    );

    Ok(report)
}

async fn load_histories(state: &AppState, item_ids: &[String]) -> (Vec<ItemInput>, Vec<SkippedItem>) {
    let mut inputs = Vec::with_capacity(item_ids.len());
    let mut skipped = Vec::new();

    for item_id in item_ids {
        match state.demand_source.fetch_history(item_id).await {
            Ok(observations) => inputs.push(ItemInput::new(item_id.clone(), observations)),
            Err(e) => {
                warn!("Skipping {} (history unavailable): {}", item_id, e);
                skipped.push(SkippedItem {
                    item_id: item_id.clone(),
                    reason: SkipReason::SourceFailure,
                    detail: e.to_string(),
                });
            }
        }
    }

    (inputs, skipped)
}

/// Discount tables for near-expiry items whose unit cost is known, priced
/// from that cost
fn recovery_for_alerts(
    model: &ElasticityModel,
    alerts: &[WasteAlert],
    context: &PricingContext,
    ladder: &[f64],
    elevated: &HashSet<String>,
) -> Vec<RevenueRecovery> {
    alerts
        .iter()
        .filter_map(|alert| {
            let price = alert.unit_cost?;
            Some(model.revenue_recovery(
                &alert.item_id,
                price,
                context,
                ladder,
                elevated.contains(&alert.item_id),
            ))
        })
        .collect()
}
