use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ForecastBatch, ReorderRecommendation, RevenueRecovery, WasteAlert};

/// Everything one planning run produces, ready to serialize for a dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningReport {
    pub as_of: NaiveDate,
    pub forecasts: ForecastBatch,
    pub reorders: Vec<ReorderRecommendation>,
    pub waste_alerts: Vec<WasteAlert>,
    pub revenue_recovery: Vec<RevenueRecovery>,
    /// Items under an elevated regional risk signal during this run
    pub elevated_items: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl PlanningReport {
    pub fn reorder_count(&self) -> usize {
        self.reorders.iter().filter(|r| r.needs_reorder()).count()
    }
}
