use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A physical stock batch as reported by the inventory collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryBatch {
    pub item_id: String,
    pub batch_id: String,
    pub quantity: f64,
    pub expiry_date: NaiveDate,
    pub cost_price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasteRiskLevel {
    Critical,
    High,
    Moderate,
    /// Critical/High stock held back as outbreak reserve
    Mitigated,
}

impl WasteRiskLevel {
    pub fn from_days_to_expiry(days: i64) -> Self {
        if days < 15 {
            WasteRiskLevel::Critical
        } else if days < 30 {
            WasteRiskLevel::High
        } else {
            WasteRiskLevel::Moderate
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteAlert {
    pub item_id: String,
    pub batches_at_risk: usize,
    pub total_quantity: f64,
    pub earliest_expiry_days: i64,
    pub risk_level: WasteRiskLevel,
    /// Level before outbreak mitigation was applied
    pub original_level: WasteRiskLevel,
    pub mitigated: bool,
    pub projected_loss: f64,
    /// Forecast demand between the as-of date and the earliest expiry
    pub expected_demand_before_expiry: Option<f64>,
    pub units_at_risk: f64,
    /// Average cost of the at-risk batches, when known
    pub unit_cost: Option<f64>,
}
