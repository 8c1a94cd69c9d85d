use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderStatus {
    Ok,
    ReorderNeeded,
}

/// Reorder decision for one item, recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderRecommendation {
    pub item_id: String,
    pub current_stock: f64,
    /// Daily demand after any demand adjustment was applied
    pub average_daily_demand: f64,
    pub target_stock: f64,
    pub status: ReorderStatus,
    /// Whole units to order; 0 when status is `Ok`
    pub reorder_quantity: u64,
    /// Name of the demand adjustment applied, e.g. an outbreak boost
    pub adjustment: Option<String>,
}

impl ReorderRecommendation {
    pub fn needs_reorder(&self) -> bool {
        self.status == ReorderStatus::ReorderNeeded
    }
}
