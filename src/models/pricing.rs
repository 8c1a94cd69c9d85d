use serde::{Deserialize, Serialize};

/// One training row for the price-elasticity model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingObservation {
    pub unit_price: f64,
    pub product_score: f64,
    pub freight_price: f64,
    pub month: u32,
    pub qty: f64,
}

/// Non-price context held fixed while the discount ladder is evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingContext {
    pub product_score: f64,
    pub freight: f64,
    pub month: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingScenario {
    pub discount_pct: f64,
    pub resulting_price: f64,
    pub estimated_quantity: f64,
    pub estimated_revenue: f64,
    /// Quantity change relative to the undiscounted scenario, in percent
    pub uplift_pct: f64,
    pub note: Option<String>,
}

/// Something suspicious about a fitted model that callers should surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelAnomaly {
    /// Demand rising with price
    PositivePriceCoefficient { coefficient: f64 },
}

/// Revenue-recovery table for one near-expiry item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRecovery {
    pub item_id: String,
    pub current_price: f64,
    pub scenarios: Vec<PricingScenario>,
    pub anomalies: Vec<ModelAnomaly>,
}
