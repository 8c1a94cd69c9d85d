//! Price-elasticity regression and discount-scenario simulation for
//! near-expiry stock.

use ndarray::{Array1, Array2};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{
    ModelAnomaly, PricingContext, PricingObservation, PricingScenario, RevenueRecovery,
};
use crate::services::linear_model::{self, ModelWeights};

/// intercept, unit_price, product_score, freight_price, month
const ELASTICITY_COLUMNS: usize = 5;
const COL_PRICE: usize = 1;

const HOLD_NOTE: &str =
    "Outbreak alert: do not discount. Stock is reserved for an active health emergency.";

/// Linear model `qty ~ price + product_score + freight + month`
#[derive(Debug, Clone, PartialEq)]
pub struct ElasticityModel {
    weights: ModelWeights,
}

impl ElasticityModel {
    pub fn fit(observations: &[PricingObservation]) -> Result<Self, AppError> {
        if observations.len() < ELASTICITY_COLUMNS {
            return Err(AppError::InsufficientData {
                required: ELASTICITY_COLUMNS,
                actual: observations.len(),
            });
        }

        let x = Array2::from_shape_fn((observations.len(), ELASTICITY_COLUMNS), |(i, j)| {
            let obs = &observations[i];
            feature_row(obs.unit_price, obs.product_score, obs.freight_price, obs.month)[j]
        });
        let y = Array1::from_iter(observations.iter().map(|o| o.qty));

        let model = Self {
            weights: linear_model::fit(&x, &y)?,
        };

        info!(
            "Trained elasticity model on {} rows (price coefficient {:.4})",
            observations.len(),
            model.price_coefficient()
        );
        for anomaly in model.anomalies() {
            match anomaly {
                ModelAnomaly::PositivePriceCoefficient { coefficient } => warn!(
                    "Elasticity model has a positive price coefficient ({:.4}): demand rises with price",
                    coefficient
                ),
            }
        }

        Ok(model)
    }

    /// `[intercept, price, product_score, freight, month]`
    pub fn from_weights(weights: Vec<f64>) -> Result<Self, AppError> {
        if weights.len() != ELASTICITY_COLUMNS {
            return Err(AppError::Validation(format!(
                "Elasticity model needs {} weights, got {}",
                ELASTICITY_COLUMNS,
                weights.len()
            )));
        }
        Ok(Self {
            weights: ModelWeights::from_vec(weights),
        })
    }

    pub fn price_coefficient(&self) -> f64 {
        self.weights.get(COL_PRICE).unwrap_or(0.0)
    }

    pub fn anomalies(&self) -> Vec<ModelAnomaly> {
        let coefficient = self.price_coefficient();
        if coefficient > 0.0 {
            vec![ModelAnomaly::PositivePriceCoefficient { coefficient }]
        } else {
            Vec::new()
        }
    }

    /// Unclamped quantity estimate at `price`
    pub fn predict(&self, price: f64, context: &PricingContext) -> f64 {
        let row = feature_row(price, context.product_score, context.freight, context.month);
        row.iter()
            .zip(self.weights.as_array().iter())
            .map(|(x, w)| x * w)
            .sum()
    }

    /// One scenario per discount tier. Quantities are clamped at zero;
    /// uplift is relative to the 0% tier.
    pub fn simulate_discounts(
        &self,
        current_price: f64,
        context: &PricingContext,
        ladder: &[f64],
    ) -> Vec<PricingScenario> {
        let base_quantity = self.predict(current_price, context).max(0.0);

        ladder
            .iter()
            .map(|&discount_pct| {
                let resulting_price = current_price * (1.0 - discount_pct / 100.0);
                let estimated_quantity = self.predict(resulting_price, context).max(0.0);
                let uplift_pct = if base_quantity > 0.0 {
                    (estimated_quantity - base_quantity) / base_quantity * 100.0
                } else {
                    0.0
                };

                PricingScenario {
                    discount_pct,
                    resulting_price,
                    estimated_quantity,
                    estimated_revenue: resulting_price * estimated_quantity,
                    uplift_pct,
                    note: None,
                }
            })
            .collect()
    }

    /// Discount table for a near-expiry item. Items under an elevated regional
    /// risk signal get a single hold scenario instead.
    pub fn revenue_recovery(
        &self,
        item_id: &str,
        current_price: f64,
        context: &PricingContext,
        ladder: &[f64],
        elevated_risk: bool,
    ) -> RevenueRecovery {
        let scenarios = if elevated_risk {
            info!("Holding {} at full price due to elevated regional risk", item_id);
            vec![PricingScenario {
                discount_pct: 0.0,
                resulting_price: current_price,
                estimated_quantity: 0.0,
                estimated_revenue: 0.0,
                uplift_pct: 0.0,
                note: Some(HOLD_NOTE.to_string()),
            }]
        } else {
            self.simulate_discounts(current_price, context, ladder)
        };

        RevenueRecovery {
            item_id: item_id.to_string(),
            current_price,
            scenarios,
            anomalies: self.anomalies(),
        }
    }
}

fn feature_row(price: f64, product_score: f64, freight: f64, month: u32) -> [f64; ELASTICITY_COLUMNS] {
    [1.0, price, product_score, freight, month as f64]
}
