use std::sync::Arc;

use crate::config::ForecastConfig;
use crate::external::demand_source::{DemandSource, RiskSignalSource, StockSource};
use crate::services::pricing_model::ElasticityModel;

/// Handles to the data collaborators plus shared settings. Built once at
/// process start and passed to every planning run.
#[derive(Clone)]
pub struct AppState {
    pub demand_source: Arc<dyn DemandSource>,
    pub stock_source: Arc<dyn StockSource>,
    pub risk_source: Arc<dyn RiskSignalSource>,
    pub config: Arc<ForecastConfig>,
    pub pricing_model: Option<Arc<ElasticityModel>>,
}

impl AppState {
    pub fn new(
        demand_source: Arc<dyn DemandSource>,
        stock_source: Arc<dyn StockSource>,
        risk_source: Arc<dyn RiskSignalSource>,
        config: ForecastConfig,
    ) -> Self {
        Self {
            demand_source,
            stock_source,
            risk_source,
            config: Arc::new(config),
            pricing_model: None,
        }
    }

    /// One collaborator serving all three roles
    pub fn from_source<S>(source: Arc<S>, config: ForecastConfig) -> Self
    where
        S: DemandSource + StockSource + RiskSignalSource + 'static,
    {
        Self::new(source.clone(), source.clone(), source, config)
    }

    pub fn with_pricing_model(mut self, model: ElasticityModel) -> Self {
        self.pricing_model = Some(Arc::new(model));
        self
    }
}
