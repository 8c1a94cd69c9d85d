use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{DemandObservation, HolidayCalendar, InventoryBatch};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Transaction history and calendar data for the forecast core
#[async_trait]
pub trait DemandSource: Send + Sync {
    /// Every catalog item with demand history
    async fn list_items(&self) -> Result<Vec<String>, SourceError>;

    /// Raw observations for one item in date order
    async fn fetch_history(&self, item_id: &str) -> Result<Vec<DemandObservation>, SourceError>;

    async fn fetch_holidays(&self) -> Result<HolidayCalendar, SourceError>;
}

/// Current stock snapshot and expiry batches
#[async_trait]
pub trait StockSource: Send + Sync {
    async fn fetch_stock_levels(&self) -> Result<HashMap<String, f64>, SourceError>;

    async fn fetch_expiry_batches(&self) -> Result<Vec<InventoryBatch>, SourceError>;
}

/// Regional outbreak intelligence
#[async_trait]
pub trait RiskSignalSource: Send + Sync {
    /// Items whose demand is expected to spike in the region
    async fn fetch_elevated_items(&self) -> Result<HashSet<String>, SourceError>;
}
