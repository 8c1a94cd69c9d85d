use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;

use crate::external::demand_source::{DemandSource, RiskSignalSource, SourceError, StockSource};
use crate::models::{DemandObservation, HolidayCalendar, InventoryBatch};

/// In-process data for all three collaborators. Used by embedders that already
/// hold their data and by tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    histories: BTreeMap<String, Vec<DemandObservation>>,
    holidays: HolidayCalendar,
    stock_levels: HashMap<String, f64>,
    batches: Vec<InventoryBatch>,
    elevated: HashSet<String>,
    /// Items whose history fetch fails with `Unavailable`
    unavailable: HashSet<String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, item_id: &str, observations: Vec<DemandObservation>) -> Self {
        self.histories.insert(item_id.to_string(), observations);
        self
    }

    pub fn with_holidays(mut self, holidays: HolidayCalendar) -> Self {
        self.holidays = holidays;
        self
    }

    pub fn with_stock(mut self, item_id: &str, quantity: f64) -> Self {
        self.stock_levels.insert(item_id.to_string(), quantity);
        self
    }

    pub fn with_batch(mut self, batch: InventoryBatch) -> Self {
        self.batches.push(batch);
        self
    }

    pub fn with_elevated(mut self, item_id: &str) -> Self {
        self.elevated.insert(item_id.to_string());
        self
    }

    /// Listed, but fetching its history fails
    pub fn with_unavailable(mut self, item_id: &str) -> Self {
        self.histories.entry(item_id.to_string()).or_default();
        self.unavailable.insert(item_id.to_string());
        self
    }
}

#[async_trait]
impl DemandSource for MemorySource {
    async fn list_items(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.histories.keys().cloned().collect())
    }

    async fn fetch_history(&self, item_id: &str) -> Result<Vec<DemandObservation>, SourceError> {
        if self.unavailable.contains(item_id) {
            return Err(SourceError::Unavailable(format!("history for {}", item_id)));
        }
        self.histories
            .get(item_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(item_id.to_string()))
    }

    async fn fetch_holidays(&self) -> Result<HolidayCalendar, SourceError> {
        Ok(self.holidays.clone())
    }
}

#[async_trait]
impl StockSource for MemorySource {
    async fn fetch_stock_levels(&self) -> Result<HashMap<String, f64>, SourceError> {
        Ok(self.stock_levels.clone())
    }

    async fn fetch_expiry_batches(&self) -> Result<Vec<InventoryBatch>, SourceError> {
        Ok(self.batches.clone())
    }
}

#[async_trait]
impl RiskSignalSource for MemorySource {
    async fn fetch_elevated_items(&self) -> Result<HashSet<String>, SourceError> {
        Ok(self.elevated.clone())
    }
}
