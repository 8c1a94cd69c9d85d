use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, warn};

use crate::db::{demand_queries, inventory_queries, outbreak_queries};
use crate::external::demand_source::{DemandSource, RiskSignalSource, SourceError, StockSource};
use crate::models::{DemandObservation, HolidayCalendar, InventoryBatch};

/// Collaborator over the pharmacy database. The pool is created by the caller
/// and closed by it at shutdown.
#[derive(Clone)]
pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unavailable(context: &str, e: sqlx::Error) -> SourceError {
    error!("Database query failed ({}): {}", context, e);
    SourceError::Unavailable(format!("{}: {}", context, e))
}

#[async_trait]
impl DemandSource for PgSource {
    async fn list_items(&self) -> Result<Vec<String>, SourceError> {
        demand_queries::fetch_item_names(&self.pool)
            .await
            .map_err(|e| unavailable("list items", e))
    }

    async fn fetch_history(&self, item_id: &str) -> Result<Vec<DemandObservation>, SourceError> {
        let rows = demand_queries::fetch_daily_demand(&self.pool, item_id)
            .await
            .map_err(|e| unavailable("fetch history", e))?;
        Ok(rows
            .into_iter()
            .map(|r| DemandObservation::new(r.date, r.qty))
            .collect())
    }

    async fn fetch_holidays(&self) -> Result<HolidayCalendar, SourceError> {
        let dates = demand_queries::fetch_holiday_dates(&self.pool)
            .await
            .map_err(|e| unavailable("fetch holidays", e))?;
        Ok(dates.into_iter().collect())
    }
}

#[async_trait]
impl StockSource for PgSource {
    async fn fetch_stock_levels(&self) -> Result<HashMap<String, f64>, SourceError> {
        let rows = inventory_queries::fetch_stock_levels(&self.pool)
            .await
            .map_err(|e| unavailable("fetch stock levels", e))?;
        Ok(rows.into_iter().map(|r| (r.med_name, r.total_qty)).collect())
    }

    async fn fetch_expiry_batches(&self) -> Result<Vec<InventoryBatch>, SourceError> {
        let rows = inventory_queries::fetch_batches(&self.pool)
            .await
            .map_err(|e| unavailable("fetch batches", e))?;
        Ok(rows
            .into_iter()
            .map(|r| InventoryBatch {
                item_id: r.med_name,
                batch_id: r.batch_id,
                quantity: r.quantity,
                expiry_date: r.expiry_date,
                cost_price: r.cost_price,
            })
            .collect())
    }
}

#[async_trait]
impl RiskSignalSource for PgSource {
    async fn fetch_elevated_items(&self) -> Result<HashSet<String>, SourceError> {
        let rows = outbreak_queries::fetch_active(&self.pool)
            .await
            .map_err(|e| unavailable("fetch outbreaks", e))?;

        let mut elevated = HashSet::new();
        for row in rows {
            let Some(raw) = row.affected_meds else { continue };
            match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(meds) => elevated.extend(meds),
                Err(e) => warn!(
                    "Ignoring malformed medicine list for outbreak {}: {}",
                    row.outbreak_name, e
                ),
            }
        }
        Ok(elevated)
    }
}
