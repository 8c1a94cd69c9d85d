use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::info;

use crate::external::demand_source::{DemandSource, RiskSignalSource, SourceError, StockSource};
use crate::models::{DemandObservation, HolidayCalendar, InventoryBatch, PricingObservation};

#[derive(Debug, Deserialize)]
struct PrescriptionRow {
    date: NaiveDate,
    med_name: String,
    qty: f64,
    #[serde(default)]
    is_holiday: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InventoryRow {
    med_name: String,
    batch_id: String,
    quantity: f64,
    expiry_date: NaiveDate,
    #[serde(default)]
    cost_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OutbreakRow {
    med_name: String,
}

#[derive(Debug, Deserialize)]
struct PricingRow {
    unit_price: f64,
    product_score: f64,
    freight_price: f64,
    month: u32,
    qty: f64,
}

/// File locations for [`CsvSource`]
#[derive(Debug, Clone)]
pub struct CsvPaths {
    pub prescriptions: PathBuf,
    pub inventory: Option<PathBuf>,
    pub outbreaks: Option<PathBuf>,
}

impl CsvPaths {
    pub fn from_env() -> Self {
        Self {
            prescriptions: std::env::var("DEMAND_DATA_PATH")
                .unwrap_or_else(|_| "data/processed_prescriptions.csv".to_string())
                .into(),
            inventory: std::env::var("INVENTORY_DATA_PATH").ok().map(PathBuf::from),
            outbreaks: std::env::var("OUTBREAK_DATA_PATH").ok().map(PathBuf::from),
        }
    }
}

/// Collaborator backed by CSV exports, loaded once at construction.
///
/// Prescriptions: `date,med_name,qty[,is_holiday]`.
/// Inventory: `med_name,batch_id,quantity,expiry_date[,cost_price]`.
/// Outbreaks: `med_name`.
#[derive(Debug, Clone, Default)]
pub struct CsvSource {
    histories: BTreeMap<String, Vec<DemandObservation>>,
    holidays: HolidayCalendar,
    batches: Vec<InventoryBatch>,
    elevated: HashSet<String>,
}

impl CsvSource {
    pub fn load(paths: &CsvPaths) -> Result<Self, SourceError> {
        let (histories, holidays) = parse_prescriptions(open(&paths.prescriptions)?)?;
        let batches = match &paths.inventory {
            Some(path) => parse_inventory(open(path)?)?,
            None => Vec::new(),
        };
        let elevated = match &paths.outbreaks {
            Some(path) => parse_outbreaks(open(path)?)?,
            None => HashSet::new(),
        };

        info!(
            "Loaded CSV data: {} items, {} holidays, {} inventory batches, {} elevated items",
            histories.len(),
            holidays.len(),
            batches.len(),
            elevated.len()
        );

        Ok(Self {
            histories,
            holidays,
            batches,
            elevated,
        })
    }

    pub fn from_readers<P: Read, I: Read>(
        prescriptions: P,
        inventory: Option<I>,
    ) -> Result<Self, SourceError> {
        let (histories, holidays) = parse_prescriptions(prescriptions)?;
        let batches = match inventory {
            Some(reader) => parse_inventory(reader)?,
            None => Vec::new(),
        };
        Ok(Self {
            histories,
            holidays,
            batches,
            elevated: HashSet::new(),
        })
    }
}

fn open(path: &Path) -> Result<File, SourceError> {
    File::open(path).map_err(|e| SourceError::Unavailable(format!("{}: {}", path.display(), e)))
}

fn parse_error(line: usize, e: csv::Error) -> SourceError {
    SourceError::Parse(format!("line {}: {}", line + 2, e))
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y")
}

/// Rows are grouped per item and sorted by date, so exports in any row order
/// load. Any row flagged as a holiday marks that date for every item.
pub fn parse_prescriptions<R: Read>(
    reader: R,
) -> Result<(BTreeMap<String, Vec<DemandObservation>>, HolidayCalendar), SourceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut histories: BTreeMap<String, Vec<DemandObservation>> = BTreeMap::new();
    let mut holidays = HolidayCalendar::new();

    for (line, result) in reader.deserialize::<PrescriptionRow>().enumerate() {
        let row = result.map_err(|e| parse_error(line, e))?;
        if row.is_holiday.as_deref().is_some_and(parse_flag) {
            holidays.insert(row.date);
        }
        histories
            .entry(row.med_name)
            .or_default()
            .push(DemandObservation::new(row.date, row.qty));
    }

    // Same-day rows stay adjacent and are summed during assembly
    for observations in histories.values_mut() {
        observations.sort_by_key(|o| o.date);
    }

    Ok((histories, holidays))
}

pub fn parse_inventory<R: Read>(reader: R) -> Result<Vec<InventoryBatch>, SourceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader
        .deserialize::<InventoryRow>()
        .enumerate()
        .map(|(line, result)| {
            let row = result.map_err(|e| parse_error(line, e))?;
            Ok(InventoryBatch {
                item_id: row.med_name,
                batch_id: row.batch_id,
                quantity: row.quantity,
                expiry_date: row.expiry_date,
                cost_price: row.cost_price,
            })
        })
        .collect()
}

pub fn parse_outbreaks<R: Read>(reader: R) -> Result<HashSet<String>, SourceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader
        .deserialize::<OutbreakRow>()
        .enumerate()
        .map(|(line, result)| result.map(|row| row.med_name).map_err(|e| parse_error(line, e)))
        .collect()
}

/// Training rows for the elasticity model:
/// `unit_price,product_score,freight_price,month,qty`
pub fn parse_pricing_observations<R: Read>(
    reader: R,
) -> Result<Vec<PricingObservation>, SourceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader
        .deserialize::<PricingRow>()
        .enumerate()
        .map(|(line, result)| {
            let row = result.map_err(|e| parse_error(line, e))?;
            Ok(PricingObservation {
                unit_price: row.unit_price,
                product_score: row.product_score,
                freight_price: row.freight_price,
                month: row.month,
                qty: row.qty,
            })
        })
        .collect()
}

pub fn load_pricing_observations(path: &Path) -> Result<Vec<PricingObservation>, SourceError> {
    parse_pricing_observations(open(path)?)
}

#[async_trait]
impl DemandSource for CsvSource {
    async fn list_items(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.histories.keys().cloned().collect())
    }

    async fn fetch_history(&self, item_id: &str) -> Result<Vec<DemandObservation>, SourceError> {
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
impl StockSource for CsvSource {
    /// Sum of batch quantities per item
    async fn fetch_stock_levels(&self) -> Result<HashMap<String, f64>, SourceError> {
        let mut levels: HashMap<String, f64> = HashMap::new();
        for batch in &self.batches {
            *levels.entry(batch.item_id.clone()).or_insert(0.0) += batch.quantity;
        }
        Ok(levels)
    }

    async fn fetch_expiry_batches(&self) -> Result<Vec<InventoryBatch>, SourceError> {
        Ok(self.batches.clone())
    }
}

#[async_trait]
impl RiskSignalSource for CsvSource {
    async fn fetch_elevated_items(&self) -> Result<HashSet<String>, SourceError> {
        Ok(self.elevated.clone())
    }
}
