use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use pharmacy_forecast::config::ForecastConfig;
use pharmacy_forecast::external::csv_source::{load_pricing_observations, CsvPaths, CsvSource};
use pharmacy_forecast::logging::{init_logging, LoggingConfig};
use pharmacy_forecast::models::PlanningReport;
use pharmacy_forecast::services::planning_service::build_planning_report;
use pharmacy_forecast::services::pricing_model::ElasticityModel;
use pharmacy_forecast::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env()).context("Failed to initialize logging")?;

    let config = ForecastConfig::from_env().context("Invalid forecast configuration")?;
    let as_of = match std::env::var("AS_OF_DATE") {
        Ok(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid AS_OF_DATE: {}", raw))?,
        Err(_) => Utc::now().date_naive(),
    };

    #[cfg(feature = "postgres")]
    let mut db_pool: Option<sqlx::PgPool> = None;

    // Select data source based on DEMAND_SOURCE env var (defaults to csv)
    let source_name = std::env::var("DEMAND_SOURCE").unwrap_or_else(|_| "csv".to_string());
    let mut state = match source_name.to_lowercase().as_str() {
        "csv" => {
            let paths = CsvPaths::from_env();
            info!("📂 Using CSV data source ({})", paths.prescriptions.display());
            let source = CsvSource::load(&paths).context("Failed to load CSV data")?;
            AppState::from_source(Arc::new(source), config)
        }
        #[cfg(feature = "postgres")]
        "postgres" => {
            use pharmacy_forecast::external::postgres_source::PgSource;
            use sqlx::postgres::PgPoolOptions;

            let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&database_url)
                .await
                .context("Failed to connect to database")?;
            info!("🗄️ Using PostgreSQL data source");
            db_pool = Some(pool.clone());
            AppState::from_source(Arc::new(PgSource::new(pool)), config)
        }
        other => anyhow::bail!(
            "Invalid DEMAND_SOURCE: {}. Must be 'csv' or 'postgres' (with the postgres feature)",
            other
        ),
    };

    if let Ok(path) = std::env::var("PRICING_DATA_PATH") {
        let observations = load_pricing_observations(&PathBuf::from(&path))
            .with_context(|| format!("Failed to load pricing data from {}", path))?;
        match ElasticityModel::fit(&observations) {
            Ok(model) => state = state.with_pricing_model(model),
            Err(e) => warn!("Pricing model not trained, revenue recovery disabled: {}", e),
        }
    }

    let result = run(&state, as_of).await;

    #[cfg(feature = "postgres")]
    if let Some(pool) = db_pool {
        pool.close().await;
    }

    result
}

async fn run(state: &AppState, as_of: NaiveDate) -> anyhow::Result<()> {
    let report = build_planning_report(state, as_of).await?;

    if let Ok(path) = std::env::var("FORECAST_CSV_PATH") {
        write_forecast_rows(&report, &path)?;
        info!("Wrote forecast rows to {}", path);
    }

    let json = serde_json::to_string_pretty(&report)?;
    match std::env::var("REPORT_PATH") {
        Ok(path) => {
            std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path))?;
            info!("Wrote planning report to {}", path);
        }
        Err(_) => println!("{}", json),
    }

    Ok(())
}

fn write_forecast_rows(report: &PlanningReport, path: &str) -> anyhow::Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {}", path))?;
    for row in report.forecasts.rows() {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
