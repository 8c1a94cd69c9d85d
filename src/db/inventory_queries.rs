use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, FromRow)]
pub struct StockLevelRow {
    pub med_name: String,
    pub total_qty: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct BatchRow {
    pub med_name: String,
    pub batch_id: String,
    pub quantity: f64,
    pub expiry_date: NaiveDate,
    pub cost_price: Option<f64>,
}

pub async fn fetch_stock_levels(pool: &PgPool) -> Result<Vec<StockLevelRow>, sqlx::Error> {
    sqlx::query_as::<_, StockLevelRow>(
        "SELECT med_name, SUM(quantity)::float8 AS total_qty
         FROM inventory
         GROUP BY med_name",
    )
    .fetch_all(pool)
    .await
}

pub async fn fetch_batches(pool: &PgPool) -> Result<Vec<BatchRow>, sqlx::Error> {
    sqlx::query_as::<_, BatchRow>(
        "SELECT med_name,
                batch_id::text AS batch_id,
                quantity::float8 AS quantity,
                expiry_date::date AS expiry_date,
                cost_price::float8 AS cost_price
         FROM inventory
         WHERE quantity > 0
         ORDER BY expiry_date ASC",
    )
    .fetch_all(pool)
    .await
}
