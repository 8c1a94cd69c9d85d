use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, FromRow)]
pub struct PrescriptionRow {
    pub date: NaiveDate,
    pub qty: f64,
}

pub async fn fetch_item_names(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT med_name
         FROM prescriptions
         ORDER BY med_name",
    )
    .fetch_all(pool)
    .await
}

/// Daily totals for one item, oldest first
pub async fn fetch_daily_demand(
    pool: &PgPool,
    med_name: &str,
) -> Result<Vec<PrescriptionRow>, sqlx::Error> {
    sqlx::query_as::<_, PrescriptionRow>(
        "SELECT date::date AS date, SUM(qty)::float8 AS qty
         FROM prescriptions
         WHERE med_name = $1
         GROUP BY date::date
         ORDER BY date::date ASC",
    )
    .bind(med_name)
    .fetch_all(pool)
    .await
}

/// Dates flagged as holidays in either the holiday table or the prescription log
pub async fn fetch_holiday_dates(pool: &PgPool) -> Result<Vec<NaiveDate>, sqlx::Error> {
    sqlx::query_scalar::<_, NaiveDate>(
        "SELECT holiday_date::date FROM holidays
         UNION
         SELECT DISTINCT date::date FROM prescriptions WHERE is_holiday = 1",
    )
    .fetch_all(pool)
    .await
}
