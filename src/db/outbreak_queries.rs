use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, FromRow)]
pub struct ActiveOutbreakRow {
    pub outbreak_name: String,
    /// JSON array of medicine names
    pub affected_meds: Option<String>,
}

/// Outbreaks whose window covers the current time
pub async fn fetch_active(pool: &PgPool) -> Result<Vec<ActiveOutbreakRow>, sqlx::Error> {
    sqlx::query_as::<_, ActiveOutbreakRow>(
        "SELECT outbreak_name, affected_meds::text AS affected_meds
         FROM outbreak_forecasts
         WHERE start_date <= NOW() AND end_date >= NOW()",
    )
    .fetch_all(pool)
    .await
}
