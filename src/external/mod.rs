pub mod csv_source;
pub mod demand_source;
pub mod memory_source;
#[cfg(feature = "postgres")]
pub mod postgres_source;
