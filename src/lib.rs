pub mod config;
#[cfg(feature = "postgres")]
pub mod db;
pub mod errors;
pub mod external;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;
