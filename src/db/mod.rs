pub mod demand_queries;
pub mod inventory_queries;
pub mod outbreak_queries;
