pub mod backtest;
pub mod demand_model;
pub mod feature_builder;
pub mod forecast_generator;
pub mod linear_model;
pub mod planning_service;
pub mod pricing_model;
pub mod reorder_policy;
pub mod seasonal_estimator;
pub mod waste_risk;
