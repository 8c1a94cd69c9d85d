mod demand;
mod forecast;
mod pricing;
mod reorder;
mod report;
mod waste;

pub use demand::{DemandObservation, DemandSeries, HolidayCalendar};
pub use forecast::{
    ForecastAccuracy, ForecastBatch, ForecastMethod, ForecastPoint, ForecastRow, ItemForecast,
    RowType, SeasonalEstimate, SkipReason, SkippedItem,
};
pub use pricing::{
    ModelAnomaly, PricingContext, PricingObservation, PricingScenario, RevenueRecovery,
};
pub use reorder::{ReorderRecommendation, ReorderStatus};
pub use report::PlanningReport;
pub use waste::{InventoryBatch, WasteAlert, WasteRiskLevel};
