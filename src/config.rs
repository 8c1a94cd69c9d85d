use std::str::FromStr;

use crate::errors::AppError;
use crate::models::ForecastMethod;

/// Settings for a forecast run and the decision rules that consume it.
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub strategy: ForecastMethod,
    pub horizon_days: usize,
    pub confidence_level: f64,
    /// Per-day growth applied by `trend_factor` (0.001 = 0.1% per day)
    pub trend_growth_rate: f64,
    /// Per-day widening applied by `uncertainty_growth` (0.05 = 5% per day)
    pub uncertainty_growth_rate: f64,
    pub ar_lags: usize,
    /// Days held out for back-testing; 0 disables it
    pub holdout_days: usize,
    pub parallel: bool,
    pub reorder: ReorderConfig,
    pub pricing: PricingConfig,
    pub waste: WasteConfig,
}

#[derive(Debug, Clone)]
pub struct ReorderConfig {
    pub coverage_days: f64,
    pub min_threshold: f64,
    /// Used for stocked items that have no forecast
    pub default_daily_demand: f64,
    pub demand_window_days: usize,
    pub outbreak_multiplier: f64,
}

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub discount_ladder: Vec<f64>,
    pub product_score: f64,
    pub freight: f64,
}

#[derive(Debug, Clone)]
pub struct WasteConfig {
    pub alert_window_days: i64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            strategy: ForecastMethod::LinearRegression,
            horizon_days: 90,
            confidence_level: 0.95,
            trend_growth_rate: 0.001,
            uncertainty_growth_rate: 0.05,
            ar_lags: 5,
            holdout_days: 30,
            parallel: true,
            reorder: ReorderConfig::default(),
            pricing: PricingConfig::default(),
            waste: WasteConfig::default(),
        }
    }
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            coverage_days: 10.0,
            min_threshold: 10.0,
            default_daily_demand: 5.0,
            demand_window_days: 90,
            outbreak_multiplier: 1.5,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            discount_ladder: vec![0.0, 15.0, 30.0, 50.0],
            product_score: 4.5,
            freight: 5.0,
        }
    }
}

impl Default for WasteConfig {
    fn default() -> Self {
        Self { alert_window_days: 45 }
    }
}

impl ForecastConfig {
    /// Read settings from the environment, keeping defaults for unset variables.
    /// Values that are set but unparsable are reported, not silently ignored.
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let strategy = match std::env::var("FORECAST_STRATEGY") {
            Ok(raw) => ForecastMethod::from_str(&raw)?,
            Err(_) => defaults.strategy,
        };

        let config = Self {
            strategy,
            horizon_days: env_or("FORECAST_HORIZON_DAYS", defaults.horizon_days)?,
            confidence_level: env_or("FORECAST_CONFIDENCE_LEVEL", defaults.confidence_level)?,
            trend_growth_rate: env_or("FORECAST_TREND_GROWTH_RATE", defaults.trend_growth_rate)?,
            uncertainty_growth_rate: env_or(
                "FORECAST_UNCERTAINTY_GROWTH_RATE",
                defaults.uncertainty_growth_rate,
            )?,
            ar_lags: env_or("FORECAST_AR_LAGS", defaults.ar_lags)?,
            holdout_days: env_or("FORECAST_HOLDOUT_DAYS", defaults.holdout_days)?,
            parallel: env_or("FORECAST_PARALLEL", defaults.parallel)?,
            reorder: ReorderConfig {
                coverage_days: env_or("REORDER_COVERAGE_DAYS", defaults.reorder.coverage_days)?,
                min_threshold: env_or(
                    "REORDER_MIN_STOCK_THRESHOLD",
                    defaults.reorder.min_threshold,
                )?,
                default_daily_demand: env_or(
                    "REORDER_DEFAULT_DAILY_DEMAND",
                    defaults.reorder.default_daily_demand,
                )?,
                demand_window_days: env_or(
                    "REORDER_DEMAND_WINDOW_DAYS",
                    defaults.reorder.demand_window_days,
                )?,
                outbreak_multiplier: env_or(
                    "OUTBREAK_DEMAND_MULTIPLIER",
                    defaults.reorder.outbreak_multiplier,
                )?,
            },
            pricing: PricingConfig {
                discount_ladder: match std::env::var("PRICING_DISCOUNT_LADDER") {
                    Ok(raw) => parse_ladder(&raw)?,
                    Err(_) => defaults.pricing.discount_ladder,
                },
                product_score: env_or("PRICING_PRODUCT_SCORE", defaults.pricing.product_score)?,
                freight: env_or("PRICING_FREIGHT", defaults.pricing.freight)?,
            },
            waste: WasteConfig {
                alert_window_days: env_or(
                    "WASTE_ALERT_WINDOW_DAYS",
                    defaults.waste.alert_window_days,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.horizon_days < 1 || self.horizon_days > 365 {
            return Err(AppError::Validation(
                "Forecast horizon must be between 1 and 365 days".to_string(),
            ));
        }
        if self.confidence_level != 0.80 && self.confidence_level != 0.95 {
            return Err(AppError::Validation(
                "Confidence level must be 0.80 or 0.95".to_string(),
            ));
        }
        if self.trend_growth_rate < 0.0 || self.uncertainty_growth_rate < 0.0 {
            return Err(AppError::Validation(
                "Trend and uncertainty growth rates must be non-negative".to_string(),
            ));
        }
        if self.ar_lags == 0 {
            return Err(AppError::Validation("FORECAST_AR_LAGS must be at least 1".to_string()));
        }
        if self.reorder.coverage_days <= 0.0 {
            return Err(AppError::Validation("Coverage days must be positive".to_string()));
        }
        if self.reorder.min_threshold < 0.0 || self.reorder.default_daily_demand < 0.0 {
            return Err(AppError::Validation(
                "Reorder threshold and default demand must be non-negative".to_string(),
            ));
        }
        if self.reorder.demand_window_days == 0 {
            return Err(AppError::Validation(
                "Reorder demand window must be at least 1 day".to_string(),
            ));
        }
        if self.reorder.outbreak_multiplier < 1.0 {
            return Err(AppError::Validation(
                "Outbreak demand multiplier must be at least 1.0".to_string(),
            ));
        }
        if self.pricing.discount_ladder.is_empty()
            || self
                .pricing
                .discount_ladder
                .iter()
                .any(|d| !(0.0..100.0).contains(d))
        {
            return Err(AppError::Validation(
                "Discount ladder must contain percentages in [0, 100)".to_string(),
            ));
        }
        if self.waste.alert_window_days < 0 {
            return Err(AppError::Validation(
                "Waste alert window must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Two-sided z-score for the configured confidence level
    pub fn z_score(&self) -> f64 {
        if self.confidence_level >= 0.95 {
            1.96
        } else {
            1.28
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Validation(format!("Invalid value for {}: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

fn parse_ladder(raw: &str) -> Result<Vec<f64>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| AppError::Validation(format!("Invalid discount tier: {}", s)))
        })
        .collect()
}
