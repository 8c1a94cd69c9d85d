use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Our own events at `info`, everything else at `warn`
const DEFAULT_FILTER: &str = "pharmacy_forecast=info,warn";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid logging configuration: {0}")]
    Config(String),
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[cfg(feature = "loki")]
    #[error("Invalid LOKI_URL: {0}")]
    Url(#[from] url::ParseError),
    #[cfg(feature = "loki")]
    #[error("Loki layer: {0}")]
    Loki(#[from] tracing_loki::Error),
    #[error("Subscriber already installed: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            loki_enabled: std::env::var("LOKI_ENABLED").is_ok_and(|raw| is_truthy(&raw)),
            loki_url: std::env::var("LOKI_URL").ok().filter(|url| !url.trim().is_empty()),
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "pharmacy-forecast".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), LoggingError> {
        if self.loki_enabled && self.loki_url.is_none() {
            return Err(LoggingError::Config(
                "LOKI_ENABLED is set but LOKI_URL is missing".to_string(),
            ));
        }
        Ok(())
    }

    fn ships_to_loki(&self) -> bool {
        cfg!(feature = "loki") && self.loki_enabled
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

/// Install the global subscriber: an env filter, a stderr fmt layer (stdout
/// carries the report) and, with the `loki` feature, an optional Loki layer.
/// Must run inside the tokio runtime when Loki shipping is enabled.
pub fn init_logging(config: LoggingConfig) -> Result<(), LoggingError> {
    config.validate()?;

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level)?)
        .with(fmt::layer().with_writer(std::io::stderr));

    #[cfg(feature = "loki")]
    let registry = registry.with(loki_layer(&config)?);

    registry.try_init()?;

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        loki = config.ships_to_loki(),
        "📊 Logging initialized"
    );
    Ok(())
}

#[cfg(feature = "loki")]
fn loki_layer(config: &LoggingConfig) -> Result<Option<tracing_loki::Layer>, LoggingError> {
    let raw_url = match (&config.loki_url, config.loki_enabled) {
        (Some(url), true) => url,
        _ => return Ok(None),
    };

    let (layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .build_url(url::Url::parse(raw_url)?)?;

    // Ships buffered events until the runtime shuts down
    tokio::spawn(task);
    Ok(Some(layer))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(loki_enabled: bool, loki_url: Option<&str>) -> LoggingConfig {
        LoggingConfig {
            loki_enabled,
            loki_url: loki_url.map(str::to_string),
            service_name: "pharmacy-forecast".to_string(),
            environment: "test".to_string(),
            log_level: DEFAULT_FILTER.to_string(),
        }
    }

    #[test]
    fn test_validate_requires_url_when_loki_enabled() {
        assert!(matches!(
            config(true, None).validate(),
            Err(LoggingError::Config(_))
        ));
        assert!(config(true, Some("http://localhost:3100")).validate().is_ok());
        assert!(config(false, None).validate().is_ok());
    }

    #[test]
    fn test_truthy_flags() {
        assert!(is_truthy("true"));
        assert!(is_truthy(" 1 "));
        assert!(is_truthy("YES"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[cfg(feature = "loki")]
    #[test]
    fn test_no_loki_layer_when_disabled() {
        let layer = loki_layer(&config(false, Some("http://localhost:3100"))).unwrap();
        assert!(layer.is_none());
    }
}
