pub mod config;
pub mod error;
pub mod flight;

pub use config::{Config, MapConfig, ValidationResult, WeatherConfig, WidgetsConfig};
pub use error::{
    AppError, ConfigError, MapInitError, NetworkError, PersistenceError, ReqwestErrorExt,
    ValidationError,
};
pub use flight::{FlightGuard, SingleFlight};

use anyhow::Result;

/// Initialize logging for the host process
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!("Meteopin core initialized");
    Ok(())
}
