use crate::config::{LoggingConfig, SchedulerConfig, TradingConfig};
use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub trading: TradingConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Layers `config/default`, then `config/{env}`, then `TRADEINFRA__*` variables.
    pub fn load(env: &str) -> Result<Self> {
        Self::load_from("config", env)
    }

    pub fn load_from(dir: &str, env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(&format!("{}/default", dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", dir, env)).required(false))
            .add_source(Environment::with_prefix("TRADEINFRA").separator("__"))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let app: AppConfig = config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        app.validate()?;
        Ok(app)
    }

    fn validate(&self) -> Result<()> {
        if self.trading.default_initial_cash < 0 {
            return Err(Error::ConfigError("trading.default_initial_cash must be non-negative".into()));
        }
        if self.trading.initial_cash().is_err() {
            return Err(Error::ConfigError("trading.default_initial_cash is too large".into()));
        }
        if self.trading.max_order_quantity <= 0 {
            return Err(Error::ConfigError("trading.max_order_quantity must be positive".into()));
        }
        if self.scheduler.interval_ms == 0 {
            return Err(Error::ConfigError("scheduler.interval_ms must be positive".into()));
        }
        Ok(())
    }
}
