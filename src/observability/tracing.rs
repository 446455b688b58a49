use tracing::Span;
use tracing_subscriber::{fmt, EnvFilter};
use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use crate::types::ids::{OrderId, UserId};

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::ConfigError(format!("invalid log filter {:?}: {}", config.level, e)))?;

    let installed = if config.json {
        fmt().with_env_filter(filter).json().try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    };

    installed.map_err(|e| Error::ConfigError(format!("tracing already initialised: {}", e)))
}

pub fn trace_order_processing(order_id: &OrderId, user_id: &UserId) -> Span {
    tracing::info_span!(
        "order_processing",
        order_id = %order_id,
        user_id = %user_id,
    )
}

pub fn trace_scheduler_tick(tick: u64) -> Span {
    tracing::debug_span!(
        "scheduler_tick",
        tick,
    )
}
