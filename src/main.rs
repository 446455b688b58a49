use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use trade_infra::config::AppConfig;
use trade_infra::execution::scheduler::SCHEDULER_TASK;
use trade_infra::execution::TradingService;
use trade_infra::observability::{init_tracing, register_metrics};
use trade_infra::price_infra::InMemoryPriceOracle;
use trade_infra::storage::in_memory_stores;
use trade_infra::types::{Clock, Price, SystemClock, Ticker};
use trade_infra::utils::TaskSupervisor;

const CATALOGUE: &[(&str, &str, f64)] = &[
    ("AAPL", "Apple Inc.", 189.84),
    ("MSFT", "Microsoft Corporation", 415.10),
    ("GOOGL", "Alphabet Inc.", 171.95),
    ("AMZN", "Amazon.com, Inc.", 183.32),
    ("TSLA", "Tesla, Inc.", 177.48),
    ("NVDA", "NVIDIA Corporation", 903.56),
];

fn seed_oracle(oracle: &InMemoryPriceOracle) {
    for (symbol, name, price) in CATALOGUE {
        let ticker = Ticker::from(*symbol);
        oracle.register(ticker.clone(), *name);
        oracle.set_price(&ticker, Price::from_f64(*price));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env).context("loading configuration")?;

    init_tracing(&config.logging)?;
    register_metrics().context("registering metrics")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let oracle = Arc::new(InMemoryPriceOracle::with_clock(clock.clone()));
    seed_oracle(&oracle);

    let tickers = oracle.tickers();
    let service = TradingService::new(in_memory_stores(), oracle, clock, config.trading.clone());
    let scheduler = Arc::new(service.scheduler(&config.scheduler));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut supervisor = TaskSupervisor::new();
    scheduler.spawn(&mut supervisor, shutdown_rx);

    info!(env = %env, instruments = ?tickers, "trade-infra started");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut health = tokio::time::interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                info!("Shutdown requested");
                break;
            }
            _ = health.tick() => {
                if let Err(e) = supervisor.check_health() {
                    error!(error = %e, "Background task died");
                    break;
                }
            }
        }
    }

    if let Err(e) = shutdown_tx.send(true) {
        debug!(error = %e, "No background task left to signal");
    }
    if supervisor.active_task_count() > 0 {
        if let Err(e) = supervisor.wait_for_task(SCHEDULER_TASK).await {
            warn!(error = %e, "Scheduler did not stop cleanly");
        }
    }
    supervisor.shutdown_all();
    info!("trade-infra stopped");
    Ok(())
}
