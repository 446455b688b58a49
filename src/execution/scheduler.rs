use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn, Instrument};

use crate::error::Error;
use crate::execution::engine::{ExecutionEngine, ExecutionSource};
use crate::observability::metrics::{SCHEDULER_FAILURES, SCHEDULER_TICKS};
use crate::observability::tracing::trace_scheduler_tick;
use crate::orders::lifecycle::OrderLifecycleManager;
use crate::price_infra::PriceOracle;
use crate::types::ticker::Ticker;
use crate::utils::TaskSupervisor;

pub const SCHEDULER_TASK: &str = "limit_order_scheduler";

/// Outcome of one pass over the pending limit orders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub evaluated: usize,
    pub filled: usize,
    pub not_triggered: usize,
    pub no_price: usize,
    /// Orders that left PENDING between listing and execution
    pub skipped: usize,
    pub failed: usize,
}

/// Periodically re-evaluates every pending limit order against the oracle.
/// Anything that does not fill stays pending for the next tick.
pub struct LimitOrderScheduler {
    orders: Arc<OrderLifecycleManager>,
    engine: Arc<ExecutionEngine>,
    oracle: Arc<dyn PriceOracle>,
    interval: Duration,
    ticks: AtomicU64,
}

impl LimitOrderScheduler {
    pub fn new(
        orders: Arc<OrderLifecycleManager>,
        engine: Arc<ExecutionEngine>,
        oracle: Arc<dyn PriceOracle>,
        interval: Duration,
    ) -> Self {
        LimitOrderScheduler {
            orders,
            engine,
            oracle,
            interval,
            ticks: AtomicU64::new(0),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// One sequential pass. A failing order is logged and the pass moves on.
    pub async fn run_once(&self) -> TickReport {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        SCHEDULER_TICKS.inc();
        self.evaluate_pending().instrument(trace_scheduler_tick(tick)).await
    }

    async fn evaluate_pending(&self) -> TickReport {
        let mut report = TickReport::default();

        let pending = match self.orders.pending_limit_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                error!(error = %e, "Failed to list pending limit orders");
                return report;
            }
        };
        if pending.is_empty() {
            return report;
        }

        let mut tickers: Vec<Ticker> = pending.iter().map(|o| o.ticker.clone()).collect();
        tickers.sort();
        tickers.dedup();
        let prices = self.oracle.current_prices(&tickers).await;

        for order in pending {
            report.evaluated += 1;

            let Some(price) = prices.get(&order.ticker).copied() else {
                report.no_price += 1;
                continue;
            };
            if !order.trigger_satisfied(price) {
                report.not_triggered += 1;
                continue;
            }

            match self.engine.execute(order.id, price, ExecutionSource::Scheduled).await {
                Ok(_) => report.filled += 1,
                Err(e @ (Error::ConcurrencyConflict { .. } | Error::AlreadyTerminal { .. })) => {
                    debug!(order_id = %order.id, reason = %e, "Order no longer pending");
                    report.skipped += 1;
                }
                Err(e) => {
                    SCHEDULER_FAILURES.inc();
                    warn!(order_id = %order.id, ticker = %order.ticker, error = %e, "Scheduled execution failed, order stays pending");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Tick until `shutdown` turns true or its sender goes away.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = self.interval.as_millis() as u64, "Limit order scheduler started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.run_once().await;
                    if report.filled > 0 || report.failed > 0 {
                        info!(?report, "Scheduler pass complete");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(ticks = self.ticks(), "Limit order scheduler stopped");
    }

    pub fn spawn(self: &Arc<Self>, supervisor: &mut TaskSupervisor, shutdown: watch::Receiver<bool>) {
        supervisor.spawn(SCHEDULER_TASK, Arc::clone(self).run(shutdown));
    }
}
