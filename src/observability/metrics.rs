use lazy_static::lazy_static;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Order metrics
    pub static ref ORDERS_PLACED: IntCounterVec = IntCounterVec::new(
        Opts::new("orders_placed_total", "Total number of orders accepted for placement"),
        &["side", "order_type"]
    ).unwrap();

    pub static ref ORDERS_FILLED: IntCounterVec = IntCounterVec::new(
        Opts::new("orders_filled_total", "Total number of orders filled"),
        &["side", "source"]
    ).unwrap();

    pub static ref ORDERS_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("orders_rejected_total", "Total number of orders rejected"),
        &["reason"]
    ).unwrap();

    pub static ref ORDERS_CANCELLED: IntCounter = IntCounter::new(
        "orders_cancelled_total",
        "Total number of orders cancelled"
    ).unwrap();

    // Scheduler metrics
    pub static ref SCHEDULER_TICKS: IntCounter = IntCounter::new(
        "scheduler_ticks_total",
        "Total number of limit order scheduler passes"
    ).unwrap();

    pub static ref SCHEDULER_FAILURES: IntCounter = IntCounter::new(
        "scheduler_execution_failures_total",
        "Scheduled executions that failed and were left pending"
    ).unwrap();

    // Latency metrics
    pub static ref EXECUTION_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "order_execution_latency_seconds",
            "Time spent settling a single order"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1])
    ).unwrap();
}

/// Registers every collector with `REGISTRY`. Call once at startup.
pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(ORDERS_PLACED.clone()))?;
    REGISTRY.register(Box::new(ORDERS_FILLED.clone()))?;
    REGISTRY.register(Box::new(ORDERS_REJECTED.clone()))?;
    REGISTRY.register(Box::new(ORDERS_CANCELLED.clone()))?;
    REGISTRY.register(Box::new(SCHEDULER_TICKS.clone()))?;
    REGISTRY.register(Box::new(SCHEDULER_FAILURES.clone()))?;
    REGISTRY.register(Box::new(EXECUTION_LATENCY.clone()))?;
    Ok(())
}
