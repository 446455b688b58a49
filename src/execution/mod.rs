pub mod engine;
pub mod scheduler;
pub mod service;
pub mod views;

pub use engine::{ExecutionEngine, ExecutionSource};
pub use scheduler::{LimitOrderScheduler, TickReport};
pub use service::TradingService;
pub use views::{HoldingView, OrderView, PortfolioSummary};

#[cfg(test)]
mod tests;
