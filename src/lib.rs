pub mod config;
pub mod error;
pub mod execution;
pub mod interfaces;
pub mod invariants;
pub mod observability;
pub mod orders;
pub mod price_infra;
pub mod settlement;
pub mod storage;
pub mod types;
pub mod utils;

pub use error::{Error, ErrorCategory, Result};
pub use execution::TradingService;
