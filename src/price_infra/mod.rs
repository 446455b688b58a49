pub mod oracle;

pub use oracle::{InMemoryPriceOracle, PriceOracle};
#[cfg(test)]
pub use oracle::MockPriceOracle;

use serde::{Deserialize, Serialize};
use crate::types::price::Price;
use crate::types::ticker::Ticker;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub ticker: Ticker,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: Timestamp,
    pub price: Price,
}
