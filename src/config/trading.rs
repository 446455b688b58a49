use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::types::balance::Balance;
use crate::types::quantity::Quantity;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Opening cash for new accounts, in whole currency units
    pub default_initial_cash: i64,
    pub max_order_quantity: i64,
}

impl TradingConfig {
    pub fn initial_cash(&self) -> Result<Balance> {
        Balance::checked_from_units(self.default_initial_cash)
    }

    pub fn max_quantity(&self) -> Quantity {
        Quantity::from_i64(self.max_order_quantity)
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        TradingConfig {
            default_initial_cash: 10_000_000,
            max_order_quantity: 1_000_000,
        }
    }
}
