use crate::error::{Error, Result};
use crate::types::balance::Balance;
use crate::types::price::Price;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quantity(i64);  // Whole shares

impl Quantity {
    pub fn from_i64(value: i64) -> Self {
        Quantity(value)
    }

    pub fn to_i64(&self) -> i64 {
        self.0
    }

    pub fn zero() -> Self {
        Quantity(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn min(self, other: Self) -> Self {
        Quantity(self.0.min(other.0))
    }

    /// Notional value of this many shares at `price`
    pub fn checked_notional(self, price: Price) -> Result<Balance> {
        self.0.checked_mul(price.to_i64())
            .map(Balance::from_i64)
            .ok_or_else(|| Error::Overflow { operation: format!("notional {} x {}", self, price) })
    }
}

impl Add for Quantity {
    type Output = Quantity;
    fn add(self, other: Quantity) -> Quantity {
        Quantity(self.0 + other.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;
    fn sub(self, other: Quantity) -> Quantity {
        Quantity(self.0 - other.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), |acc, x| acc + x)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
