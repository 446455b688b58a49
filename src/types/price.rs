use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(i64);  // Fixed-point with 8 decimal places

impl Price {
    pub const MULTIPLIER: i64 = 100_000_000;  // 10^8

    pub fn from_i64(value: i64) -> Self {
        Price(value)
    }

    pub fn to_i64(&self) -> i64 {
        self.0
    }

    /// Whole currency units, e.g. `Price::from_units(50_000)`
    pub fn from_units(units: i64) -> Self {
        Price(units * Self::MULTIPLIER)
    }

    pub fn checked_from_units(units: i64) -> Result<Self> {
        units.checked_mul(Self::MULTIPLIER)
            .map(Price)
            .ok_or_else(|| Error::Overflow { operation: format!("price of {} units", units) })
    }

    pub fn from_f64(value: f64) -> Self {
        Price((value * Self::MULTIPLIER as f64).round() as i64)
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / Self::MULTIPLIER as f64
    }

    pub fn zero() -> Self {
        Price(0)
    }

    pub fn raw_value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl Add for Price {
    type Output = Price;
    fn add(self, other: Price) -> Price {
        Price(self.0 + other.0)
    }
}

impl Sub for Price {
    type Output = Price;
    fn sub(self, other: Price) -> Price {
        Price(self.0 - other.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}
