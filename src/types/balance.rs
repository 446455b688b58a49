use crate::error::{Error, Result};
use crate::types::price::Price;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub, Neg};
use std::iter::Sum;
use std::fmt;

/// Cash amount, same fixed-point scale as `Price`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Balance(i64);

impl Balance {
    pub fn from_i64(value: i64) -> Self {
        Balance(value)
    }

    pub fn to_i64(&self) -> i64 {
        self.0
    }

    /// For amounts known to fit; anything read from input goes through
    /// `checked_from_units`.
    pub fn from_units(units: i64) -> Self {
        Balance(units * Price::MULTIPLIER)
    }

    pub fn checked_from_units(units: i64) -> Result<Self> {
        units.checked_mul(Price::MULTIPLIER)
            .map(Balance)
            .ok_or_else(|| Error::Overflow { operation: format!("balance of {} units", units) })
    }

    pub fn from_f64(value: f64) -> Self {
        Balance((value * Price::MULTIPLIER as f64).round() as i64)
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / Price::MULTIPLIER as f64
    }

    pub fn zero() -> Self {
        Balance(0)
    }

    pub fn abs(&self) -> Self {
        Balance(self.0.abs())
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Balance) -> Result<Balance> {
        self.0.checked_add(other.0)
            .map(Balance)
            .ok_or_else(|| Error::Overflow { operation: "balance add".to_string() })
    }

    pub fn checked_sub(self, other: Balance) -> Result<Balance> {
        self.0.checked_sub(other.0)
            .map(Balance)
            .ok_or_else(|| Error::Overflow { operation: "balance sub".to_string() })
    }

    /// Ratio of `self` to `base` as a percentage, 0 when `base` is zero
    pub fn percent_of(&self, base: Balance) -> f64 {
        if base.0 == 0 {
            return 0.0;
        }
        self.0 as f64 / base.0 as f64 * 100.0
    }
}

impl Add for Balance {
    type Output = Balance;
    fn add(self, other: Balance) -> Balance {
        Balance(self.0 + other.0)
    }
}

impl Sub for Balance {
    type Output = Balance;
    fn sub(self, other: Balance) -> Balance {
        Balance(self.0 - other.0)
    }
}

impl Neg for Balance {
    type Output = Balance;
    fn neg(self) -> Balance {
        Balance(-self.0)
    }
}

impl Sum for Balance {
    fn sum<I: Iterator<Item = Balance>>(iter: I) -> Self {
        iter.fold(Balance::zero(), |acc, x| acc + x)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}
