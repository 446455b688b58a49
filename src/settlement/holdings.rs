use crate::error::{Error, Result};
use crate::types::balance::Balance;
use crate::types::ids::UserId;
use crate::types::price::Price;
use crate::types::quantity::Quantity;
use crate::types::ticker::Ticker;
use crate::types::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub user_id: UserId,
    pub ticker: Ticker,
    pub quantity: Quantity,
    /// Shares committed to pending limit sells
    pub reserved_quantity: Quantity,
    pub average_buy_price: Price,
    pub updated_at: Timestamp,
}

/// What a mutation leaves behind for the store.
#[derive(Clone, Debug, PartialEq)]
pub enum HoldingChange {
    Upsert(Holding),
    Delete { user_id: UserId, ticker: Ticker },
}

impl Holding {
    pub fn new(user_id: UserId, ticker: Ticker, now: Timestamp) -> Self {
        Holding {
            user_id,
            ticker,
            quantity: Quantity::zero(),
            reserved_quantity: Quantity::zero(),
            average_buy_price: Price::zero(),
            updated_at: now,
        }
    }

    pub fn available_quantity(&self) -> Quantity {
        self.quantity - self.reserved_quantity
    }

    pub fn total_invested(&self) -> Result<Balance> {
        self.quantity.checked_notional(self.average_buy_price)
    }

    /// avg = (old_qty * old_avg + qty * price) / (old_qty + qty)
    pub fn add_shares(&mut self, quantity: Quantity, price: Price) -> Result<()> {
        if !quantity.is_positive() {
            return Err(Error::InvalidQuantity(quantity.to_i64()));
        }
        if !price.is_positive() {
            return Err(Error::InvalidPrice(price));
        }

        let old_qty = self.quantity.to_i64() as i128;
        let add_qty = quantity.to_i64() as i128;
        let total_qty = old_qty + add_qty;
        let total_cost = old_qty * self.average_buy_price.to_i64() as i128
            + add_qty * price.to_i64() as i128;

        let average = i64::try_from(total_cost / total_qty)
            .map_err(|_| Error::Overflow { operation: "average buy price".to_string() })?;
        let new_quantity = i64::try_from(total_qty)
            .map_err(|_| Error::Overflow { operation: "holding quantity".to_string() })?;

        self.quantity = Quantity::from_i64(new_quantity);
        self.average_buy_price = Price::from_i64(average);
        Ok(())
    }

    /// Removes unreserved shares; average cost is unchanged.
    pub fn remove_shares(&mut self, quantity: Quantity) -> Result<()> {
        if !quantity.is_positive() {
            return Err(Error::InvalidQuantity(quantity.to_i64()));
        }
        if quantity > self.available_quantity() {
            return Err(Error::InsufficientShares {
                ticker: self.ticker.clone(),
                requested: quantity,
                available: self.available_quantity(),
            });
        }

        self.quantity = self.quantity - quantity;
        Ok(())
    }

    pub fn reserve_shares(&mut self, quantity: Quantity) -> Result<()> {
        if !quantity.is_positive() {
            return Err(Error::InvalidQuantity(quantity.to_i64()));
        }
        if quantity > self.available_quantity() {
            return Err(Error::InsufficientShares {
                ticker: self.ticker.clone(),
                requested: quantity,
                available: self.available_quantity(),
            });
        }

        self.reserved_quantity = self.reserved_quantity + quantity;
        Ok(())
    }

    pub fn release_shares(&mut self, quantity: Quantity) -> Result<()> {
        if quantity > self.reserved_quantity || quantity.to_i64() < 0 {
            return Err(Error::InsufficientShares {
                ticker: self.ticker.clone(),
                requested: quantity,
                available: self.reserved_quantity,
            });
        }

        self.reserved_quantity = self.reserved_quantity - quantity;
        Ok(())
    }

    /// Market value at `price`
    pub fn value_at(&self, price: Price) -> Result<Balance> {
        self.quantity.checked_notional(price)
    }

    pub fn into_change(self) -> HoldingChange {
        if self.quantity.is_zero() {
            HoldingChange::Delete {
                user_id: self.user_id,
                ticker: self.ticker,
            }
        } else {
            HoldingChange::Upsert(self)
        }
    }
}
