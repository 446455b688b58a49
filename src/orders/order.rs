use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::types::balance::Balance;
use crate::types::ids::{OrderId, UserId};
use crate::types::price::Price;
use crate::types::quantity::Quantity;
use crate::types::ticker::Ticker;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// PENDING is the only state with outgoing edges.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Filled)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Pending, OrderStatus::Rejected)
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub ticker: Ticker,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Quantity,
    pub limit_price: Option<Price>,
    pub status: OrderStatus,
    /// Cash held against a pending limit buy
    pub reserved_amount: Balance,
    /// Shares held against a pending limit sell
    pub reserved_shares: Quantity,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub executed_at: Option<Timestamp>,
    pub executed_price: Option<Price>,
    pub rejection_reason: Option<String>,
}

impl Order {
    pub fn new(
        id: OrderId,
        user_id: UserId,
        ticker: Ticker,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        limit_price: Option<Price>,
        created_at: Timestamp,
    ) -> Self {
        Order {
            id,
            user_id,
            ticker,
            side,
            order_type,
            quantity,
            limit_price,
            status: OrderStatus::Pending,
            reserved_amount: Balance::zero(),
            reserved_shares: Quantity::zero(),
            created_at,
            updated_at: created_at,
            executed_at: None,
            executed_price: None,
            rejection_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn is_limit(&self) -> bool {
        self.order_type == OrderType::Limit
    }

    /// Buy-limit fills at or below the limit, sell-limit at or above it.
    pub fn trigger_satisfied(&self, observed: Price) -> bool {
        match (self.order_type, self.limit_price) {
            (OrderType::Market, _) => true,
            (OrderType::Limit, Some(limit)) => match self.side {
                Side::Buy => observed <= limit,
                Side::Sell => observed >= limit,
            },
            (OrderType::Limit, None) => false,
        }
    }

    /// Executed notional, present once filled
    pub fn total_value(&self) -> Option<Balance> {
        self.executed_price
            .and_then(|price| self.quantity.checked_notional(price).ok())
    }

    /// Compare-and-set on `status`.
    pub fn transition(&mut self, expected: OrderStatus, next: OrderStatus, at: Timestamp) -> Result<()> {
        if self.status != expected {
            return Err(Error::ConcurrencyConflict {
                order_id: self.id,
                expected,
                actual: self.status,
            });
        }

        if !self.status.can_transition_to(next) {
            return Err(Error::AlreadyTerminal {
                order_id: self.id,
                status: self.status,
            });
        }

        self.status = next;
        self.updated_at = at;
        Ok(())
    }

    pub fn fill(&mut self, price: Price, at: Timestamp) -> Result<()> {
        self.transition(OrderStatus::Pending, OrderStatus::Filled, at)?;
        self.executed_price = Some(price);
        self.executed_at = Some(at);
        self.reserved_amount = Balance::zero();
        self.reserved_shares = Quantity::zero();
        Ok(())
    }

    pub fn reject(&mut self, reason: impl Into<String>, at: Timestamp) -> Result<()> {
        self.transition(OrderStatus::Pending, OrderStatus::Rejected, at)?;
        self.rejection_reason = Some(reason.into());
        self.reserved_amount = Balance::zero();
        self.reserved_shares = Quantity::zero();
        Ok(())
    }

    /// Cancelling a settled order is an error so callers can tell the two apart.
    pub fn cancel(&mut self, at: Timestamp) -> Result<()> {
        if self.status.is_terminal() {
            return Err(Error::AlreadyTerminal {
                order_id: self.id,
                status: self.status,
            });
        }
        self.transition(OrderStatus::Pending, OrderStatus::Cancelled, at)?;
        self.reserved_amount = Balance::zero();
        self.reserved_shares = Quantity::zero();
        Ok(())
    }
}
