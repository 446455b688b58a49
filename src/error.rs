use thiserror::Error;
use crate::orders::order::OrderStatus;
use crate::types::balance::Balance;
use crate::types::ids::{OrderId, UserId};
use crate::types::price::Price;
use crate::types::quantity::Quantity;
use crate::types::ticker::Ticker;

#[derive(Error, Debug)]
pub enum Error {
    // Validation Errors
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    #[error("Invalid price: {0}")]
    InvalidPrice(Price),

    #[error("Invalid amount: {0}")]
    InvalidAmount(Balance),

    #[error("Limit order requires price")]
    LimitOrderRequiresPrice,

    #[error("Market order cannot carry a limit price")]
    MarketOrderHasPrice,

    #[error("Above maximum order size: quantity={quantity}, max={max}")]
    AboveMaxOrderSize {
        quantity: Quantity,
        max: Quantity,
    },

    // Lookup Errors
    #[error("Account not found: {0}")]
    AccountNotFound(UserId),

    #[error("Ticker not found: {0}")]
    TickerNotFound(Ticker),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(UserId),

    // Settlement Errors
    #[error("Insufficient funds: required={required}, available={available}")]
    InsufficientFunds {
        required: Balance,
        available: Balance,
    },

    #[error("Insufficient reserved balance: requested={requested}, reserved={reserved}")]
    InsufficientReserved {
        requested: Balance,
        reserved: Balance,
    },

    #[error("Insufficient shares of {ticker}: requested={requested}, available={available}")]
    InsufficientShares {
        ticker: Ticker,
        requested: Quantity,
        available: Quantity,
    },

    // Pricing Errors
    #[error("Price unavailable for {0}")]
    PriceUnavailable(Ticker),

    #[error("Limit not reached for order {order_id}: observed={observed}, limit={limit}")]
    LimitNotReached {
        order_id: OrderId,
        observed: Price,
        limit: Price,
    },

    // Lifecycle Errors
    #[error("Concurrency conflict on order {order_id}: expected {expected:?}, found {actual:?}")]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    #[error("Order {order_id} is already {status:?}")]
    AlreadyTerminal {
        order_id: OrderId,
        status: OrderStatus,
    },

    // Invariant Errors
    #[error("Invariant violation: {0}")]
    InvariantViolation(InvariantViolation),

    // System Errors
    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("Overflow in {operation}")]
    Overflow { operation: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification handed to the outer (HTTP/CLI) layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    InsufficientFunds,
    InsufficientShares,
    PriceUnavailable,
    ConcurrencyConflict,
    AlreadyTerminal,
    Internal,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidQuantity(_)
            | Error::InvalidPrice(_)
            | Error::InvalidAmount(_)
            | Error::LimitOrderRequiresPrice
            | Error::MarketOrderHasPrice
            | Error::AboveMaxOrderSize { .. } => ErrorCategory::Validation,
            Error::AccountNotFound(_)
            | Error::TickerNotFound(_)
            | Error::OrderNotFound(_) => ErrorCategory::NotFound,
            Error::AccountAlreadyExists(_) => ErrorCategory::Conflict,
            Error::InsufficientFunds { .. } => ErrorCategory::InsufficientFunds,
            Error::InsufficientShares { .. } => ErrorCategory::InsufficientShares,
            Error::PriceUnavailable(_) | Error::LimitNotReached { .. } => ErrorCategory::PriceUnavailable,
            Error::ConcurrencyConflict { .. } => ErrorCategory::ConcurrencyConflict,
            Error::AlreadyTerminal { .. } => ErrorCategory::AlreadyTerminal,
            Error::InsufficientReserved { .. }
            | Error::InvariantViolation(_)
            | Error::StoreError(_)
            | Error::ConfigError(_)
            | Error::TaskFailed(_)
            | Error::Overflow { .. }
            | Error::IoError(_) => ErrorCategory::Internal,
        }
    }

    /// Short label used for metrics and structured logs
    pub fn reason(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Validation => "validation",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::InsufficientFunds => "insufficient_funds",
            ErrorCategory::InsufficientShares => "insufficient_shares",
            ErrorCategory::PriceUnavailable => "price_unavailable",
            ErrorCategory::ConcurrencyConflict => "concurrency_conflict",
            ErrorCategory::AlreadyTerminal => "already_terminal",
            ErrorCategory::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvariantViolation {
    pub invariant: &'static str,
    pub details: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.details)
    }
}
