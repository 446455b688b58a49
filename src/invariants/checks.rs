use crate::error::{Error, InvariantViolation, Result};
use crate::orders::order::{Order, OrderStatus, OrderType, Side};
use crate::settlement::accounts::Account;
use crate::settlement::holdings::{Holding, HoldingChange};
use crate::settlement::batch::SettlementBatch;
use crate::types::balance::Balance;
use crate::types::price::Price;
use crate::types::quantity::Quantity;

fn violation(invariant: &'static str, details: String) -> Error {
    Error::InvariantViolation(InvariantViolation { invariant, details })
}

/// Post-state checks run on a batch before it is committed.
pub struct InvariantChecks;

impl InvariantChecks {
    pub fn check_batch(batch: &SettlementBatch) -> Result<()> {
        if let Some(account) = batch.account_after() {
            Self::check_account(account)?;
        }
        if let Some(HoldingChange::Upsert(holding)) = batch.holding_change() {
            Self::check_holding(holding)?;
        }
        if let Some(order) = batch.order() {
            Self::check_order(order)?;
        }
        Ok(())
    }

    /// No negative balances
    pub fn check_account(account: &Account) -> Result<()> {
        if account.available_balance.is_negative() {
            return Err(violation(
                "non_negative_available",
                format!("account {} available {}", account.user_id, account.available_balance),
            ));
        }
        if account.reserved_balance.is_negative() {
            return Err(violation(
                "non_negative_reserved",
                format!("account {} reserved {}", account.user_id, account.reserved_balance),
            ));
        }
        Ok(())
    }

    pub fn check_holding(holding: &Holding) -> Result<()> {
        if !holding.quantity.is_positive() {
            return Err(violation(
                "positive_holding",
                format!("{} holds {} of {}", holding.user_id, holding.quantity, holding.ticker),
            ));
        }
        if holding.reserved_quantity < Quantity::zero() || holding.reserved_quantity > holding.quantity {
            return Err(violation(
                "reserved_within_holding",
                format!(
                    "{} reserves {} of {} {}",
                    holding.user_id, holding.reserved_quantity, holding.quantity, holding.ticker
                ),
            ));
        }
        if holding.average_buy_price < Price::zero() {
            return Err(violation(
                "non_negative_cost_basis",
                format!("{} average price {}", holding.ticker, holding.average_buy_price),
            ));
        }
        Ok(())
    }

    pub fn check_order(order: &Order) -> Result<()> {
        if !order.quantity.is_positive() {
            return Err(violation("positive_quantity", format!("order {} quantity {}", order.id, order.quantity)));
        }

        match (order.order_type, order.limit_price) {
            (OrderType::Limit, Some(limit)) if limit.is_positive() => {}
            (OrderType::Market, None) => {}
            (order_type, limit) => {
                return Err(violation(
                    "limit_price_shape",
                    format!("order {} is {:?} with limit {:?}", order.id, order_type, limit),
                ));
            }
        }

        let filled = order.status == OrderStatus::Filled;
        if filled != (order.executed_price.is_some() && order.executed_at.is_some()) {
            return Err(violation(
                "execution_fields",
                format!("order {} is {:?} with executed price {:?}", order.id, order.status, order.executed_price),
            ));
        }

        if order.is_pending() {
            let holds_cash = order.reserved_amount > Balance::zero();
            let holds_shares = order.reserved_shares.is_positive();
            let expected = match (order.order_type, order.side) {
                (OrderType::Limit, Side::Buy) => holds_cash && !holds_shares,
                (OrderType::Limit, Side::Sell) => holds_shares && !holds_cash,
                (OrderType::Market, _) => !holds_cash && !holds_shares,
            };
            if !expected {
                return Err(violation(
                    "pending_reservation",
                    format!(
                        "order {} reserves cash {} and shares {}",
                        order.id, order.reserved_amount, order.reserved_shares
                    ),
                ));
            }
        } else if order.reserved_amount != Balance::zero() || !order.reserved_shares.is_zero() {
            return Err(violation(
                "terminal_holds_nothing",
                format!("order {} is {:?} but still reserves funds", order.id, order.status),
            ));
        }

        Ok(())
    }
}
