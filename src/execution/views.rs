use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::orders::order::{Order, OrderStatus, OrderType, Side};
use crate::settlement::accounts::Account;
use crate::settlement::holdings::Holding;
use crate::settlement::portfolio_book::Valuation;
use crate::types::balance::Balance;
use crate::types::ids::{OrderId, UserId};
use crate::types::price::Price;
use crate::types::quantity::Quantity;
use crate::types::ticker::Ticker;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub ticker: Ticker,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub quantity: Quantity,
    pub limit_price: Option<Price>,
    pub status: OrderStatus,
    pub executed_price: Option<Price>,
    pub total_value: Option<Balance>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        OrderView {
            id: order.id,
            ticker: order.ticker.clone(),
            side: order.side,
            order_type: order.order_type,
            quantity: order.quantity,
            limit_price: order.limit_price,
            status: order.status,
            executed_price: order.executed_price,
            total_value: order.total_value(),
            rejection_reason: order.rejection_reason.clone(),
            created_at: order.created_at.to_datetime(),
            executed_at: order.executed_at.map(|t| t.to_datetime()),
        }
    }
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        OrderView::from(&order)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HoldingView {
    pub ticker: Ticker,
    pub name: String,
    pub quantity: Quantity,
    pub reserved_quantity: Quantity,
    pub average_buy_price: Price,
    pub total_invested: Balance,
    pub current_price: Option<Price>,
    pub market_value: Option<Balance>,
    pub unrealized_pnl: Option<Balance>,
    pub unrealized_pnl_pct: Option<f64>,
}

impl HoldingView {
    pub fn new(holding: &Holding, name: String, current_price: Option<Price>) -> Result<Self> {
        let valuation = Valuation::of(holding, current_price)?;
        Ok(HoldingView {
            ticker: holding.ticker.clone(),
            name,
            quantity: holding.quantity,
            reserved_quantity: holding.reserved_quantity,
            average_buy_price: holding.average_buy_price,
            total_invested: valuation.total_invested,
            current_price,
            market_value: valuation.market_value,
            unrealized_pnl: valuation.unrealized_pnl,
            unrealized_pnl_pct: valuation.unrealized_pnl_pct,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub user_id: UserId,
    pub holdings: Vec<HoldingView>,
    /// Cash not committed to pending orders
    pub cash_balance: Balance,
    pub reserved_balance: Balance,
    /// Holdings without a quote contribute nothing
    pub stock_value: Balance,
    pub total_value: Balance,
    pub initial_balance: Balance,
    pub net_deposits: Balance,
    /// Measured against opening cash plus net deposits
    pub total_gain_loss: Balance,
    pub total_gain_loss_pct: f64,
}

impl PortfolioSummary {
    pub fn new(account: &Account, holdings: Vec<HoldingView>) -> Result<Self> {
        let stock_value = holdings.iter()
            .filter_map(|h| h.market_value)
            .try_fold(Balance::zero(), |acc, v| acc.checked_add(v))?;
        let total_value = account.total_cash().checked_add(stock_value)?;
        let contributed = account.contributed()?;
        let total_gain_loss = total_value.checked_sub(contributed)?;

        Ok(PortfolioSummary {
            user_id: account.user_id,
            holdings,
            cash_balance: account.available_balance,
            reserved_balance: account.reserved_balance,
            stock_value,
            total_value,
            initial_balance: account.initial_balance,
            net_deposits: account.net_deposits,
            total_gain_loss,
            total_gain_loss_pct: total_gain_loss.percent_of(contributed),
        })
    }
}
