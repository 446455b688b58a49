use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::interfaces::Stores;
use crate::invariants::InvariantChecks;
use crate::observability::metrics::{EXECUTION_LATENCY, ORDERS_CANCELLED, ORDERS_FILLED, ORDERS_REJECTED};
use crate::orders::lifecycle::OrderLifecycleManager;
use crate::orders::order::{Order, OrderType, Side};
use crate::settlement::account_ledger::AccountLedger;
use crate::settlement::batch::SettlementBatch;
use crate::settlement::holdings::Holding;
use crate::settlement::ledger::{EntryType, LedgerEntry};
use crate::settlement::portfolio_book::PortfolioBook;
use crate::types::balance::Balance;
use crate::types::ids::OrderId;
use crate::types::price::Price;
use crate::types::quantity::Quantity;
use crate::types::timestamp::Clock;

/// Who asked for the execution. Decides what a failure does to the order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionSource {
    /// Placement path: a failure rejects the order and reaches the caller.
    Immediate,
    /// Scheduler path: a failure leaves the order pending for the next tick.
    Scheduled,
}

impl ExecutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionSource::Immediate => "immediate",
            ExecutionSource::Scheduled => "scheduled",
        }
    }
}

/// Applies a fill to cash, holdings and order status as one batch.
pub struct ExecutionEngine {
    stores: Stores,
    accounts: Arc<AccountLedger>,
    portfolio: Arc<PortfolioBook>,
    orders: Arc<OrderLifecycleManager>,
    clock: Arc<dyn Clock>,
}

impl ExecutionEngine {
    pub fn new(
        stores: Stores,
        accounts: Arc<AccountLedger>,
        portfolio: Arc<PortfolioBook>,
        orders: Arc<OrderLifecycleManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ExecutionEngine { stores, accounts, portfolio, orders, clock }
    }

    /// Execute `order_id` at `observed`, taking the order lock then the
    /// account lock.
    pub async fn execute(&self, order_id: OrderId, observed: Price, source: ExecutionSource) -> Result<Order> {
        let result = self.execute_guarded(order_id, observed, source).await;
        self.orders.retire(order_id);
        result
    }

    async fn execute_guarded(&self, order_id: OrderId, observed: Price, source: ExecutionSource) -> Result<Order> {
        let _order_guard = self.orders.lock(order_id).await;
        let order = self.orders.load(order_id).await?;
        let _account_guard = self.accounts.lock(order.user_id).await;
        self.execute_locked(order, observed, source).await
    }

    /// Caller holds the order lock and the account lock.
    pub(crate) async fn execute_locked(&self, order: Order, observed: Price, source: ExecutionSource) -> Result<Order> {
        let timer = EXECUTION_LATENCY.start_timer();
        let result = self.fill(&order, observed).await;
        timer.observe_duration();

        match result {
            Ok(filled) => {
                ORDERS_FILLED.with_label_values(&[filled.side.as_str(), source.as_str()]).inc();
                info!(
                    order_id = %filled.id,
                    user_id = %filled.user_id,
                    ticker = %filled.ticker,
                    price = %observed,
                    quantity = %filled.quantity,
                    source = source.as_str(),
                    "Order filled"
                );
                Ok(filled)
            }
            Err(e @ (Error::ConcurrencyConflict { .. } | Error::AlreadyTerminal { .. })) => Err(e),
            Err(e) if source == ExecutionSource::Scheduled => Err(e),
            Err(e) => {
                if let Err(reject_err) = self.reject_locked(&order, &e).await {
                    error!(order_id = %order.id, error = %reject_err, "Failed to reject order after execution failure");
                }
                Err(e)
            }
        }
    }

    /// Moves a pending order to REJECTED and hands back its reservations.
    pub(crate) async fn reject_locked(&self, order: &Order, reason: &Error) -> Result<Order> {
        let mut rejected = order.clone();
        rejected.reject(reason.to_string(), self.clock.now())?;
        self.close_locked(order, rejected.clone()).await?;

        ORDERS_REJECTED.with_label_values(&[reason.reason()]).inc();
        warn!(order_id = %order.id, user_id = %order.user_id, reason = %reason, "Order rejected");
        Ok(rejected)
    }

    /// Moves a pending order to CANCELLED and hands back its reservations.
    pub(crate) async fn cancel_locked(&self, order: &Order) -> Result<Order> {
        let mut cancelled = order.clone();
        cancelled.cancel(self.clock.now())?;
        self.close_locked(order, cancelled.clone()).await?;

        ORDERS_CANCELLED.inc();
        info!(order_id = %order.id, user_id = %order.user_id, "Order cancelled");
        Ok(cancelled)
    }

    async fn close_locked(&self, order: &Order, closed: Order) -> Result<()> {
        let now = closed.updated_at;
        let mut batch = SettlementBatch::new();

        if order.reserved_amount > Balance::zero() {
            let before = self.accounts.load(order.user_id).await?;
            let mut after = before.clone();
            after.release(order.reserved_amount)?;
            after.touch(now);
            let entry = LedgerEntry::after(&after, EntryType::Release, order.reserved_amount, order.id.to_string(), now);
            batch = batch.with_account(before, after).with_entry(entry);
        }

        if order.reserved_shares.is_positive() {
            if let Some(before) = self.portfolio.load(order.user_id, &order.ticker).await? {
                let mut after = before.clone();
                after.release_shares(order.reserved_shares)?;
                after.updated_at = now;
                batch = batch.with_holding(Some(before), after.into_change());
            }
        }

        let batch = batch.with_order(closed);
        InvariantChecks::check_batch(&batch)?;
        batch.commit(&self.stores, self.accounts.journal()).await
    }

    async fn fill(&self, order: &Order, observed: Price) -> Result<Order> {
        let now = self.clock.now();
        let mut filled = order.clone();
        filled.fill(observed, now)?;

        if !observed.is_positive() {
            return Err(Error::InvalidPrice(observed));
        }
        if let (OrderType::Limit, Some(limit)) = (order.order_type, order.limit_price) {
            if !order.trigger_satisfied(observed) {
                return Err(Error::LimitNotReached {
                    order_id: order.id,
                    observed,
                    limit,
                });
            }
        }

        let total = order.quantity.checked_notional(observed)?;
        let account_before = self.accounts.load(order.user_id).await?;
        let holding_before = self.portfolio.load(order.user_id, &order.ticker).await?;
        let mut account = account_before.clone();

        let (entry_type, mut holding) = match order.side {
            Side::Buy => {
                let entry_type = match order.order_type {
                    OrderType::Limit => {
                        account.settle(order.reserved_amount, total)?;
                        EntryType::Settle
                    }
                    OrderType::Market => {
                        account.debit(total)?;
                        EntryType::Debit
                    }
                };
                let mut holding = holding_before.clone()
                    .unwrap_or_else(|| Holding::new(order.user_id, order.ticker.clone(), now));
                holding.add_shares(order.quantity, observed)?;
                (entry_type, holding)
            }
            Side::Sell => {
                let Some(mut holding) = holding_before.clone() else {
                    return Err(Error::InsufficientShares {
                        ticker: order.ticker.clone(),
                        requested: order.quantity,
                        available: Quantity::zero(),
                    });
                };
                if order.reserved_shares.is_positive() {
                    holding.release_shares(order.reserved_shares)?;
                }
                holding.remove_shares(order.quantity)?;
                account.credit(total)?;
                (EntryType::Credit, holding)
            }
        };

        account.touch(now);
        holding.updated_at = now;

        let entry = LedgerEntry::after(&account, entry_type, total, order.id.to_string(), now);
        let batch = SettlementBatch::new()
            .with_account(account_before, account)
            .with_holding(holding_before, holding.into_change())
            .with_order(filled.clone())
            .with_entry(entry);

        InvariantChecks::check_batch(&batch)?;
        batch.commit(&self.stores, self.accounts.journal()).await?;
        Ok(filled)
    }
}
