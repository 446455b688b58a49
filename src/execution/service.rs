use std::sync::Arc;
use tracing::{info, warn, Instrument};

use crate::config::{SchedulerConfig, TradingConfig};
use crate::error::{Error, Result};
use crate::execution::engine::{ExecutionEngine, ExecutionSource};
use crate::execution::scheduler::LimitOrderScheduler;
use crate::execution::views::{HoldingView, OrderView, PortfolioSummary};
use crate::interfaces::Stores;
use crate::invariants::InvariantChecks;
use crate::observability::metrics::{ORDERS_PLACED, ORDERS_REJECTED};
use crate::observability::tracing::trace_order_processing;
use crate::orders::lifecycle::OrderLifecycleManager;
use crate::orders::order::{Order, OrderType, Side};
use crate::orders::validator::{OrderRequest, OrderValidator};
use crate::price_infra::PriceOracle;
use crate::settlement::account_ledger::AccountLedger;
use crate::settlement::accounts::Account;
use crate::settlement::batch::SettlementBatch;
use crate::settlement::ledger::{EntryType, Ledger, LedgerEntry};
use crate::settlement::locks::LockRegistry;
use crate::settlement::portfolio_book::PortfolioBook;
use crate::types::balance::Balance;
use crate::types::ids::{OrderId, UserId};
use crate::types::price::Price;
use crate::types::quantity::Quantity;
use crate::types::ticker::Ticker;
use crate::types::timestamp::Clock;

/// Entry point for the outer (HTTP/CLI) layer.
pub struct TradingService {
    config: TradingConfig,
    stores: Stores,
    validator: OrderValidator,
    accounts: Arc<AccountLedger>,
    portfolio: Arc<PortfolioBook>,
    orders: Arc<OrderLifecycleManager>,
    engine: Arc<ExecutionEngine>,
    oracle: Arc<dyn PriceOracle>,
    clock: Arc<dyn Clock>,
}

impl TradingService {
    pub fn new(
        stores: Stores,
        oracle: Arc<dyn PriceOracle>,
        clock: Arc<dyn Clock>,
        config: TradingConfig,
    ) -> Self {
        let account_locks = Arc::new(LockRegistry::new());
        let journal = Arc::new(Ledger::new());

        let accounts = Arc::new(AccountLedger::new(
            stores.clone(),
            account_locks.clone(),
            journal.clone(),
            clock.clone(),
        ));
        let portfolio = Arc::new(PortfolioBook::new(
            stores.clone(),
            account_locks,
            journal,
            oracle.clone(),
            clock.clone(),
        ));
        let orders = Arc::new(OrderLifecycleManager::new(stores.orders.clone()));
        let engine = Arc::new(ExecutionEngine::new(
            stores.clone(),
            accounts.clone(),
            portfolio.clone(),
            orders.clone(),
            clock.clone(),
        ));

        TradingService {
            validator: OrderValidator::new(&config),
            config,
            stores,
            accounts,
            portfolio,
            orders,
            engine,
            oracle,
            clock,
        }
    }

    pub fn scheduler(&self, config: &SchedulerConfig) -> LimitOrderScheduler {
        LimitOrderScheduler::new(
            self.orders.clone(),
            self.engine.clone(),
            self.oracle.clone(),
            config.interval(),
        )
    }

    pub fn engine(&self) -> Arc<ExecutionEngine> {
        self.engine.clone()
    }

    pub fn accounts(&self) -> &AccountLedger {
        &self.accounts
    }

    pub fn portfolio(&self) -> &PortfolioBook {
        &self.portfolio
    }

    pub fn orders(&self) -> &OrderLifecycleManager {
        &self.orders
    }

    // Accounts

    /// Opens an account with `initial_cash`, or the configured default.
    pub async fn open_account(&self, user_id: UserId, initial_cash: Option<Balance>) -> Result<Account> {
        let initial_cash = match initial_cash {
            Some(cash) => cash,
            None => self.config.initial_cash()?,
        };
        self.accounts.open_account(user_id, initial_cash).await
    }

    pub async fn deposit(&self, user_id: UserId, amount: Balance) -> Result<Account> {
        self.accounts.deposit(user_id, amount).await
    }

    pub async fn withdraw(&self, user_id: UserId, amount: Balance) -> Result<Account> {
        self.accounts.withdraw(user_id, amount).await
    }

    pub async fn ledger_entries(&self, user_id: UserId) -> Result<Vec<LedgerEntry>> {
        self.accounts.load(user_id).await?;
        Ok(self.accounts.journal().get_entries_for_user(user_id))
    }

    // Orders

    pub async fn place_buy_order(
        &self,
        user_id: UserId,
        ticker: Ticker,
        quantity: Quantity,
        order_type: OrderType,
        limit_price: Option<Price>,
    ) -> Result<OrderView> {
        self.place_order(OrderRequest {
            user_id,
            ticker,
            side: Side::Buy,
            order_type,
            quantity,
            limit_price,
        }).await
    }

    pub async fn place_sell_order(
        &self,
        user_id: UserId,
        ticker: Ticker,
        quantity: Quantity,
        order_type: OrderType,
        limit_price: Option<Price>,
    ) -> Result<OrderView> {
        self.place_order(OrderRequest {
            user_id,
            ticker,
            side: Side::Sell,
            order_type,
            quantity,
            limit_price,
        }).await
    }

    pub async fn place_order(&self, request: OrderRequest) -> Result<OrderView> {
        self.validator.validate(&request)?;
        self.accounts.load(request.user_id).await?;
        if PriceOracle::instrument(self.oracle.as_ref(), &request.ticker).await.is_none() {
            return Err(Error::TickerNotFound(request.ticker));
        }

        let order_id = OrderId::new();
        let span = trace_order_processing(&order_id, &request.user_id);
        self.place_validated(order_id, request).instrument(span).await
    }

    async fn place_validated(&self, order_id: OrderId, request: OrderRequest) -> Result<OrderView> {
        let result = self.place_guarded(order_id, request).await;
        self.orders.retire(order_id);
        result
    }

    async fn place_guarded(&self, order_id: OrderId, request: OrderRequest) -> Result<OrderView> {
        let _order_guard = self.orders.lock(order_id).await;
        let _account_guard = self.accounts.lock(request.user_id).await;

        let order = match self.reserve_and_record(order_id, &request).await {
            Ok(order) => order,
            Err(e) => {
                ORDERS_REJECTED.with_label_values(&[e.reason()]).inc();
                warn!(user_id = %request.user_id, ticker = %request.ticker, error = %e, "Order refused at placement");
                return Err(e);
            }
        };
        ORDERS_PLACED.with_label_values(&[order.side.as_str(), order.order_type.as_str()]).inc();
        info!(
            user_id = %order.user_id,
            ticker = %order.ticker,
            side = order.side.as_str(),
            order_type = order.order_type.as_str(),
            quantity = %order.quantity,
            limit_price = ?order.limit_price,
            "Order placed"
        );

        let current = self.oracle.current_price(&order.ticker).await;
        let settled = match (order.order_type, current) {
            (OrderType::Market, None) => {
                let err = Error::PriceUnavailable(order.ticker.clone());
                self.engine.reject_locked(&order, &err).await?;
                return Err(err);
            }
            (OrderType::Market, Some(price)) => {
                self.engine.execute_locked(order, price, ExecutionSource::Immediate).await?
            }
            (OrderType::Limit, Some(price)) if order.trigger_satisfied(price) => {
                self.engine.execute_locked(order, price, ExecutionSource::Immediate).await?
            }
            (OrderType::Limit, _) => order,
        };

        Ok(OrderView::from(settled))
    }

    /// Persists the PENDING order together with whatever it holds back:
    /// cash for a limit buy, shares for a limit sell.
    async fn reserve_and_record(&self, order_id: OrderId, request: &OrderRequest) -> Result<Order> {
        let now = self.clock.now();
        let mut order = Order::new(
            order_id,
            request.user_id,
            request.ticker.clone(),
            request.side,
            request.order_type,
            request.quantity,
            request.limit_price,
            now,
        );
        let mut batch = SettlementBatch::new();

        match (request.side, request.order_type, request.limit_price) {
            (Side::Buy, OrderType::Limit, Some(limit)) => {
                let amount = request.quantity.checked_notional(limit)?;
                let before = self.accounts.load(request.user_id).await?;
                let mut after = before.clone();
                after.reserve(amount)?;
                after.touch(now);
                order.reserved_amount = amount;

                let entry = LedgerEntry::after(&after, EntryType::Reserve, amount, order_id.to_string(), now);
                batch = batch.with_account(before, after).with_entry(entry);
            }
            (Side::Sell, order_type, _) => {
                let holding = self.portfolio.load(request.user_id, &request.ticker).await?;
                let available = holding.as_ref()
                    .map(|h| h.available_quantity())
                    .unwrap_or_else(Quantity::zero);
                if request.quantity > available {
                    return Err(Error::InsufficientShares {
                        ticker: request.ticker.clone(),
                        requested: request.quantity,
                        available,
                    });
                }

                if order_type == OrderType::Limit {
                    if let Some(before) = holding {
                        let mut after = before.clone();
                        after.reserve_shares(request.quantity)?;
                        after.updated_at = now;
                        order.reserved_shares = request.quantity;
                        batch = batch.with_holding(Some(before), after.into_change());
                    }
                }
            }
            _ => {}
        }

        let batch = batch.with_order(order.clone());
        InvariantChecks::check_batch(&batch)?;
        batch.commit(&self.stores, self.accounts.journal()).await?;
        Ok(order)
    }

    /// Only PENDING orders can be cancelled; anything else is `AlreadyTerminal`.
    pub async fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> Result<OrderView> {
        let result = self.cancel_guarded(user_id, order_id).await;
        self.orders.retire(order_id);
        result
    }

    async fn cancel_guarded(&self, user_id: UserId, order_id: OrderId) -> Result<OrderView> {
        let _order_guard = self.orders.lock(order_id).await;
        let order = self.orders.load_for_user(user_id, order_id).await?;
        if order.status.is_terminal() {
            return Err(Error::AlreadyTerminal {
                order_id,
                status: order.status,
            });
        }

        let _account_guard = self.accounts.lock(user_id).await;
        let cancelled = self.engine.cancel_locked(&order).await?;
        Ok(OrderView::from(cancelled))
    }

    // Queries

    pub async fn get_order(&self, user_id: UserId, order_id: OrderId) -> Result<OrderView> {
        let order = self.orders.load_for_user(user_id, order_id).await?;
        Ok(OrderView::from(order))
    }

    pub async fn get_pending_orders(&self, user_id: UserId) -> Result<Vec<OrderView>> {
        let orders = self.orders.pending_for_user(user_id).await?;
        Ok(orders.iter().map(OrderView::from).collect())
    }

    pub async fn get_order_history(&self, user_id: UserId) -> Result<Vec<OrderView>> {
        let orders = self.orders.history_for_user(user_id).await?;
        Ok(orders.iter().map(OrderView::from).collect())
    }

    /// Cash and holdings are read under the account lock so they agree;
    /// prices are looked up after it is released.
    pub async fn get_portfolio_summary(&self, user_id: UserId) -> Result<PortfolioSummary> {
        let (account, holdings) = {
            let _guard = self.accounts.lock(user_id).await;
            let account = self.accounts.load(user_id).await?;
            let holdings = self.portfolio.holdings(user_id).await?;
            (account, holdings)
        };

        let tickers: Vec<Ticker> = holdings.iter().map(|h| h.ticker.clone()).collect();
        let prices = self.oracle.current_prices(&tickers).await;

        let mut views = Vec::with_capacity(holdings.len());
        for holding in &holdings {
            let name = PriceOracle::instrument(self.oracle.as_ref(), &holding.ticker).await
                .map(|i| i.name)
                .unwrap_or_else(|| holding.ticker.to_string());
            views.push(HoldingView::new(holding, name, prices.get(&holding.ticker).copied())?);
        }

        PortfolioSummary::new(&account, views)
    }
}
