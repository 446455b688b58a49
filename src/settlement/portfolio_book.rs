use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::interfaces::Stores;
use crate::invariants::InvariantChecks;
use crate::price_infra::PriceOracle;
use crate::settlement::batch::SettlementBatch;
use crate::settlement::holdings::{Holding, HoldingChange};
use crate::settlement::ledger::Ledger;
use crate::settlement::locks::LockRegistry;
use crate::types::balance::Balance;
use crate::types::ids::UserId;
use crate::types::price::Price;
use crate::types::quantity::Quantity;
use crate::types::ticker::Ticker;
use crate::types::timestamp::Clock;

/// Derived numbers for one holding at one observed price.
#[derive(Clone, Debug, PartialEq)]
pub struct Valuation {
    pub total_invested: Balance,
    pub market_value: Option<Balance>,
    pub unrealized_pnl: Option<Balance>,
    pub unrealized_pnl_pct: Option<f64>,
}

impl Valuation {
    pub fn of(holding: &Holding, price: Option<Price>) -> Result<Self> {
        let total_invested = holding.total_invested()?;
        let Some(price) = price else {
            return Ok(Valuation {
                total_invested,
                market_value: None,
                unrealized_pnl: None,
                unrealized_pnl_pct: None,
            });
        };

        let market_value = holding.value_at(price)?;
        let pnl = market_value.checked_sub(total_invested)?;
        Ok(Valuation {
            total_invested,
            market_value: Some(market_value),
            unrealized_pnl: Some(pnl),
            unrealized_pnl_pct: Some(pnl.percent_of(total_invested)),
        })
    }
}

/// Owns every user's holdings. Mutations run under the same per-user lock
/// as `AccountLedger`.
pub struct PortfolioBook {
    stores: Stores,
    locks: Arc<LockRegistry<UserId>>,
    journal: Arc<Ledger>,
    oracle: Arc<dyn PriceOracle>,
    clock: Arc<dyn Clock>,
}

impl PortfolioBook {
    pub fn new(
        stores: Stores,
        locks: Arc<LockRegistry<UserId>>,
        journal: Arc<Ledger>,
        oracle: Arc<dyn PriceOracle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        PortfolioBook { stores, locks, journal, oracle, clock }
    }

    pub async fn load(&self, user_id: UserId, ticker: &Ticker) -> Result<Option<Holding>> {
        self.stores.holdings.load(user_id, ticker).await
    }

    pub async fn holdings(&self, user_id: UserId) -> Result<Vec<Holding>> {
        self.stores.holdings.list(user_id).await
    }

    pub async fn add_shares(
        &self,
        user_id: UserId,
        ticker: &Ticker,
        quantity: Quantity,
        price: Price,
    ) -> Result<Option<Holding>> {
        self.apply(user_id, ticker, |h| h.add_shares(quantity, price)).await
    }

    /// Returns `None` once the last share is gone and the holding deleted.
    pub async fn remove_shares(&self, user_id: UserId, ticker: &Ticker, quantity: Quantity) -> Result<Option<Holding>> {
        self.apply(user_id, ticker, |h| h.remove_shares(quantity)).await
    }

    pub async fn reserve_shares(&self, user_id: UserId, ticker: &Ticker, quantity: Quantity) -> Result<Option<Holding>> {
        self.apply(user_id, ticker, |h| h.reserve_shares(quantity)).await
    }

    pub async fn release_shares(&self, user_id: UserId, ticker: &Ticker, quantity: Quantity) -> Result<Option<Holding>> {
        self.apply(user_id, ticker, |h| h.release_shares(quantity)).await
    }

    /// Market value at the oracle's current price; zero without a holding or a quote.
    pub async fn current_value(&self, user_id: UserId, ticker: &Ticker) -> Result<Balance> {
        let Some(holding) = self.load(user_id, ticker).await? else {
            return Ok(Balance::zero());
        };
        let price = self.oracle.current_price(ticker).await;
        Ok(Valuation::of(&holding, price)?.market_value.unwrap_or_else(Balance::zero))
    }

    pub async fn unrealized_pnl(&self, user_id: UserId, ticker: &Ticker) -> Result<Option<Balance>> {
        let Some(holding) = self.load(user_id, ticker).await? else {
            return Ok(None);
        };
        let price = self.oracle.current_price(ticker).await;
        Ok(Valuation::of(&holding, price)?.unrealized_pnl)
    }

    async fn apply<F>(&self, user_id: UserId, ticker: &Ticker, op: F) -> Result<Option<Holding>>
    where
        F: FnOnce(&mut Holding) -> Result<()>,
    {
        let _guard = self.locks.acquire(user_id).await;
        let now = self.clock.now();
        let before = self.load(user_id, ticker).await?;
        let mut after = before.clone()
            .unwrap_or_else(|| Holding::new(user_id, ticker.clone(), now));
        op(&mut after)?;
        after.updated_at = now;

        let change = after.into_change();
        let result = match &change {
            HoldingChange::Upsert(holding) => Some(holding.clone()),
            HoldingChange::Delete { .. } => None,
        };

        let batch = SettlementBatch::new().with_holding(before, change);
        InvariantChecks::check_batch(&batch)?;
        batch.commit(&self.stores, &self.journal).await?;

        debug!(user_id = %user_id, ticker = %ticker, remaining = ?result.as_ref().map(|h| h.quantity), "Holding updated");
        Ok(result)
    }
}
