//! In-memory store backends on top of `DashMap`, with a user index and a
//! pending-limit index on orders so the scheduler never scans history.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::collections::HashMap;

use crate::error::Result;
use crate::interfaces::{AccountStore, HoldingStore, OrderStore};
use crate::orders::order::{Order, OrderStatus, OrderType};
use crate::settlement::accounts::Account;
use crate::settlement::holdings::Holding;
use crate::types::ids::{OrderId, UserId};
use crate::types::ticker::Ticker;

#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<UserId, Account>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Account> {
        self.accounts.iter().map(|a| a.value().clone()).collect()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn load(&self, user_id: UserId) -> Result<Option<Account>> {
        Ok(self.accounts.get(&user_id).map(|a| a.value().clone()))
    }

    async fn save(&self, account: &Account) -> Result<()> {
        self.accounts.insert(account.user_id, account.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryHoldingStore {
    holdings: DashMap<UserId, HashMap<Ticker, Holding>>,
}

impl InMemoryHoldingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Holding> {
        self.holdings.iter()
            .flat_map(|book| book.value().values().cloned().collect::<Vec<_>>())
            .collect()
    }
}

#[async_trait]
impl HoldingStore for InMemoryHoldingStore {
    async fn load(&self, user_id: UserId, ticker: &Ticker) -> Result<Option<Holding>> {
        Ok(self.holdings.get(&user_id).and_then(|book| book.get(ticker).cloned()))
    }

    async fn list(&self, user_id: UserId) -> Result<Vec<Holding>> {
        let mut holdings: Vec<Holding> = self.holdings.get(&user_id)
            .map(|book| book.values().cloned().collect())
            .unwrap_or_default();
        holdings.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(holdings)
    }

    async fn save(&self, holding: &Holding) -> Result<()> {
        self.holdings
            .entry(holding.user_id)
            .or_default()
            .insert(holding.ticker.clone(), holding.clone());
        Ok(())
    }

    async fn delete(&self, user_id: UserId, ticker: &Ticker) -> Result<()> {
        if let Some(mut book) = self.holdings.get_mut(&user_id) {
            book.remove(ticker);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: DashMap<OrderId, Order>,
    user_index: DashMap<UserId, DashSet<OrderId>>,
    pending_limit: DashSet<OrderId>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    fn update_indexes(&self, order: &Order) {
        self.user_index
            .entry(order.user_id)
            .or_default()
            .insert(order.id);

        if order.status == OrderStatus::Pending && order.order_type == OrderType::Limit {
            self.pending_limit.insert(order.id);
        } else {
            self.pending_limit.remove(&order.id);
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn load(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.get(&order_id).map(|o| o.value().clone()))
    }

    async fn save(&self, order: &Order) -> Result<()> {
        self.orders.insert(order.id, order.clone());
        self.update_indexes(order);
        Ok(())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let ids: Vec<OrderId> = self.user_index.get(&user_id)
            .map(|set| set.iter().map(|id| *id).collect())
            .unwrap_or_default();

        let mut orders: Vec<Order> = ids.iter()
            .filter_map(|id| self.orders.get(id).map(|o| o.value().clone()))
            .collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn list_pending_limit(&self) -> Result<Vec<Order>> {
        let ids: Vec<OrderId> = self.pending_limit.iter().map(|id| *id).collect();

        let mut orders: Vec<Order> = ids.iter()
            .filter_map(|id| self.orders.get(id).map(|o| o.value().clone()))
            .filter(|o| o.status == OrderStatus::Pending)
            .collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }
}
