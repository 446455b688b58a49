use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

use crate::error::{Error, Result};
use crate::interfaces::OrderStore;
use crate::orders::order::Order;
use crate::settlement::locks::LockRegistry;
use crate::types::ids::{OrderId, UserId};

/// Identity and locking for orders. State changes themselves are the
/// compare-and-set methods on `Order`, applied while `lock` is held.
pub struct OrderLifecycleManager {
    store: Arc<dyn OrderStore>,
    locks: LockRegistry<OrderId>,
}

impl OrderLifecycleManager {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        OrderLifecycleManager {
            store,
            locks: LockRegistry::new(),
        }
    }

    /// Must be taken before the owning account's lock.
    pub async fn lock(&self, order_id: OrderId) -> OwnedMutexGuard<()> {
        self.locks.acquire(order_id).await
    }

    /// Drops the order's lock entry once no guard holds or waits on it.
    /// Call after the guard from `lock` is gone.
    pub fn retire(&self, order_id: OrderId) {
        self.locks.release_idle(&order_id);
    }

    pub async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.store.load(order_id).await?
            .ok_or(Error::OrderNotFound(order_id))
    }

    /// Orders of other users are reported as missing.
    pub async fn load_for_user(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        match self.store.load(order_id).await? {
            Some(order) if order.user_id == user_id => Ok(order),
            _ => Err(Error::OrderNotFound(order_id)),
        }
    }

    /// Oldest first
    pub async fn pending_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.store.list_by_user(user_id).await?
            .into_iter()
            .filter(|o| o.is_pending())
            .collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    /// Settled orders, most recent first
    pub async fn history_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.store.list_by_user(user_id).await?
            .into_iter()
            .filter(|o| o.status.is_terminal())
            .collect();
        orders.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(orders)
    }

    pub async fn pending_limit_orders(&self) -> Result<Vec<Order>> {
        self.store.list_pending_limit().await
    }

    pub fn tracked_locks(&self) -> usize {
        self.locks.len()
    }
}
