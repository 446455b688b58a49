use crate::error::Result;
use crate::orders::order::Order;
use crate::types::ids::{OrderId, UserId};
use async_trait::async_trait;

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn load(&self, order_id: OrderId) -> Result<Option<Order>>;
    async fn save(&self, order: &Order) -> Result<()>;
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>>;
    /// Every order that is still PENDING and of type LIMIT
    async fn list_pending_limit(&self) -> Result<Vec<Order>>;
}
