use crate::error::Result;
use crate::settlement::holdings::Holding;
use crate::types::ids::UserId;
use crate::types::ticker::Ticker;
use async_trait::async_trait;

/// Zero-quantity holdings are deleted, never saved.
#[async_trait]
pub trait HoldingStore: Send + Sync {
    async fn load(&self, user_id: UserId, ticker: &Ticker) -> Result<Option<Holding>>;
    async fn list(&self, user_id: UserId) -> Result<Vec<Holding>>;
    async fn save(&self, holding: &Holding) -> Result<()>;
    async fn delete(&self, user_id: UserId, ticker: &Ticker) -> Result<()>;
}
