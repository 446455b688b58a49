use crate::error::Result;
use crate::settlement::accounts::Account;
use crate::types::ids::UserId;
use async_trait::async_trait;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn load(&self, user_id: UserId) -> Result<Option<Account>>;
    async fn save(&self, account: &Account) -> Result<()>;
}
