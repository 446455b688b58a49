use crate::error::Result;
use crate::interfaces::Stores;
use crate::orders::order::Order;
use crate::settlement::accounts::Account;
use crate::settlement::holdings::{Holding, HoldingChange};
use crate::settlement::ledger::{Ledger, LedgerEntry};

/// Every write one operation makes for a single account, applied together.
///
/// Must be committed while the account lock (and the order lock, if an
/// order is included) is held. Writes go account, holding, order; if one
/// fails the earlier ones are restored from their `before` images.
#[derive(Debug, Default)]
pub struct SettlementBatch {
    account: Option<(Account, Account)>,
    holding: Option<(Option<Holding>, HoldingChange)>,
    order: Option<Order>,
    entries: Vec<LedgerEntry>,
}

impl SettlementBatch {
    pub fn new() -> Self {
        SettlementBatch::default()
    }

    pub fn with_account(mut self, before: Account, after: Account) -> Self {
        if before != after {
            self.account = Some((before, after));
        }
        self
    }

    pub fn with_holding(mut self, before: Option<Holding>, change: HoldingChange) -> Self {
        let unchanged = matches!((&before, &change), (Some(b), HoldingChange::Upsert(a)) if b == a);
        if !unchanged {
            self.holding = Some((before, change));
        }
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_entry(mut self, entry: LedgerEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn account_after(&self) -> Option<&Account> {
        self.account.as_ref().map(|(_, after)| after)
    }

    pub fn holding_change(&self) -> Option<&HoldingChange> {
        self.holding.as_ref().map(|(_, change)| change)
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub async fn commit(self, stores: &Stores, ledger: &Ledger) -> Result<()> {
        if let Some((_, after)) = &self.account {
            stores.accounts.save(after).await?;
        }

        if let Some((_, change)) = &self.holding {
            if let Err(e) = apply_holding(stores, change).await {
                self.restore_account(stores).await;
                return Err(e);
            }
        }

        if let Some(order) = &self.order {
            if let Err(e) = stores.orders.save(order).await {
                self.restore_holding(stores).await;
                self.restore_account(stores).await;
                return Err(e);
            }
        }

        ledger.record_entries(self.entries);
        Ok(())
    }

    async fn restore_account(&self, stores: &Stores) {
        if let Some((before, _)) = &self.account {
            if let Err(e) = stores.accounts.save(before).await {
                tracing::error!("Failed to restore account {}: {}", before.user_id, e);
            }
        }
    }

    async fn restore_holding(&self, stores: &Stores) {
        let Some((before, change)) = &self.holding else {
            return;
        };

        let restored = match (before, change) {
            (Some(previous), _) => stores.holdings.save(previous).await,
            (None, HoldingChange::Upsert(h)) => stores.holdings.delete(h.user_id, &h.ticker).await,
            (None, HoldingChange::Delete { .. }) => Ok(()),
        };

        if let Err(e) = restored {
            tracing::error!("Failed to restore holding: {}", e);
        }
    }
}

async fn apply_holding(stores: &Stores, change: &HoldingChange) -> Result<()> {
    match change {
        HoldingChange::Upsert(holding) => stores.holdings.save(holding).await,
        HoldingChange::Delete { user_id, ticker } => stores.holdings.delete(*user_id, ticker).await,
    }
}
