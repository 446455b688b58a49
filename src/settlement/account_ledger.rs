use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::info;

use crate::error::{Error, Result};
use crate::interfaces::Stores;
use crate::invariants::InvariantChecks;
use crate::settlement::accounts::Account;
use crate::settlement::batch::SettlementBatch;
use crate::settlement::ledger::{EntryType, Ledger, LedgerEntry};
use crate::settlement::locks::LockRegistry;
use crate::types::balance::Balance;
use crate::types::ids::UserId;
use crate::types::timestamp::Clock;

/// Owns every user's cash. Each operation takes the account lock, applies
/// one `Account` mutation and commits it together with its journal entry.
///
/// The lock registry is shared with `PortfolioBook`: cash and holdings of a
/// user are guarded as one unit.
pub struct AccountLedger {
    stores: Stores,
    locks: Arc<LockRegistry<UserId>>,
    journal: Arc<Ledger>,
    clock: Arc<dyn Clock>,
}

impl AccountLedger {
    pub fn new(
        stores: Stores,
        locks: Arc<LockRegistry<UserId>>,
        journal: Arc<Ledger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        AccountLedger { stores, locks, journal, clock }
    }

    /// Account lock for callers that stage several mutations in one batch.
    pub async fn lock(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        self.locks.acquire(user_id).await
    }

    pub fn journal(&self) -> &Ledger {
        &self.journal
    }

    pub async fn load(&self, user_id: UserId) -> Result<Account> {
        self.stores.accounts.load(user_id).await?
            .ok_or(Error::AccountNotFound(user_id))
    }

    pub async fn open_account(&self, user_id: UserId, initial_cash: Balance) -> Result<Account> {
        if initial_cash.is_negative() {
            return Err(Error::InvalidAmount(initial_cash));
        }

        let _guard = self.locks.acquire(user_id).await;
        if self.stores.accounts.load(user_id).await?.is_some() {
            return Err(Error::AccountAlreadyExists(user_id));
        }

        let now = self.clock.now();
        let account = Account::new(user_id, initial_cash, now);
        self.stores.accounts.save(&account).await?;
        self.journal.record_entries(vec![LedgerEntry::after(
            &account,
            EntryType::Open,
            initial_cash,
            "open",
            now,
        )]);

        info!(user_id = %user_id, initial_cash = %initial_cash, "Account opened");
        Ok(account)
    }

    pub async fn reserve(&self, user_id: UserId, amount: Balance, reference: &str) -> Result<Account> {
        self.apply(user_id, EntryType::Reserve, amount, reference, |a| a.reserve(amount)).await
    }

    pub async fn release(&self, user_id: UserId, amount: Balance, reference: &str) -> Result<Account> {
        self.apply(user_id, EntryType::Release, amount, reference, |a| a.release(amount)).await
    }

    pub async fn settle(
        &self,
        user_id: UserId,
        reserved_amount: Balance,
        actual_amount: Balance,
        reference: &str,
    ) -> Result<Account> {
        self.apply(user_id, EntryType::Settle, actual_amount, reference, |a| {
            a.settle(reserved_amount, actual_amount)
        }).await
    }

    pub async fn credit(&self, user_id: UserId, amount: Balance, reference: &str) -> Result<Account> {
        self.apply(user_id, EntryType::Credit, amount, reference, |a| a.credit(amount)).await
    }

    pub async fn debit(&self, user_id: UserId, amount: Balance, reference: &str) -> Result<Account> {
        self.apply(user_id, EntryType::Debit, amount, reference, |a| a.debit(amount)).await
    }

    pub async fn deposit(&self, user_id: UserId, amount: Balance) -> Result<Account> {
        ensure_positive(amount)?;
        self.apply(user_id, EntryType::Deposit, amount, "deposit", |a| a.deposit(amount)).await
    }

    pub async fn withdraw(&self, user_id: UserId, amount: Balance) -> Result<Account> {
        ensure_positive(amount)?;
        self.apply(user_id, EntryType::Withdrawal, amount, "withdrawal", |a| a.withdraw(amount)).await
    }

    async fn apply<F>(
        &self,
        user_id: UserId,
        entry_type: EntryType,
        amount: Balance,
        reference: &str,
        op: F,
    ) -> Result<Account>
    where
        F: FnOnce(&mut Account) -> Result<()>,
    {
        let _guard = self.locks.acquire(user_id).await;
        let before = self.load(user_id).await?;
        let mut after = before.clone();
        op(&mut after)?;

        let now = self.clock.now();
        after.touch(now);
        let entry = LedgerEntry::after(&after, entry_type, amount, reference, now);

        let batch = SettlementBatch::new()
            .with_account(before, after.clone())
            .with_entry(entry);
        InvariantChecks::check_batch(&batch)?;
        batch.commit(&self.stores, &self.journal).await?;

        Ok(after)
    }
}

fn ensure_positive(amount: Balance) -> Result<()> {
    if amount <= Balance::zero() {
        return Err(Error::InvalidAmount(amount));
    }
    Ok(())
}
