use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use crate::settlement::accounts::Account;
use crate::types::balance::Balance;
use crate::types::ids::{EntryId, UserId};
use crate::types::timestamp::Timestamp;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: EntryId,
    pub timestamp: Timestamp,
    pub entry_type: EntryType,
    pub user_id: UserId,
    pub amount: Balance,
    pub available_after: Balance,
    pub reserved_after: Balance,
    pub reference: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    Open,
    Deposit,
    Withdrawal,
    Reserve,
    Release,
    Settle,
    Debit,
    Credit,
}

impl LedgerEntry {
    /// Snapshot `account` after a mutation of `amount`
    pub fn after(
        account: &Account,
        entry_type: EntryType,
        amount: Balance,
        reference: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        LedgerEntry {
            entry_id: EntryId::new(),
            timestamp,
            entry_type,
            user_id: account.user_id,
            amount,
            available_after: account.available_balance,
            reserved_after: account.reserved_balance,
            reference: reference.into(),
        }
    }
}

/// Append-only journal of cash movements.
pub struct Ledger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn record_entries(&self, entries: Vec<LedgerEntry>) {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.extend(entries);
    }

    pub fn get_entries_for_user(&self, user_id: UserId) -> Vec<LedgerEntry> {
        self.entries.lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
