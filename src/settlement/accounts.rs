use crate::error::{Error, Result};
use crate::types::balance::Balance;
use crate::types::ids::UserId;
use crate::types::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

/// One user's cash. Every operation validates before it mutates, so a
/// failed call leaves the account untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    pub available_balance: Balance,
    pub reserved_balance: Balance,
    pub initial_balance: Balance,
    /// Deposits minus withdrawals since opening
    #[serde(default = "Balance::zero")]
    pub net_deposits: Balance,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Account {
    pub fn new(user_id: UserId, initial_balance: Balance, now: Timestamp) -> Self {
        Account {
            user_id,
            available_balance: initial_balance,
            reserved_balance: Balance::zero(),
            initial_balance,
            net_deposits: Balance::zero(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total_cash(&self) -> Balance {
        self.available_balance + self.reserved_balance
    }

    /// Capital the user has put in, which gains are measured against.
    pub fn contributed(&self) -> Result<Balance> {
        self.initial_balance.checked_add(self.net_deposits)
    }

    pub fn touch(&mut self, now: Timestamp) {
        self.updated_at = now;
    }

    /// Move `amount` from available to reserved.
    pub fn reserve(&mut self, amount: Balance) -> Result<()> {
        ensure_non_negative(amount)?;
        if self.available_balance < amount {
            return Err(Error::InsufficientFunds {
                required: amount,
                available: self.available_balance,
            });
        }

        let available = self.available_balance.checked_sub(amount)?;
        let reserved = self.reserved_balance.checked_add(amount)?;
        self.available_balance = available;
        self.reserved_balance = reserved;
        Ok(())
    }

    /// Move `amount` from reserved back to available.
    pub fn release(&mut self, amount: Balance) -> Result<()> {
        ensure_non_negative(amount)?;
        if self.reserved_balance < amount {
            return Err(Error::InsufficientReserved {
                requested: amount,
                reserved: self.reserved_balance,
            });
        }

        let reserved = self.reserved_balance.checked_sub(amount)?;
        let available = self.available_balance.checked_add(amount)?;
        self.available_balance = available;
        self.reserved_balance = reserved;
        Ok(())
    }

    /// Consume `reserved_amount` and pay `actual_amount`; the difference
    /// goes back to available. If the fill cost more than was reserved the
    /// shortfall is taken from available.
    pub fn settle(&mut self, reserved_amount: Balance, actual_amount: Balance) -> Result<()> {
        ensure_non_negative(reserved_amount)?;
        ensure_non_negative(actual_amount)?;
        if self.reserved_balance < reserved_amount {
            return Err(Error::InsufficientReserved {
                requested: reserved_amount,
                reserved: self.reserved_balance,
            });
        }

        let refund = reserved_amount.checked_sub(actual_amount)?;
        let available = self.available_balance.checked_add(refund)?;
        if available.is_negative() {
            return Err(Error::InsufficientFunds {
                required: refund.abs(),
                available: self.available_balance,
            });
        }

        self.reserved_balance = self.reserved_balance.checked_sub(reserved_amount)?;
        self.available_balance = available;
        Ok(())
    }

    pub fn credit(&mut self, amount: Balance) -> Result<()> {
        ensure_non_negative(amount)?;
        self.available_balance = self.available_balance.checked_add(amount)?;
        Ok(())
    }

    pub fn debit(&mut self, amount: Balance) -> Result<()> {
        ensure_non_negative(amount)?;
        if self.available_balance < amount {
            return Err(Error::InsufficientFunds {
                required: amount,
                available: self.available_balance,
            });
        }
        self.available_balance = self.available_balance.checked_sub(amount)?;
        Ok(())
    }

    /// Outside money coming in. Unlike `credit` it counts as contributed capital.
    pub fn deposit(&mut self, amount: Balance) -> Result<()> {
        let net_deposits = self.net_deposits.checked_add(amount)?;
        self.credit(amount)?;
        self.net_deposits = net_deposits;
        Ok(())
    }

    pub fn withdraw(&mut self, amount: Balance) -> Result<()> {
        let net_deposits = self.net_deposits.checked_sub(amount)?;
        self.debit(amount)?;
        self.net_deposits = net_deposits;
        Ok(())
    }
}

fn ensure_non_negative(amount: Balance) -> Result<()> {
    if amount.is_negative() {
        return Err(Error::InvalidAmount(amount));
    }
    Ok(())
}
