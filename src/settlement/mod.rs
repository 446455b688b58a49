pub mod accounts;
pub mod account_ledger;
pub mod batch;
pub mod holdings;
pub mod ledger;
pub mod locks;
pub mod portfolio_book;

pub use account_ledger::AccountLedger;
pub use accounts::Account;
pub use batch::SettlementBatch;
pub use holdings::{Holding, HoldingChange};
pub use ledger::{EntryType, Ledger, LedgerEntry};
pub use locks::LockRegistry;
pub use portfolio_book::{PortfolioBook, Valuation};
