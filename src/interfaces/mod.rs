pub mod account_store;
pub mod holding_store;
pub mod order_store;

pub use account_store::AccountStore;
pub use holding_store::HoldingStore;
pub use order_store::OrderStore;

use std::sync::Arc;

/// The persistence collaborators, constructed once and shared by reference.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub holdings: Arc<dyn HoldingStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl Stores {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        holdings: Arc<dyn HoldingStore>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Stores { accounts, holdings, orders }
    }
}
