pub mod memory;

pub use memory::{InMemoryAccountStore, InMemoryHoldingStore, InMemoryOrderStore};

use std::sync::Arc;
use crate::interfaces::Stores;

/// Bundle of fresh in-memory stores.
pub fn in_memory_stores() -> Stores {
    Stores::new(
        Arc::new(InMemoryAccountStore::new()),
        Arc::new(InMemoryHoldingStore::new()),
        Arc::new(InMemoryOrderStore::new()),
    )
}
