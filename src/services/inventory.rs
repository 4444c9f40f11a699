//! Inventory ledger: copy counts moving with loans, returns and sales

use super::Store;
use crate::error::AppResult;

#[derive(Clone)]
pub struct InventoryLedger {
    store: Store,
}

impl InventoryLedger {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Take one copy of a book. Returns `false` when none is left; the
    /// amount is never decremented below zero.
    pub async fn reserve(&self, book_id: i32) -> AppResult<bool> {
        let reserved = self.store.reserve_copy(book_id).await?;
        if reserved {
            tracing::debug!(book_id, "Reserved one copy");
        } else {
            tracing::debug!(book_id, "No copy left to reserve");
        }
        Ok(reserved)
    }

    /// Put one copy back
    pub async fn release(&self, book_id: i32) -> AppResult<()> {
        self.store.release_copy(book_id).await?;
        tracing::debug!(book_id, "Released one copy");
        Ok(())
    }

    /// Undo a reservation whose operation failed afterwards. A failure here is
    /// logged: the caller is already returning the original error.
    pub async fn release_after_failure(&self, book_id: i32) {
        if let Err(e) = self.store.release_copy(book_id).await {
            tracing::error!(book_id, error = %e, "Could not release reserved copy, inventory is one short");
        }
    }

    /// Record that a reserved copy will never come back
    pub fn write_off(&self, book_id: i32, loan_id: i32, reason: &str) {
        tracing::warn!(book_id, loan_id, reason, "Copy written off");
    }
}
