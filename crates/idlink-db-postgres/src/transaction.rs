//! PostgreSQL transaction implementation for the merge-and-create phase.
//!
//! The demotion of losing primaries and the re-linking of their secondaries
//! commit as one unit; the transaction automatically rolls back on drop if
//! not explicitly committed.

use async_trait::async_trait;
use sqlx_postgres::PgTransaction;

use idlink_core::{Contact, ContactId, NewContact};
use idlink_storage::{ContactTx, StorageError};

use crate::queries;

/// PostgreSQL transaction wrapper.
///
/// Wrapped in Option so we can take ownership during commit/rollback; sqlx's
/// own Drop issues a ROLLBACK for a transaction that was never completed.
pub struct PostgresTx {
    tx: Option<PgTransaction<'static>>,
}

impl PostgresTx {
    pub fn new(tx: PgTransaction<'static>) -> Self {
        Self { tx: Some(tx) }
    }

    fn tx(&mut self) -> Result<&mut PgTransaction<'static>, StorageError> {
        self.tx.as_mut().ok_or_else(|| {
            StorageError::transaction_error("Transaction already completed (committed or rolled back)")
        })
    }
}

#[async_trait]
impl ContactTx for PostgresTx {
    async fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await.map_err(|e| {
                StorageError::transaction_error(format!("Failed to commit transaction: {}", e))
            })?;
            tracing::debug!("Transaction committed successfully");
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), StorageError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(|e| {
                StorageError::transaction_error(format!("Failed to rollback transaction: {}", e))
            })?;
            tracing::debug!("Transaction rolled back successfully");
        }
        Ok(())
    }

    async fn lock_contact(&mut self, id: ContactId) -> Result<(), StorageError> {
        let tx = self.tx()?;
        queries::lock_contact(&mut **tx, id).await
    }

    async fn demote_to_secondary(
        &mut self,
        id: ContactId,
        new_primary: ContactId,
    ) -> Result<(), StorageError> {
        let tx = self.tx()?;
        queries::demote_to_secondary(&mut **tx, id, new_primary).await
    }

    async fn relink_secondaries(
        &mut self,
        from_primary: ContactId,
        to_primary: ContactId,
    ) -> Result<u64, StorageError> {
        let tx = self.tx()?;
        queries::relink_secondaries(&mut **tx, from_primary, to_primary).await
    }

    async fn create(&mut self, new: &NewContact) -> Result<Contact, StorageError> {
        let tx = self.tx()?;
        queries::insert(&mut **tx, new).await
    }

    async fn group_members(&mut self, primary_id: ContactId) -> Result<Vec<Contact>, StorageError> {
        // Sees uncommitted changes made within this transaction.
        let tx = self.tx()?;
        queries::group_members(&mut **tx, primary_id).await
    }
}

impl Drop for PostgresTx {
    /// sqlx's Transaction Drop implementation issues the actual ROLLBACK.
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::warn!(
                "PostgresTx dropped without explicit commit/rollback - will auto-rollback"
            );
        }
    }
}
