//! Storage traits for the contact store abstraction layer.
//!
//! These traits define the contract every backend must implement: exact-match
//! multi-field lookup with OR semantics, point creation, conditional update,
//! and transactional grouping of the merge writes.

use async_trait::async_trait;

use idlink_core::{Contact, ContactId, NewContact};

use crate::error::StorageError;

/// The main storage trait that all contact store backends implement.
///
/// All reads exclude soft-deleted rows and return contacts ordered by
/// `(created_at, id)` ascending, so "oldest wins" tie-breaks are total.
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Finds all contacts whose email equals `email` OR whose phone number
    /// equals `phone`. A condition is included only when the corresponding
    /// argument is supplied; calling with both `None` returns an
    /// `InvalidContact` error.
    async fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Vec<Contact>, StorageError>;

    /// Fetches the contacts with the given ids, in creation order. Missing
    /// and soft-deleted ids are silently skipped.
    async fn find_by_ids(&self, ids: &[ContactId]) -> Result<Vec<Contact>, StorageError>;

    /// Fetches a full group: the contact with `primary_id` plus every
    /// contact whose `linked_id` points at it, in creation order.
    async fn group_members(&self, primary_id: ContactId) -> Result<Vec<Contact>, StorageError>;

    /// Creates a new contact row. The backend assigns the id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidContact` if both identifying fields are
    /// absent.
    async fn create(&self, new: &NewContact) -> Result<Contact, StorageError>;

    /// Begins a new transaction for the merge-and-create phase.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::TransactionError` if a transaction cannot be
    /// started.
    async fn begin(&self) -> Result<Box<dyn ContactTx>, StorageError>;

    /// Returns whether this backend provides real transactional isolation.
    fn supports_transactions(&self) -> bool;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// A transaction scoping the writes of one merge.
///
/// The demotion of losing primaries and the re-linking of their secondaries
/// must commit or roll back as a single unit; a partial merge would leave
/// contacts split between old and new primary references. Dropping an open
/// transaction rolls it back.
#[async_trait]
pub trait ContactTx: Send + Sync {
    /// Commits all operations in this transaction.
    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    /// Rolls back all operations in this transaction.
    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;

    /// Takes a row-level lock on the given contact for the remainder of the
    /// transaction. Called on the surviving primary before the merge writes
    /// so concurrent resolves against the same group serialize.
    async fn lock_contact(&mut self, id: ContactId) -> Result<(), StorageError>;

    /// Demotes a primary: sets `link_precedence = secondary` and
    /// `linked_id = new_primary`.
    async fn demote_to_secondary(
        &mut self,
        id: ContactId,
        new_primary: ContactId,
    ) -> Result<(), StorageError>;

    /// Re-points every contact with `linked_id = from_primary` to
    /// `to_primary`, preserving the flat two-level hierarchy. Returns the
    /// number of rows updated.
    async fn relink_secondaries(
        &mut self,
        from_primary: ContactId,
        to_primary: ContactId,
    ) -> Result<u64, StorageError>;

    /// Creates a contact within this transaction.
    async fn create(&mut self, new: &NewContact) -> Result<Contact, StorageError>;

    /// Fetches a full group within this transaction. Sees uncommitted
    /// changes made by this transaction.
    async fn group_members(&mut self, primary_id: ContactId) -> Result<Vec<Contact>, StorageError>;
}
