//! Error taxonomy for the reconciler.

use idlink_storage::StorageError;

/// Errors surfaced by [`crate::Reconciler::resolve`].
///
/// `InvalidInput` is client-caused (neither identifying field supplied) and
/// maps to a 400 at the HTTP boundary; `Storage` covers any read or write
/// failure against the contact store, including a merge that cannot complete
/// atomically, and maps to a 500.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("at least one of email or phoneNumber must be supplied")]
    InvalidInput,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ReconcileError {
    /// Returns `true` if the caller supplied invalid input.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput)
    }
}
