//! Storage abstraction for the idlink contact store.
//!
//! The reconciler depends only on the [`ContactStore`] and [`ContactTx`]
//! traits defined here, never on a specific backend's dialect. Backends live
//! in `idlink-db-postgres` (production) and `idlink-db-memory` (tests, local
//! development).

pub mod error;
pub mod traits;

pub use error::{ErrorCategory, StorageError};
pub use traits::{ContactStore, ContactTx};
