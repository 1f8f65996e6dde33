//! In-memory contact store backend.
//!
//! Backs the reconciler in tests and local development. Transactions take
//! the table's write lock for their whole lifetime and snapshot the table on
//! begin, so rollback (explicit or on drop) restores the pre-transaction
//! state and concurrent transactions serialize.

pub mod store;

pub use store::MemoryContactStore;
