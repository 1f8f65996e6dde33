//! Identity reconciliation core.
//!
//! [`Reconciler::resolve`] decides, for each incoming (email, phone) pair,
//! whether to create a new identity, attach new information to an existing
//! one, or merge two previously-separate identities into one, and returns
//! the consolidated group view.

pub mod error;
pub mod reconciler;

pub use error::ReconcileError;
pub use reconciler::Reconciler;
