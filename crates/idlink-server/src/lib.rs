//! HTTP layer for the idlink identity reconciliation service.
//!
//! Thin plumbing around the reconciler: routing, request parsing and
//! normalization, error mapping, config loading, and process lifecycle.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;

pub use config::{AppConfig, Environment, StorageBackend, load_config};
pub use error::ApiError;
pub use server::{AppState, IdlinkServer, ServerBuilder, build_app, build_app_with_store};
