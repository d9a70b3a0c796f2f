//! tombola-core - Offline-first data layer for the Tombola raffle app
//!
//! Local SQLite-backed entity cache, a replayable action log for mutations
//! made while disconnected, a durable queue for file uploads, and a
//! network-aware request router that hides all of it from callers.

pub mod actions;
pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod net;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use api::OfflineApi;
pub use db::LocalStore;
pub use error::{Error, Result};
pub use models::{OfflineLimitations, Payload, Record, SyncReport};
