//! # LabBot Source
//!
//! Client for the knowledge-base REST API and the synchronization service
//! that keeps the vector index current.
//!
//! Fetch failures on the serving path are logged and degrade to whatever was
//! fetched so far (possibly nothing) — they never crash the bot.

pub mod client;
pub mod sync;

pub use client::KbClient;
pub use sync::{read_last_sync, SyncReport, SyncService};
