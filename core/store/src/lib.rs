//! Durable state for the Firewood Bank core.
//!
//! The core crates are pure; this crate owns the single SQLite database
//! they read from and write back to. Entity rows hold the full snapshot as
//! JSON next to the envelope columns used for queries and write guards.

mod rows;
pub mod store;

pub use store::SqliteStore;
