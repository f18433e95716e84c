//! Firewood Bank sync core.
//!
//! This crate provides:
//! - Conflict detection (identity conflicts and duplicate clients)
//! - Whole-snapshot merge resolution with sticky tombstones
//! - The reconciliation pass run when a batch arrives from another install
//! - Read-only dashboard views and the pending-change feed
//! - The JSON configuration of the core's policy points

pub mod config;
pub mod conflict;
pub mod coordinator;
pub mod merge;
pub mod pending;
pub mod views;

// Re-export main types
pub use config::CoreConfig;
pub use conflict::{check_new_client, find_conflicts, identity_conflicts, ConflictFinding, DuplicatePolicy};
pub use coordinator::{
    reconcile, ConflictKind, ConflictReport, ConflictSeverity, ReconcileContext, Reconciliation,
};
pub use merge::{resolve, Resolution, Side};
pub use pending::{pending_changes, PendingChange};
pub use views::{audit_feed, current, history_feed, AuditFilter, SortOrder};
