//! Local edits waiting to be shipped to other installs.

use serde::{Deserialize, Serialize};

use firewood_common::{EntityId, EntityKind, Timestamp};
use firewood_model::Snapshot;

/// An entity edited since its last reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    pub kind: EntityKind,
    pub entity_id: EntityId,
    pub updated_at: Timestamp,
    pub last_synced_at: Option<Timestamp>,
    pub version: u64,
    pub is_deleted: bool,
}

impl From<&Snapshot> for PendingChange {
    fn from(snapshot: &Snapshot) -> Self {
        let meta = snapshot.envelope();
        Self {
            kind: snapshot.kind(),
            entity_id: meta.id(),
            updated_at: meta.updated_at(),
            last_synced_at: meta.last_synced_at(),
            version: meta.version(),
            is_deleted: meta.is_deleted(),
        }
    }
}

/// Entities that need syncing, oldest edit first. Tombstones are included.
pub fn pending_changes(snapshots: &[Snapshot]) -> Vec<PendingChange> {
    let mut pending: Vec<PendingChange> = snapshots
        .iter()
        .filter(|s| s.envelope().needs_sync())
        .map(PendingChange::from)
        .collect();
    pending.sort_by_key(|p| (p.updated_at, p.entity_id));
    pending
}
