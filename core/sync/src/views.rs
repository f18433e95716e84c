//! Read-only views for dashboards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use firewood_common::{EntityId, EntityKind, Timestamp};
use firewood_model::Snapshot;
use firewood_workflow::{AuditEvent, AuditLogEntry, HistoryRecord};

/// Timestamp order of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    fn apply<T>(self, items: &mut Vec<T>) {
        if self == SortOrder::Descending {
            items.reverse();
        }
    }
}

/// Live entities, one per id (the highest version), ordered by `updated_at`.
pub fn current(snapshots: &[Snapshot], kind: Option<EntityKind>, order: SortOrder) -> Vec<Snapshot> {
    let mut latest: BTreeMap<EntityId, &Snapshot> = BTreeMap::new();
    for snapshot in snapshots {
        if kind.map_or(false, |k| k != snapshot.kind()) {
            continue;
        }
        let slot = latest.entry(snapshot.id()).or_insert(snapshot);
        if snapshot.envelope().order_key() > slot.envelope().order_key() {
            *slot = snapshot;
        }
    }

    let mut live: Vec<Snapshot> = latest
        .into_values()
        .filter(|s| !s.envelope().is_deleted())
        .cloned()
        .collect();
    live.sort_by_key(|s| (s.envelope().updated_at(), s.id()));
    order.apply(&mut live);
    live
}

/// Status history, optionally for one entity.
pub fn history_feed(
    records: &[HistoryRecord],
    entity: Option<EntityId>,
    order: SortOrder,
) -> Vec<HistoryRecord> {
    let mut feed: Vec<HistoryRecord> = records
        .iter()
        .filter(|r| entity.map_or(true, |id| r.entity_id == id))
        .cloned()
        .collect();
    feed.sort_by_key(|r| (r.created_at, r.id));
    order.apply(&mut feed);
    feed
}

/// Narrows the audit feed. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditFilter {
    pub entity: Option<EntityKind>,
    pub entity_id: Option<EntityId>,
    pub event: Option<AuditEvent>,
    pub actor: Option<String>,
    pub since: Option<Timestamp>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.entity.map_or(true, |k| entry.entity == Some(k))
            && self.entity_id.map_or(true, |id| entry.concerns(id))
            && self.event.map_or(true, |e| entry.event == e)
            && self.actor.as_deref().map_or(true, |a| entry.actor == a)
            && self.since.map_or(true, |t| entry.created_at >= t)
    }
}

pub fn audit_feed(
    entries: &[AuditLogEntry],
    filter: &AuditFilter,
    order: SortOrder,
) -> Vec<AuditLogEntry> {
    let mut feed: Vec<AuditLogEntry> = entries.iter().filter(|e| filter.matches(e)).cloned().collect();
    feed.sort_by_key(|e| (e.created_at, e.id));
    order.apply(&mut feed);
    feed
}
