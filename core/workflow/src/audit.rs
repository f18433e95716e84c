//! Append-only audit log entries.
//!
//! Entries are values: once built they expose no way to be edited, and the
//! store only ever inserts them.

use serde::{Deserialize, Serialize};
use std::fmt;

use firewood_common::{Actor, EntityId, EntityKind, Role, Timestamp};

/// What kind of accepted mutation an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    Create,
    Update,
    Delete,
    Restore,
    Transition,
    /// A remote snapshot replaced local state during reconciliation.
    SyncAccept,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::Create => "create",
            AuditEvent::Update => "update",
            AuditEvent::Delete => "delete",
            AuditEvent::Restore => "restore",
            AuditEvent::Transition => "transition",
            AuditEvent::SyncAccept => "sync_accept",
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditEvent {
    type Err = firewood_common::Error;

    fn from_str(s: &str) -> firewood_common::Result<Self> {
        match s {
            "create" => Ok(AuditEvent::Create),
            "update" => Ok(AuditEvent::Update),
            "delete" => Ok(AuditEvent::Delete),
            "restore" => Ok(AuditEvent::Restore),
            "transition" => Ok(AuditEvent::Transition),
            "sync_accept" => Ok(AuditEvent::SyncAccept),
            other => Err(firewood_common::Error::InvalidInput(format!(
                "Unknown audit event: {}",
                other
            ))),
        }
    }
}

/// A single field's before/after values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl FieldChange {
    pub fn new(
        field: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            field: field.into(),
            old_value,
            new_value,
        }
    }
}

/// One row of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: EntityId,
    pub event: AuditEvent,
    pub actor: String,
    pub role: Role,
    pub entity: Option<EntityKind>,
    pub entity_id: Option<EntityId>,
    pub field: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: Timestamp,
}

impl AuditLogEntry {
    /// Event label in the `update_inventory_item` style used by dashboards.
    pub fn label(&self) -> String {
        match self.entity {
            Some(kind) => format!("{}_{}", self.event, kind),
            None => self.event.to_string(),
        }
    }

    /// Whether this entry concerns the given entity.
    pub fn concerns(&self, entity_id: EntityId) -> bool {
        self.entity_id == Some(entity_id)
    }
}

/// Build an audit entry for an accepted mutation.
pub fn record(
    event: AuditEvent,
    actor: &Actor,
    entity: Option<(EntityKind, EntityId)>,
    change: Option<FieldChange>,
    now: Timestamp,
) -> AuditLogEntry {
    let (field, old_value, new_value) = match change {
        Some(change) => (Some(change.field), change.old_value, change.new_value),
        None => (None, None, None),
    };
    AuditLogEntry {
        id: EntityId::new(),
        event,
        actor: actor.name.clone(),
        role: actor.role,
        entity: entity.map(|(kind, _)| kind),
        entity_id: entity.map(|(_, id)| id),
        field,
        old_value,
        new_value,
        created_at: now,
    }
}
