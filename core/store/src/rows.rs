//! Column encodings shared by the store's queries.

use chrono::{DateTime, SecondsFormat, Utc};

use firewood_common::{EntityId, EntityKind, Error, Result, Timestamp};
use firewood_workflow::{AuditLogEntry, HistoryRecord};

pub(crate) fn sql(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

/// Fixed-width RFC 3339 so that text order is time order.
pub(crate) fn encode_ts(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_ts(text: &str) -> Result<Timestamp> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("bad timestamp {:?}: {}", text, e)))
}

pub(crate) fn encode_version(version: u64) -> Result<i64> {
    i64::try_from(version).map_err(|_| Error::InvariantViolation(format!("version {} out of range", version)))
}

/// An `audit_logs` row as stored.
pub(crate) struct AuditRow {
    pub id: String,
    pub event: String,
    pub role: String,
    pub actor: String,
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    pub field: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: String,
}

impl AuditRow {
    pub const COLUMNS: &'static str =
        "id, event, role, actor, entity, entity_id, field, old_value, new_value, created_at";

    pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            event: row.get(1)?,
            role: row.get(2)?,
            actor: row.get(3)?,
            entity: row.get(4)?,
            entity_id: row.get(5)?,
            field: row.get(6)?,
            old_value: row.get(7)?,
            new_value: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    pub fn decode(self) -> Result<AuditLogEntry> {
        Ok(AuditLogEntry {
            id: EntityId::parse(&self.id)?,
            event: self.event.parse()?,
            actor: self.actor,
            role: self.role.parse()?,
            entity: self.entity.as_deref().map(str::parse::<EntityKind>).transpose()?,
            entity_id: self.entity_id.as_deref().map(EntityId::parse).transpose()?,
            field: self.field,
            old_value: self.old_value,
            new_value: self.new_value,
            created_at: decode_ts(&self.created_at)?,
        })
    }
}

/// A `status_history` row as stored.
pub(crate) struct HistoryRow {
    pub id: String,
    pub workflow: String,
    pub entity_id: String,
    pub old_status: String,
    pub new_status: String,
    pub actor: String,
    pub role: String,
    pub reason: Option<String>,
    pub created_at: String,
}

impl HistoryRow {
    pub const COLUMNS: &'static str =
        "id, workflow, entity_id, old_status, new_status, actor, role, reason, created_at";

    pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            workflow: row.get(1)?,
            entity_id: row.get(2)?,
            old_status: row.get(3)?,
            new_status: row.get(4)?,
            actor: row.get(5)?,
            role: row.get(6)?,
            reason: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    pub fn decode(self) -> Result<HistoryRecord> {
        Ok(HistoryRecord {
            id: EntityId::parse(&self.id)?,
            workflow: self.workflow.parse()?,
            entity_id: EntityId::parse(&self.entity_id)?,
            old_status: self.old_status,
            new_status: self.new_status,
            actor: self.actor,
            role: self.role.parse()?,
            reason: self.reason,
            created_at: decode_ts(&self.created_at)?,
        })
    }
}
