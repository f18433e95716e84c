//! Immutable status history rows.

use serde::{Deserialize, Serialize};

use firewood_common::{Actor, EntityId, EntityKind, Role, Timestamp};
use firewood_model::{ApprovalStatus, ChangeRequestStatus, InvoiceStatus, WorkOrderStatus};

use crate::graph::Workflow;

/// One accepted status change of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistory<S> {
    pub id: EntityId,
    pub entity_id: EntityId,
    pub old_status: S,
    pub new_status: S,
    pub actor: String,
    pub role: Role,
    pub reason: Option<String>,
    pub created_at: Timestamp,
}

pub type ClientApprovalHistory = StatusHistory<ApprovalStatus>;
pub type WorkOrderStatusHistory = StatusHistory<WorkOrderStatus>;
pub type ChangeRequestHistory = StatusHistory<ChangeRequestStatus>;
pub type InvoiceStatusHistory = StatusHistory<InvoiceStatus>;

impl<S: Workflow> StatusHistory<S> {
    pub(crate) fn new(
        entity_id: EntityId,
        old_status: S,
        new_status: S,
        actor: &Actor,
        reason: Option<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: EntityId::new(),
            entity_id,
            old_status,
            new_status,
            actor: actor.name.clone(),
            role: actor.role,
            reason,
            created_at,
        }
    }
}

/// Type-erased history row, for feeds and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: EntityId,
    pub workflow: EntityKind,
    pub entity_id: EntityId,
    pub old_status: String,
    pub new_status: String,
    pub actor: String,
    pub role: Role,
    pub reason: Option<String>,
    pub created_at: Timestamp,
}

impl<S: Workflow> From<StatusHistory<S>> for HistoryRecord {
    fn from(row: StatusHistory<S>) -> Self {
        Self {
            id: row.id,
            workflow: S::KIND,
            entity_id: row.entity_id,
            old_status: row.old_status.to_string(),
            new_status: row.new_status.to_string(),
            actor: row.actor,
            role: row.role,
            reason: row.reason,
            created_at: row.created_at,
        }
    }
}
