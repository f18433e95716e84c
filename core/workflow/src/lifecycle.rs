//! Lifecycle facade: every accepted mutation comes back with exactly one
//! audit entry (and, for transitions, exactly one history row).

use serde_json::{Map, Value};
use tracing::{debug, info};

use firewood_common::{Actor, Error, Result, Timestamp};
use firewood_model::{stamp, Client, Envelope, Record, Snapshot, StampKind};

use crate::audit::{record, AuditEvent, AuditLogEntry, FieldChange};
use crate::engine::{transition, WorkflowEntity};
use crate::graph::Workflow;
use crate::history::StatusHistory;
use crate::policy::{needs_reapproval, WorkflowPolicy};

/// Result of a create, update, delete or restore.
#[derive(Debug, Clone)]
pub struct Stamped<R> {
    pub record: R,
    pub audit: AuditLogEntry,
}

/// Result of an accepted status transition.
#[derive(Debug, Clone)]
pub struct Transitioned<E: WorkflowEntity> {
    pub record: E,
    pub history: StatusHistory<E::Status>,
    pub audit: AuditLogEntry,
}

/// Stateless entry point for local edits.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    policy: WorkflowPolicy,
}

impl Lifecycle {
    pub fn new(policy: WorkflowPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    /// Accept a brand-new record at version 1, created at `now`.
    pub fn create<R: Record>(&self, mut record: R, actor: &Actor, now: Timestamp) -> Result<Stamped<R>> {
        actor.validate()?;
        *record.envelope_mut() = Envelope::with_id_at(record.id(), now)?;
        let audit = record_for(AuditEvent::Create, actor, &record, None, now);
        info!("Created {} {}", R::KIND, record.id());
        Ok(Stamped { record, audit })
    }

    /// [`Lifecycle::create`] for a record whose type is only known at runtime,
    /// such as one read from an import file.
    pub fn create_snapshot(
        &self,
        mut snapshot: Snapshot,
        actor: &Actor,
        now: Timestamp,
    ) -> Result<Stamped<Snapshot>> {
        actor.validate()?;
        let id = snapshot.id();
        *snapshot.envelope_mut() = Envelope::with_id_at(id, now)?;
        let audit = record(AuditEvent::Create, actor, Some((snapshot.kind(), id)), None, now);
        info!("Created {} {}", snapshot.kind(), id);
        Ok(Stamped {
            record: snapshot,
            audit,
        })
    }

    /// Accept an edit of `current`.
    ///
    /// Status fields are off limits here; they only move through
    /// [`Lifecycle::transition`].
    pub fn update<R: Record>(
        &self,
        current: &R,
        edited: R,
        actor: &Actor,
        now: Timestamp,
    ) -> Result<Stamped<R>> {
        actor.validate()?;
        if let (Some(from), Some(to)) = (current.workflow_status(), edited.workflow_status()) {
            if from != to {
                return Err(Error::invalid_transition(
                    R::KIND,
                    from,
                    to,
                    "status changes must go through a transition",
                ));
            }
        }

        let changes = changed_fields(current, &edited)?;
        let record = stamp(current.envelope(), edited, StampKind::Edit, now)?;
        let audit = record_for(AuditEvent::Update, actor, &record, summarize(changes), now);
        debug!("Updated {} {} to v{}", R::KIND, record.id(), record.envelope().version());
        Ok(Stamped { record, audit })
    }

    /// Soft-delete `current`, leaving a tombstone.
    pub fn delete<R: Record>(&self, current: &R, actor: &Actor, now: Timestamp) -> Result<Stamped<R>> {
        actor.validate()?;
        let record = stamp(current.envelope(), current.clone(), StampKind::Delete, now)?;
        let audit = record_for(
            AuditEvent::Delete,
            actor,
            &record,
            Some(FieldChange::new("is_deleted", Some("false".into()), Some("true".into()))),
            now,
        );
        info!("Deleted {} {}", R::KIND, record.id());
        Ok(Stamped { record, audit })
    }

    /// Bring a tombstone back.
    pub fn restore<R: Record>(&self, current: &R, actor: &Actor, now: Timestamp) -> Result<Stamped<R>> {
        actor.validate()?;
        let record = stamp(current.envelope(), current.clone(), StampKind::Restore, now)?;
        let audit = record_for(
            AuditEvent::Restore,
            actor,
            &record,
            Some(FieldChange::new("is_deleted", Some("true".into()), Some("false".into()))),
            now,
        );
        info!("Restored {} {}", R::KIND, record.id());
        Ok(Stamped { record, audit })
    }

    /// Move `current` along its workflow graph.
    pub fn transition<E: WorkflowEntity>(
        &self,
        current: &E,
        target: E::Status,
        actor: &Actor,
        reason: Option<&str>,
        now: Timestamp,
    ) -> Result<Transitioned<E>> {
        actor.validate()?;
        let (record, history) = transition(current, target, actor, reason, &self.policy, now)?;
        let audit = record_for(
            AuditEvent::Transition,
            actor,
            &record,
            Some(FieldChange::new(
                <E::Status as Workflow>::FIELD,
                Some(history.old_status.to_string()),
                Some(history.new_status.to_string()),
            )),
            now,
        );
        Ok(Transitioned { record, history, audit })
    }

    /// Edit a client and, if the reapproval policy says so, send an approved
    /// client back to pending as a second, separately audited mutation.
    pub fn update_client(
        &self,
        current: &Client,
        edited: Client,
        actor: &Actor,
        now: Timestamp,
    ) -> Result<(Stamped<Client>, Option<Transitioned<Client>>)> {
        let trigger = needs_reapproval(current, &edited, self.policy.reapproval);
        let updated = self.update(current, edited, actor, now)?;
        if !trigger {
            return Ok((updated, None));
        }
        let reapproval = self.transition(
            &updated.record,
            firewood_model::ApprovalStatus::Pending,
            actor,
            Some("physical address changed"),
            now,
        )?;
        Ok((updated, Some(reapproval)))
    }
}

fn record_for<R: Record>(
    event: AuditEvent,
    actor: &Actor,
    entity: &R,
    change: Option<FieldChange>,
    now: Timestamp,
) -> AuditLogEntry {
    record(event, actor, Some((R::KIND, entity.id())), change, now)
}

fn as_object<R: Record>(record: &R) -> Result<Map<String, Value>> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::Serialization(format!("{} is not a JSON object", R::KIND))),
        Err(e) => Err(Error::Serialization(e.to_string())),
    }
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Top-level fields whose values differ, ignoring the envelope.
fn changed_fields<R: Record>(before: &R, after: &R) -> Result<Vec<FieldChange>> {
    let before = as_object(before)?;
    let after = as_object(after)?;
    let changes = before
        .iter()
        .filter(|(field, _)| field.as_str() != "meta")
        .filter_map(|(field, old)| {
            let new = after.get(field).unwrap_or(&Value::Null);
            (old != new).then(|| FieldChange::new(field.clone(), render(old), render(new)))
        })
        .collect();
    Ok(changes)
}

/// One change is logged with its values; several are logged by name only.
fn summarize(mut changes: Vec<FieldChange>) -> Option<FieldChange> {
    match changes.len() {
        0 => None,
        1 => changes.pop(),
        _ => {
            let mut names: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
            names.sort_unstable();
            Some(FieldChange::new(names.join(","), None, None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use firewood_common::{EntityKind, Role};
    use firewood_model::{
        Address, ApprovalStatus, InventoryItem, WorkOrder, WorkOrderStatus,
    };

    use crate::policy::ReapprovalPolicy;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()
    }

    fn actor() -> Actor {
        Actor::new("jo", Role::Staff)
    }

    #[test]
    fn test_create_resets_envelope() {
        let lifecycle = Lifecycle::default();
        let item = InventoryItem::new("Chainsaw", "pcs", 2.0);
        let id = item.id();
        let created = lifecycle.create(item, &actor(), now()).unwrap();

        assert_eq!(created.record.id(), id);
        assert_eq!(created.record.meta.version(), 1);
        assert_eq!(created.record.meta.created_at(), now());
        assert_eq!(created.audit.event, AuditEvent::Create);
        assert_eq!(created.audit.entity, Some(EntityKind::InventoryItem));
        assert_eq!(created.audit.entity_id, Some(id));
    }

    #[test]
    fn test_create_rejects_blank_actor() {
        let item = InventoryItem::new("Chainsaw", "pcs", 2.0);
        assert!(Lifecycle::default().create(item, &Actor::new("", Role::Staff), now()).is_err());
    }

    #[test]
    fn test_create_snapshot_keeps_kind_and_id() {
        let item = InventoryItem::new("Wedge", "pcs", 6.0);
        let id = item.id();
        let created = Lifecycle::default()
            .create_snapshot(item.into_snapshot(), &actor(), now())
            .unwrap();
        assert_eq!(created.record.kind(), EntityKind::InventoryItem);
        assert_eq!(created.record.id(), id);
        assert_eq!(created.record.envelope().updated_at(), now());
        assert_eq!(created.audit.entity_id, Some(id));
    }

    #[test]
    fn test_update_logs_single_field_change() {
        let lifecycle = Lifecycle::default();
        let item = lifecycle
            .create(InventoryItem::new("Bar oil", "gal", 4.0), &actor(), now())
            .unwrap()
            .record;
        let mut edited = item.clone();
        edited.quantity_on_hand = 6.0;

        let updated = lifecycle
            .update(&item, edited, &actor(), now() + Duration::minutes(1))
            .unwrap();
        assert_eq!(updated.record.meta.version(), 2);
        assert_eq!(updated.audit.event, AuditEvent::Update);
        assert_eq!(updated.audit.field.as_deref(), Some("quantity_on_hand"));
        assert_eq!(updated.audit.old_value.as_deref(), Some("4.0"));
        assert_eq!(updated.audit.new_value.as_deref(), Some("6.0"));
    }

    #[test]
    fn test_update_logs_many_fields_by_name() {
        let lifecycle = Lifecycle::default();
        let item = InventoryItem::new("Bar oil", "gal", 4.0);
        let mut edited = item.clone();
        edited.unit = "qt".into();
        edited.notes = Some("store in shed".into());

        let updated = lifecycle.update(&item, edited, &actor(), now()).unwrap();
        assert_eq!(updated.audit.field.as_deref(), Some("notes,unit"));
        assert!(updated.audit.old_value.is_none());
    }

    #[test]
    fn test_update_cannot_change_status() {
        let order = WorkOrder::for_client(&Client::new(
            "C-3",
            "Ray Wu",
            Address::new("7 Oak Ave", "Bend", "OR", "97701"),
        ));
        let mut edited = order.clone();
        edited.status = WorkOrderStatus::Completed;
        let err = Lifecycle::default().update(&order, edited, &actor(), now()).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[test]
    fn test_transition_yields_one_history_and_one_audit() {
        let lifecycle = Lifecycle::default();
        let client = Client::new("C-4", "Jane Doe", Address::new("12 Elm St", "Springfield", "IL", "62701"));

        let approved = lifecycle
            .transition(&client, ApprovalStatus::Approved, &actor(), None, now())
            .unwrap();
        assert_eq!(approved.history.entity_id, client.id());
        assert_eq!(approved.audit.event, AuditEvent::Transition);
        assert_eq!(approved.audit.field.as_deref(), Some("approval_status"));
        assert_eq!(approved.audit.old_value.as_deref(), Some("pending"));
        assert_eq!(approved.audit.new_value.as_deref(), Some("approved"));
        assert_eq!(approved.record.meta.version(), client.meta.version() + 1);
    }

    #[test]
    fn test_delete_and_restore_are_audited() {
        let lifecycle = Lifecycle::default();
        let item = InventoryItem::new("Helmet", "pcs", 3.0);
        let deleted = lifecycle.delete(&item, &actor(), now()).unwrap();
        assert!(deleted.record.meta.is_deleted());
        assert_eq!(deleted.audit.event, AuditEvent::Delete);

        let restored = lifecycle.restore(&deleted.record, &actor(), now()).unwrap();
        assert!(!restored.record.meta.is_deleted());
        assert_eq!(restored.audit.event, AuditEvent::Restore);
        assert_eq!(restored.record.meta.version(), 3);
    }

    #[test]
    fn test_address_change_reapproval() {
        let lifecycle = Lifecycle::new(WorkflowPolicy {
            reapproval: ReapprovalPolicy::OnAddressChange,
            ..WorkflowPolicy::default()
        });
        let client = Client::new("C-5", "Jane Doe", Address::new("12 Elm St", "Springfield", "IL", "62701"));
        let approved = lifecycle
            .transition(&client, ApprovalStatus::Approved, &actor(), None, now())
            .unwrap()
            .record;

        let mut moved = approved.clone();
        moved.physical_address.line1 = "40 Pine Rd".into();
        let (updated, reapproval) = lifecycle.update_client(&approved, moved, &actor(), now()).unwrap();

        let reapproval = reapproval.expect("address change should trigger reapproval");
        assert_eq!(updated.record.meta.version(), approved.meta.version() + 1);
        assert_eq!(reapproval.record.approval_status, ApprovalStatus::Pending);
        assert_eq!(reapproval.record.meta.version(), approved.meta.version() + 2);
        assert_ne!(updated.audit.id, reapproval.audit.id);
    }
}
