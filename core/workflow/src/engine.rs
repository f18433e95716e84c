//! Status transition engine.

use tracing::debug;

use firewood_common::{Actor, Error, Result, Timestamp};
use firewood_model::{
    stamp, ApprovalStatus, ChangeRequest, ChangeRequestStatus, Client, Invoice, InvoiceStatus,
    Record, StampKind, WorkOrder, WorkOrderStatus,
};

use crate::graph::Workflow;
use crate::history::StatusHistory;
use crate::policy::WorkflowPolicy;

/// A record with a workflow status field.
pub trait WorkflowEntity: Record {
    type Status: Workflow;

    fn status(&self) -> Self::Status;

    /// Move to `to` and update its companion fields.
    ///
    /// Only called for edges the graph allows; rejects missing companion
    /// data with `InvalidTransition`. `reason` is already trimmed and
    /// non-empty when present.
    fn apply_status(&mut self, to: Self::Status, actor: &Actor, reason: Option<&str>)
        -> Result<()>;
}

fn missing<S: Workflow>(from: S, to: S, what: &str) -> Error {
    Error::invalid_transition(S::KIND, from, to, what)
}

impl WorkflowEntity for Client {
    type Status = ApprovalStatus;

    fn status(&self) -> ApprovalStatus {
        self.approval_status
    }

    fn apply_status(&mut self, to: ApprovalStatus, _actor: &Actor, reason: Option<&str>) -> Result<()> {
        match to {
            ApprovalStatus::Denied => {
                let reason = reason
                    .ok_or_else(|| missing(self.approval_status, to, "denial requires a reason"))?;
                self.denial_reason = Some(reason.to_string());
            }
            ApprovalStatus::Pending | ApprovalStatus::Approved => {
                self.denial_reason = None;
            }
        }
        self.approval_status = to;
        Ok(())
    }
}

impl WorkflowEntity for WorkOrder {
    type Status = WorkOrderStatus;

    fn status(&self) -> WorkOrderStatus {
        self.status
    }

    fn apply_status(&mut self, to: WorkOrderStatus, _actor: &Actor, _reason: Option<&str>) -> Result<()> {
        if to == WorkOrderStatus::Scheduled && self.scheduled_date.is_none() {
            return Err(missing(self.status, to, "scheduling requires a scheduled_date"));
        }
        self.status = to;
        Ok(())
    }
}

impl WorkflowEntity for ChangeRequest {
    type Status = ChangeRequestStatus;

    fn status(&self) -> ChangeRequestStatus {
        self.status
    }

    fn apply_status(
        &mut self,
        to: ChangeRequestStatus,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<()> {
        match to {
            ChangeRequestStatus::Rejected => {
                let reason = reason
                    .ok_or_else(|| missing(self.status, to, "rejection requires a reason"))?;
                self.resolution_notes = Some(reason.to_string());
                self.resolved_by_user_id = actor.user_id;
            }
            ChangeRequestStatus::Approved => {
                if let Some(reason) = reason {
                    self.resolution_notes = Some(reason.to_string());
                }
                self.resolved_by_user_id = actor.user_id;
            }
            ChangeRequestStatus::Open | ChangeRequestStatus::InReview => {}
        }
        self.status = to;
        Ok(())
    }
}

impl WorkflowEntity for Invoice {
    type Status = InvoiceStatus;

    fn status(&self) -> InvoiceStatus {
        self.status
    }

    fn apply_status(&mut self, to: InvoiceStatus, _actor: &Actor, reason: Option<&str>) -> Result<()> {
        match to {
            InvoiceStatus::Sent if self.line_items.is_empty() => {
                return Err(missing(self.status, to, "cannot send an invoice without line items"));
            }
            InvoiceStatus::Void if reason.is_none() => {
                return Err(missing(self.status, to, "voiding requires a reason"));
            }
            _ => {}
        }
        self.status = to;
        Ok(())
    }
}

/// Move `entity` along one edge of its workflow graph.
///
/// On success returns the stamped entity and its history row. On failure
/// nothing is returned and `entity` is untouched.
///
/// # Errors
/// - `InvalidTransition` for unlisted edges, self-transitions, deleted
///   entities, unauthorized reopens, or missing companion data
/// - `InvariantViolation` if the entity's envelope cannot be stamped
pub fn transition<E: WorkflowEntity>(
    entity: &E,
    target: E::Status,
    actor: &Actor,
    reason: Option<&str>,
    policy: &WorkflowPolicy,
    now: Timestamp,
) -> Result<(E, StatusHistory<E::Status>)> {
    let from = entity.status();
    let kind = <E::Status as Workflow>::KIND;

    if entity.envelope().is_deleted() {
        return Err(Error::invalid_transition(kind, from, target, "entity is deleted"));
    }
    if from == target {
        return Err(Error::invalid_transition(kind, from, target, "already in that state"));
    }
    if !from.can_transition_to(target) {
        if !from.reopen_targets().contains(&target) {
            let why = if from.is_terminal() {
                format!("{} is terminal", from)
            } else {
                "no such edge".to_string()
            };
            return Err(Error::invalid_transition(kind, from, target, why));
        }
        if !policy.may_reopen(actor.role) {
            return Err(Error::invalid_transition(
                kind,
                from,
                target,
                format!("reopening requires an authorized role, not {}", actor.role),
            ));
        }
    }

    let reason = reason.map(str::trim).filter(|r| !r.is_empty());
    let mut next = entity.clone();
    next.apply_status(target, actor, reason)?;
    let next = stamp(entity.envelope(), next, StampKind::Edit, now)?;

    debug!(
        "{} {} moved {} -> {} (v{})",
        kind,
        entity.id(),
        from,
        target,
        next.envelope().version()
    );

    let history = StatusHistory::new(
        entity.id(),
        from,
        target,
        actor,
        reason.map(str::to_string),
        next.envelope().updated_at(),
    );
    Ok((next, history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use firewood_common::{EntityId, Role};
    use firewood_model::{Address, InvoiceLineItem};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap()
    }

    fn staff() -> Actor {
        Actor::new("sam", Role::Staff)
    }

    fn client() -> Client {
        Client::new("C-1", "Jane Doe", Address::new("12 Elm St", "Springfield", "IL", "62701"))
    }

    fn work_order(status: WorkOrderStatus) -> WorkOrder {
        let mut order = WorkOrder::for_client(&client());
        order.status = status;
        order.scheduled_date = Some(now());
        order
    }

    #[test]
    fn test_completed_work_order_cannot_be_rescheduled() {
        let order = work_order(WorkOrderStatus::Completed);
        let err = transition(
            &order,
            WorkOrderStatus::Scheduled,
            &staff(),
            None,
            &WorkflowPolicy::default(),
            now(),
        )
        .unwrap_err();
        match err {
            Error::InvalidTransition { entity_kind, from, to, .. } => {
                assert_eq!(entity_kind, firewood_common::EntityKind::WorkOrder);
                assert_eq!(from, "completed");
                assert_eq!(to, "scheduled");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_accepted_transition_stamps_and_records_history() {
        let order = work_order(WorkOrderStatus::Draft);
        let (next, history) = transition(
            &order,
            WorkOrderStatus::Scheduled,
            &staff(),
            None,
            &WorkflowPolicy::default(),
            now(),
        )
        .unwrap();

        assert_eq!(next.status, WorkOrderStatus::Scheduled);
        assert_eq!(next.meta.version(), order.meta.version() + 1);
        assert_eq!(history.entity_id, order.meta.id());
        assert_eq!(history.old_status, WorkOrderStatus::Draft);
        assert_eq!(history.new_status, WorkOrderStatus::Scheduled);
        assert_eq!(history.actor, "sam");
        assert_eq!(order.status, WorkOrderStatus::Draft);
    }

    #[test]
    fn test_scheduling_requires_date() {
        let mut order = work_order(WorkOrderStatus::Draft);
        order.scheduled_date = None;
        assert!(matches!(
            transition(&order, WorkOrderStatus::Scheduled, &staff(), None, &WorkflowPolicy::default(), now()),
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_denial_without_reason_is_rejected() {
        let client = client();
        for reason in [None, Some(""), Some("   ")] {
            let err = transition(
                &client,
                ApprovalStatus::Denied,
                &staff(),
                reason,
                &WorkflowPolicy::default(),
                now(),
            )
            .unwrap_err();
            assert!(matches!(err, Error::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_denial_records_reason() {
        let (denied, history) = transition(
            &client(),
            ApprovalStatus::Denied,
            &staff(),
            Some(" outside service area "),
            &WorkflowPolicy::default(),
            now(),
        )
        .unwrap();
        assert_eq!(denied.denial_reason.as_deref(), Some("outside service area"));
        assert_eq!(history.reason.as_deref(), Some("outside service area"));
    }

    #[test]
    fn test_reopening_denied_client_requires_authorized_role() {
        let policy = WorkflowPolicy::default();
        let (denied, _) = transition(
            &client(),
            ApprovalStatus::Denied,
            &staff(),
            Some("incomplete paperwork"),
            &policy,
            now(),
        )
        .unwrap();

        assert!(transition(&denied, ApprovalStatus::Pending, &staff(), None, &policy, now()).is_err());
        assert!(transition(&denied, ApprovalStatus::Approved, &Actor::new("ana", Role::Admin), None, &policy, now()).is_err());

        let (reopened, _) = transition(
            &denied,
            ApprovalStatus::Pending,
            &Actor::new("ana", Role::Admin),
            None,
            &policy,
            now(),
        )
        .unwrap();
        assert_eq!(reopened.approval_status, ApprovalStatus::Pending);
        assert!(reopened.denial_reason.is_none());
    }

    #[test]
    fn test_approved_client_can_return_to_pending() {
        let policy = WorkflowPolicy::default();
        let (approved, _) =
            transition(&client(), ApprovalStatus::Approved, &staff(), None, &policy, now()).unwrap();
        let (pending, _) =
            transition(&approved, ApprovalStatus::Pending, &staff(), None, &policy, now()).unwrap();
        assert_eq!(pending.meta.version(), 3);
    }

    #[test]
    fn test_change_request_resolution_fields() {
        let reviewer = Actor::new("kim", Role::Lead).with_user_id(EntityId::new());
        let request = ChangeRequest::new("New saw", "Buy a second chainsaw", EntityId::new());
        let policy = WorkflowPolicy::default();

        let (rejected, _) = transition(
            &request,
            ChangeRequestStatus::Rejected,
            &reviewer,
            Some("no budget"),
            &policy,
            now(),
        )
        .unwrap();
        assert_eq!(rejected.resolution_notes.as_deref(), Some("no budget"));
        assert_eq!(rejected.resolved_by_user_id, reviewer.user_id);
        assert!(transition(&rejected, ChangeRequestStatus::InReview, &reviewer, None, &policy, now()).is_err());
    }

    #[test]
    fn test_invoice_send_and_void() {
        let order = work_order(WorkOrderStatus::Completed);
        let empty = Invoice::for_work_order(&order, "INV-2", now(), Vec::new(), 0.0);
        let policy = WorkflowPolicy::default();
        assert!(transition(&empty, InvoiceStatus::Sent, &staff(), None, &policy, now()).is_err());

        let invoice = Invoice::for_work_order(
            &order,
            "INV-3",
            now(),
            vec![InvoiceLineItem::new("Cord", 1.0, 100.0)],
            0.0,
        );
        let (sent, _) = transition(&invoice, InvoiceStatus::Sent, &staff(), None, &policy, now()).unwrap();
        assert!(transition(&sent, InvoiceStatus::Void, &staff(), None, &policy, now()).is_err());
        let (void, _) =
            transition(&sent, InvoiceStatus::Void, &staff(), Some("duplicate"), &policy, now()).unwrap();
        assert_eq!(void.status, InvoiceStatus::Void);
    }

    #[test]
    fn test_deleted_entity_cannot_transition() {
        let order = work_order(WorkOrderStatus::Draft);
        let deleted = stamp(&order.meta, order.clone(), StampKind::Delete, now()).unwrap();
        assert!(transition(&deleted, WorkOrderStatus::Cancelled, &staff(), None, &WorkflowPolicy::default(), now()).is_err());
    }
}
