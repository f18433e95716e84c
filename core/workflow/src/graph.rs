//! Transition graphs.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Debug, Display};

use firewood_common::EntityKind;
use firewood_model::{ApprovalStatus, ChangeRequestStatus, InvoiceStatus, WorkOrderStatus};

/// A closed status domain with a fixed directed graph of legal edges.
pub trait Workflow:
    Copy + Eq + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Entity that owns this status field.
    const KIND: EntityKind;

    /// Name of the status field on the entity, for audit rows.
    const FIELD: &'static str;

    /// Edges any actor may take from `self`.
    fn allowed_targets(&self) -> &'static [Self];

    /// Edges out of an otherwise terminal state that only an authorized
    /// actor may take.
    fn reopen_targets(&self) -> &'static [Self] {
        &[]
    }

    fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }

    fn can_transition_to(&self, target: Self) -> bool {
        self.allowed_targets().contains(&target)
    }
}

impl Workflow for WorkOrderStatus {
    const KIND: EntityKind = EntityKind::WorkOrder;
    const FIELD: &'static str = "status";

    fn allowed_targets(&self) -> &'static [Self] {
        use WorkOrderStatus::*;
        match self {
            Draft => &[Scheduled, Cancelled],
            Scheduled => &[InProgress, Cancelled],
            InProgress => &[PickedUp, Cancelled],
            PickedUp => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }
}

impl Workflow for ApprovalStatus {
    const KIND: EntityKind = EntityKind::Client;
    const FIELD: &'static str = "approval_status";

    fn allowed_targets(&self) -> &'static [Self] {
        use ApprovalStatus::*;
        match self {
            Pending => &[Approved, Denied],
            Approved => &[Pending],
            Denied => &[],
        }
    }

    fn reopen_targets(&self) -> &'static [Self] {
        match self {
            ApprovalStatus::Denied => &[ApprovalStatus::Pending],
            _ => &[],
        }
    }
}

impl Workflow for ChangeRequestStatus {
    const KIND: EntityKind = EntityKind::ChangeRequest;
    const FIELD: &'static str = "status";

    fn allowed_targets(&self) -> &'static [Self] {
        use ChangeRequestStatus::*;
        match self {
            Open => &[InReview, Rejected],
            InReview => &[Approved, Rejected],
            Approved | Rejected => &[],
        }
    }
}

impl Workflow for InvoiceStatus {
    const KIND: EntityKind = EntityKind::Invoice;
    const FIELD: &'static str = "status";

    fn allowed_targets(&self) -> &'static [Self] {
        use InvoiceStatus::*;
        match self {
            Draft => &[Sent, Void],
            Sent => &[Paid, Void],
            Paid | Void => &[],
        }
    }
}
