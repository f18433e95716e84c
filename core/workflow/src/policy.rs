//! Configurable workflow policy points.

use serde::{Deserialize, Serialize};

use firewood_common::Role;
use firewood_model::{ApprovalStatus, Client};

/// When an approved client must go back through approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReapprovalPolicy {
    /// Only when staff explicitly move the client back to pending.
    Manual,
    /// Also when the physical address of an approved client changes.
    OnAddressChange,
}

impl Default for ReapprovalPolicy {
    fn default() -> Self {
        ReapprovalPolicy::Manual
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowPolicy {
    /// Roles allowed to reopen a terminal state that has a reopen edge.
    pub reopen_roles: Vec<Role>,
    pub reapproval: ReapprovalPolicy,
}

impl WorkflowPolicy {
    pub fn may_reopen(&self, role: Role) -> bool {
        self.reopen_roles.contains(&role)
    }
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            reopen_roles: vec![Role::Admin, Role::Lead],
            reapproval: ReapprovalPolicy::default(),
        }
    }
}

/// Whether an edit of an approved client should send it back to pending.
pub fn needs_reapproval(before: &Client, after: &Client, policy: ReapprovalPolicy) -> bool {
    if before.approval_status != ApprovalStatus::Approved {
        return false;
    }
    match policy {
        ReapprovalPolicy::Manual => false,
        ReapprovalPolicy::OnAddressChange => before.physical_address != after.physical_address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firewood_model::Address;

    fn approved_client() -> Client {
        let mut client = Client::new("C-9", "Lee Ortiz", Address::new("4 Birch Ln", "Salem", "OR", "97301"));
        client.approval_status = ApprovalStatus::Approved;
        client
    }

    #[test]
    fn test_manual_policy_never_triggers() {
        let before = approved_client();
        let mut after = before.clone();
        after.physical_address.line1 = "9 Cedar Ct".into();
        assert!(!needs_reapproval(&before, &after, ReapprovalPolicy::Manual));
    }

    #[test]
    fn test_address_change_triggers_when_configured() {
        let before = approved_client();
        let mut after = before.clone();
        after.physical_address.line1 = "9 Cedar Ct".into();
        assert!(needs_reapproval(&before, &after, ReapprovalPolicy::OnAddressChange));

        let mut notes_only = before.clone();
        notes_only.notes = Some("prefers mornings".into());
        assert!(!needs_reapproval(&before, &notes_only, ReapprovalPolicy::OnAddressChange));
    }

    #[test]
    fn test_pending_clients_never_need_reapproval() {
        let mut before = approved_client();
        before.approval_status = ApprovalStatus::Pending;
        let mut after = before.clone();
        after.physical_address.city = "Eugene".into();
        assert!(!needs_reapproval(&before, &after, ReapprovalPolicy::OnAddressChange));
    }

    #[test]
    fn test_default_reopen_roles() {
        let policy = WorkflowPolicy::default();
        assert!(policy.may_reopen(Role::Admin));
        assert!(policy.may_reopen(Role::Lead));
        assert!(!policy.may_reopen(Role::Driver));
    }
}
