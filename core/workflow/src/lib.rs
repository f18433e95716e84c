//! Status workflows, history and audit records.
//!
//! This crate provides:
//! - Fixed transition graphs for every workflow entity
//! - The transition engine, which validates an edge, stamps the entity and
//!   emits a history record
//! - The append-only audit recorder
//! - [`Lifecycle`], the facade that pairs every accepted mutation with
//!   exactly one audit entry

pub mod audit;
pub mod engine;
pub mod graph;
pub mod history;
pub mod lifecycle;
pub mod policy;

pub use audit::{record, AuditEvent, AuditLogEntry, FieldChange};
pub use engine::{transition, WorkflowEntity};
pub use graph::Workflow;
pub use history::{
    ChangeRequestHistory, ClientApprovalHistory, HistoryRecord, InvoiceStatusHistory,
    StatusHistory, WorkOrderStatusHistory,
};
pub use lifecycle::{Lifecycle, Stamped, Transitioned};
pub use policy::{needs_reapproval, ReapprovalPolicy, WorkflowPolicy};
