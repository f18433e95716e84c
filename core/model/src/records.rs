//! Business records of the firewood bank.
//!
//! Field names match the persisted snake_case columns.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use firewood_common::{EntityId, EntityKind, Role, Timestamp};

use crate::envelope::Envelope;
use crate::snapshot::Snapshot;
use crate::status::{ApprovalStatus, ChangeRequestStatus, InvoiceStatus, WorkOrderStatus};

/// An entity that carries a sync envelope.
pub trait Record: Clone + PartialEq + Debug + Serialize + DeserializeOwned {
    /// Kind tag used in snapshots, audit rows and errors.
    const KIND: EntityKind;

    fn envelope(&self) -> &Envelope;

    fn envelope_mut(&mut self) -> &mut Envelope;

    fn id(&self) -> EntityId {
        self.envelope().id()
    }

    /// Persisted name of the workflow status, for records that have one.
    fn workflow_status(&self) -> Option<&'static str>;

    /// Wrap into the type-erased snapshot exchanged between devices.
    fn into_snapshot(self) -> Snapshot;

    /// Unwrap a snapshot of this kind.
    fn from_snapshot(snapshot: Snapshot) -> Option<Self>;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl Address {
    pub fn new(
        line1: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        Self {
            line1: line1.into(),
            line2: None,
            city: city.into(),
            state: state.into(),
            postal_code: postal_code.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub telephone: Option<String>,
    pub email: Option<String>,
}

/// A household receiving firewood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub meta: Envelope,
    /// "Client #" on the onboarding form.
    pub client_number: String,
    pub client_title: Option<String>,
    pub name: String,
    pub physical_address: Address,
    pub mailing_address: Option<Address>,
    pub contact: ContactInfo,
    pub date_of_onboarding: Option<Timestamp>,
    pub how_did_they_hear_about_us: Option<String>,
    pub referring_agency: Option<String>,
    pub approval_status: ApprovalStatus,
    /// Required while `approval_status` is denied.
    pub denial_reason: Option<String>,
    pub gate_combo: Option<String>,
    pub notes: Option<String>,
    pub created_by_user_id: Option<EntityId>,
}

impl Client {
    /// New client awaiting approval.
    pub fn new(
        client_number: impl Into<String>,
        name: impl Into<String>,
        physical_address: Address,
    ) -> Self {
        Self {
            meta: Envelope::new(),
            client_number: client_number.into(),
            client_title: None,
            name: name.into(),
            physical_address,
            mailing_address: None,
            contact: ContactInfo::default(),
            date_of_onboarding: None,
            how_did_they_hear_about_us: None,
            referring_agency: None,
            approval_status: ApprovalStatus::Pending,
            denial_reason: None,
            gate_combo: None,
            notes: None,
            created_by_user_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeatSourceInfo {
    pub gas: bool,
    pub electric: bool,
    /// Free-text "Other" entry.
    pub other: Option<String>,
}

/// A delivery or pickup job for one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub meta: Envelope,
    pub client_id: EntityId,
    pub client_number: String,
    pub client_title: Option<String>,
    pub client_name: String,
    pub physical_address: Address,
    pub mailing_address: Option<Address>,
    pub contact: ContactInfo,
    pub directions: Option<String>,
    pub gate_combo: Option<String>,
    pub other_heat_source: HeatSourceInfo,
    pub notes: Option<String>,
    pub scheduled_date: Option<Timestamp>,
    pub status: WorkOrderStatus,
    pub mileage: Option<f64>,
    #[serde(default)]
    pub assignees: Vec<EntityId>,
    pub created_by_user_id: Option<EntityId>,
}

impl WorkOrder {
    /// Draft work order pre-filled from the client record.
    pub fn for_client(client: &Client) -> Self {
        Self {
            meta: Envelope::new(),
            client_id: client.meta.id(),
            client_number: client.client_number.clone(),
            client_title: client.client_title.clone(),
            client_name: client.name.clone(),
            physical_address: client.physical_address.clone(),
            mailing_address: client.mailing_address.clone(),
            contact: client.contact.clone(),
            directions: None,
            gate_combo: client.gate_combo.clone(),
            other_heat_source: HeatSourceInfo::default(),
            notes: None,
            scheduled_date: None,
            status: WorkOrderStatus::Draft,
            mileage: None,
            assignees: Vec::new(),
            created_by_user_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub id: EntityId,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
}

impl InvoiceLineItem {
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        Self {
            id: EntityId::new(),
            description: description.into(),
            quantity,
            unit_price,
            total: quantity * unit_price,
        }
    }
}

/// Client details as they were when an invoice was issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    pub client_id: EntityId,
    pub client_number: String,
    pub client_title: Option<String>,
    pub client_name: String,
    pub physical_address: Address,
    pub mailing_address: Option<Address>,
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub meta: Envelope,
    pub work_order_id: EntityId,
    pub invoice_number: String,
    pub invoice_date: Timestamp,
    pub line_items: Vec<InvoiceLineItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub client_snapshot: ClientSnapshot,
    pub notes: Option<String>,
    pub status: InvoiceStatus,
}

impl Invoice {
    /// Draft invoice for a work order, totals computed from the line items.
    pub fn for_work_order(
        work_order: &WorkOrder,
        invoice_number: impl Into<String>,
        invoice_date: Timestamp,
        line_items: Vec<InvoiceLineItem>,
        tax: f64,
    ) -> Self {
        let subtotal: f64 = line_items.iter().map(|item| item.total).sum();
        Self {
            meta: Envelope::new(),
            work_order_id: work_order.meta.id(),
            invoice_number: invoice_number.into(),
            invoice_date,
            line_items,
            subtotal,
            tax,
            total: subtotal + tax,
            client_snapshot: ClientSnapshot {
                client_id: work_order.client_id,
                client_number: work_order.client_number.clone(),
                client_title: work_order.client_title.clone(),
                client_name: work_order.client_name.clone(),
                physical_address: work_order.physical_address.clone(),
                mailing_address: work_order.mailing_address.clone(),
                contact: work_order.contact.clone(),
            },
            notes: None,
            status: InvoiceStatus::Draft,
        }
    }
}

/// A volunteer or staff member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub meta: Envelope,
    pub name: String,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub role: Role,
    pub availability_notes: Option<String>,
    pub driver_license_status: Option<String>,
    pub vehicle: Option<String>,
}

impl User {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            meta: Envelope::new(),
            name: name.into(),
            email: None,
            telephone: None,
            role,
            availability_notes: None,
            driver_license_status: None,
            vehicle: None,
        }
    }
}

/// Equipment and consumables (chainsaws, bar oil, gas, helmets).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub meta: Envelope,
    pub name: String,
    pub category: Option<String>,
    pub quantity_on_hand: f64,
    /// e.g. "pcs", "gal", "qt".
    pub unit: String,
    pub reorder_threshold: f64,
    pub reorder_amount: Option<f64>,
    #[serde(default)]
    pub reserved_quantity: f64,
    pub notes: Option<String>,
}

impl InventoryItem {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, quantity_on_hand: f64) -> Self {
        Self {
            meta: Envelope::new(),
            name: name.into(),
            category: None,
            quantity_on_hand,
            unit: unit.into(),
            reorder_threshold: 0.0,
            reorder_amount: None,
            reserved_quantity: 0.0,
            notes: None,
        }
    }

    /// Quantity not already promised to scheduled work.
    pub fn available(&self) -> f64 {
        self.quantity_on_hand - self.reserved_quantity
    }

    pub fn needs_reorder(&self) -> bool {
        self.available() <= self.reorder_threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryEventType {
    Delivery,
    Meeting,
    Workday,
}

/// A calendar entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub meta: Envelope,
    pub title: String,
    pub description: Option<String>,
    pub event_type: DeliveryEventType,
    pub work_order_id: Option<EntityId>,
    pub start_date: Timestamp,
    pub end_date: Option<Timestamp>,
    pub color_code: Option<String>,
    #[serde(default)]
    pub assigned_user_ids: Vec<EntityId>,
}

impl DeliveryEvent {
    pub fn new(
        title: impl Into<String>,
        event_type: DeliveryEventType,
        start_date: Timestamp,
    ) -> Self {
        Self {
            meta: Envelope::new(),
            title: title.into(),
            description: None,
            event_type,
            work_order_id: None,
            start_date,
            end_date: None,
            color_code: None,
            assigned_user_ids: Vec::new(),
        }
    }
}

/// A request from staff to change how the bank operates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub meta: Envelope,
    pub title: String,
    pub description: String,
    pub requested_by_user_id: EntityId,
    pub status: ChangeRequestStatus,
    pub resolution_notes: Option<String>,
    pub resolved_by_user_id: Option<EntityId>,
}

impl ChangeRequest {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        requested_by_user_id: EntityId,
    ) -> Self {
        Self {
            meta: Envelope::new(),
            title: title.into(),
            description: description.into(),
            requested_by_user_id,
            status: ChangeRequestStatus::Open,
            resolution_notes: None,
            resolved_by_user_id: None,
        }
    }
}

/// Message of the day shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motd {
    pub meta: Envelope,
    pub message: String,
    pub active_from: Option<Timestamp>,
    pub active_to: Option<Timestamp>,
    pub created_by_user_id: Option<EntityId>,
}

impl Motd {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            meta: Envelope::new(),
            message: message.into(),
            active_from: None,
            active_to: None,
            created_by_user_id: None,
        }
    }

    /// Whether the message should be shown at `at`. Deleted messages never are.
    pub fn is_active_at(&self, at: Timestamp) -> bool {
        !self.meta.is_deleted()
            && self.active_from.map_or(true, |from| from <= at)
            && self.active_to.map_or(true, |to| at <= to)
    }
}
