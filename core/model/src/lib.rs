//! Record schemas and the sync envelope for the Firewood Bank core.
//!
//! Every entity embeds an [`Envelope`] carrying its identifier, timestamps,
//! version and tombstone flag. The [`clock`] module is the only place that
//! advances an envelope; everything else treats it as read-only.

pub mod clock;
pub mod envelope;
pub mod records;
pub mod snapshot;
pub mod status;

pub use clock::{stamp, StampKind};
pub use envelope::Envelope;
pub use records::{
    Address, ChangeRequest, Client, ClientSnapshot, ContactInfo, DeliveryEvent,
    DeliveryEventType, HeatSourceInfo, InventoryItem, Invoice, InvoiceLineItem, Motd, Record,
    User, WorkOrder,
};
pub use snapshot::Snapshot;
pub use status::{ApprovalStatus, ChangeRequestStatus, InvoiceStatus, WorkOrderStatus};
