//! Type-erased entity snapshots exchanged between installs.

use serde::{Deserialize, Serialize};

use firewood_common::{EntityId, EntityKind, Error, Result};

use crate::envelope::Envelope;
use crate::records::{
    ChangeRequest, Client, DeliveryEvent, InventoryItem, Invoice, Motd, Record, User, WorkOrder,
};

/// A full entity with intact envelope metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Snapshot {
    Client(Client),
    WorkOrder(WorkOrder),
    Invoice(Invoice),
    User(User),
    InventoryItem(InventoryItem),
    DeliveryEvent(DeliveryEvent),
    ChangeRequest(ChangeRequest),
    Motd(Motd),
}

macro_rules! each_variant {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            Snapshot::Client($inner) => $body,
            Snapshot::WorkOrder($inner) => $body,
            Snapshot::Invoice($inner) => $body,
            Snapshot::User($inner) => $body,
            Snapshot::InventoryItem($inner) => $body,
            Snapshot::DeliveryEvent($inner) => $body,
            Snapshot::ChangeRequest($inner) => $body,
            Snapshot::Motd($inner) => $body,
        }
    };
}

macro_rules! status_of {
    ($record:ident,) => {
        None
    };
    ($record:ident, $field:ident) => {
        Some($record.$field.as_str())
    };
}

macro_rules! impl_record {
    ($($ty:ident => $kind:ident { $(status: $field:ident)? }),+ $(,)?) => {
        $(
            impl Record for $ty {
                const KIND: EntityKind = EntityKind::$kind;

                fn envelope(&self) -> &Envelope {
                    &self.meta
                }

                fn envelope_mut(&mut self) -> &mut Envelope {
                    &mut self.meta
                }

                fn workflow_status(&self) -> Option<&'static str> {
                    status_of!(self, $($field)?)
                }

                fn into_snapshot(self) -> Snapshot {
                    Snapshot::$ty(self)
                }

                fn from_snapshot(snapshot: Snapshot) -> Option<Self> {
                    match snapshot {
                        Snapshot::$ty(record) => Some(record),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Snapshot {
                fn from(record: $ty) -> Self {
                    Snapshot::$ty(record)
                }
            }
        )+
    };
}

impl_record! {
    Client => Client { status: approval_status },
    WorkOrder => WorkOrder { status: status },
    Invoice => Invoice { status: status },
    User => User {},
    InventoryItem => InventoryItem {},
    DeliveryEvent => DeliveryEvent {},
    ChangeRequest => ChangeRequest { status: status },
    Motd => Motd {},
}

impl Snapshot {
    pub fn kind(&self) -> EntityKind {
        match self {
            Snapshot::Client(_) => EntityKind::Client,
            Snapshot::WorkOrder(_) => EntityKind::WorkOrder,
            Snapshot::Invoice(_) => EntityKind::Invoice,
            Snapshot::User(_) => EntityKind::User,
            Snapshot::InventoryItem(_) => EntityKind::InventoryItem,
            Snapshot::DeliveryEvent(_) => EntityKind::DeliveryEvent,
            Snapshot::ChangeRequest(_) => EntityKind::ChangeRequest,
            Snapshot::Motd(_) => EntityKind::Motd,
        }
    }

    pub fn envelope(&self) -> &Envelope {
        each_variant!(self, r => r.envelope())
    }

    pub fn envelope_mut(&mut self) -> &mut Envelope {
        each_variant!(self, r => r.envelope_mut())
    }

    pub fn id(&self) -> EntityId {
        self.envelope().id()
    }

    pub fn workflow_status(&self) -> Option<&'static str> {
        each_variant!(self, r => r.workflow_status())
    }

    pub fn as_client(&self) -> Option<&Client> {
        match self {
            Snapshot::Client(client) => Some(client),
            _ => None,
        }
    }

    /// Copy with sync bookkeeping removed; what two installs compare.
    pub fn content(&self) -> Snapshot {
        let mut copy = self.clone();
        copy.envelope_mut().clear_sync_marker();
        copy
    }

    /// Equality ignoring `last_synced_at`.
    pub fn content_eq(&self, other: &Snapshot) -> bool {
        self.content() == other.content()
    }

    /// Canonical JSON of [`Snapshot::content`], used as a deterministic tiebreak.
    pub fn fingerprint(&self) -> Result<String> {
        serde_json::to_string(&self.content()).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse a JSON array of snapshots, the store-and-forward exchange format.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Serialize a batch of snapshots as a JSON array.
    pub fn list_to_json(snapshots: &[Snapshot]) -> Result<String> {
        serde_json::to_string_pretty(snapshots).map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Address, InventoryItem};
    use chrono::Utc;

    fn client() -> Client {
        Client::new("C-7", "Ada Byron", Address::new("1 Mill Rd", "Dover", "NH", "03820"))
    }

    #[test]
    fn test_snapshot_json_is_tagged_by_kind() {
        let snapshot: Snapshot = client().into();
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"kind\": \"client\""));
        assert!(json.contains("\"approval_status\": \"pending\""));

        let back = Snapshot::from_json(&json).unwrap();
        assert_eq!(back.kind(), EntityKind::Client);
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_content_eq_ignores_sync_marker() {
        let a: Snapshot = client().into();
        let mut b = a.clone();
        b.envelope_mut().mark_synced(Utc::now());
        assert_ne!(a, b);
        assert!(a.content_eq(&b));
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn test_content_eq_sees_field_changes() {
        let original = client();
        let mut edited = original.clone();
        edited.notes = Some("dog in yard".into());
        assert!(!Snapshot::from(original).content_eq(&Snapshot::from(edited)));
    }

    #[test]
    fn test_record_roundtrip_through_snapshot() {
        let item = InventoryItem::new("Helmet", "pcs", 4.0);
        let id = item.id();
        let snapshot = item.into_snapshot();
        assert_eq!(snapshot.id(), id);
        assert!(Client::from_snapshot(snapshot.clone()).is_none());
        assert_eq!(InventoryItem::from_snapshot(snapshot).unwrap().id(), id);
    }

    #[test]
    fn test_list_from_json_rejects_malformed_envelope() {
        let mut value = serde_json::to_value(vec![Snapshot::from(client())]).unwrap();
        value[0]["meta"]["version"] = serde_json::json!(0);
        let json = serde_json::to_string(&value).unwrap();
        assert!(Snapshot::list_from_json(&json).is_err());
    }
}
