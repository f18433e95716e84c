//! Common types used throughout the Firewood Bank core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamps are always UTC.
pub type Timestamp = DateTime<Utc>;

/// Stable, opaque identifier of an entity.
///
/// The nil UUID is reserved as "missing identifier" and never produced by
/// [`EntityId::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The nil identifier, used only to represent a missing id.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Parse an identifier from its hyphenated string form.
    ///
    /// # Errors
    /// - Returns error if `s` is not a UUID
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| crate::Error::InvalidInput(format!("Invalid entity id '{}': {}", s, e)))
    }

    /// Whether this is the nil (missing) identifier.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s)
    }
}

/// Every kind of entity that carries a sync envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Client,
    WorkOrder,
    Invoice,
    User,
    InventoryItem,
    DeliveryEvent,
    ChangeRequest,
    Motd,
}

impl EntityKind {
    /// All kinds, in a stable order.
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Client,
        EntityKind::WorkOrder,
        EntityKind::Invoice,
        EntityKind::User,
        EntityKind::InventoryItem,
        EntityKind::DeliveryEvent,
        EntityKind::ChangeRequest,
        EntityKind::Motd,
    ];

    /// Snake-case name, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Client => "client",
            EntityKind::WorkOrder => "work_order",
            EntityKind::Invoice => "invoice",
            EntityKind::User => "user",
            EntityKind::InventoryItem => "inventory_item",
            EntityKind::DeliveryEvent => "delivery_event",
            EntityKind::ChangeRequest => "change_request",
            EntityKind::Motd => "motd",
        }
    }

    /// Table name used in audit records.
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Client => "clients",
            EntityKind::WorkOrder => "work_orders",
            EntityKind::Invoice => "invoices",
            EntityKind::User => "users",
            EntityKind::InventoryItem => "inventory_items",
            EntityKind::DeliveryEvent => "delivery_events",
            EntityKind::ChangeRequest => "change_requests",
            EntityKind::Motd => "motd",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s || k.table_name() == s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown entity kind: {}", s)))
    }
}

/// Role of the person (or process) performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Lead,
    Staff,
    Driver,
    /// Background processes such as reconciliation.
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Lead => "lead",
            Role::Staff => "staff",
            Role::Driver => "driver",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "lead" => Ok(Role::Lead),
            "staff" => Ok(Role::Staff),
            "driver" => Ok(Role::Driver),
            "system" => Ok(Role::System),
            other => Err(crate::Error::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// Who performed an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Display or login name.
    pub name: String,
    /// Role at the time of the operation.
    pub role: Role,
    /// User record backing this actor, when known.
    pub user_id: Option<EntityId>,
}

impl Actor {
    /// Create an actor without a backing user record.
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
            user_id: None,
        }
    }

    /// The actor used for reconciliation passes.
    pub fn system() -> Self {
        Self::new("sync", Role::System)
    }

    /// Attach the user record id.
    pub fn with_user_id(mut self, user_id: EntityId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Reject actors with a blank name.
    ///
    /// # Errors
    /// - Returns error if the name is empty or whitespace
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::InvalidInput(
                "Actor name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.role)
    }
}
