//! The version/merge envelope embedded in every entity.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use firewood_common::{EntityId, Error, Result, Timestamp};

/// Uniform sync metadata carried by every entity.
///
/// An `Envelope` can only be built through validating constructors, and
/// deserialization runs the same checks, so a value of this type always has
/// a non-nil id, a version of at least 1, and `updated_at >= created_at`.
/// Only [`crate::clock::stamp`] advances the version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope")]
pub struct Envelope {
    id: EntityId,
    created_at: Timestamp,
    updated_at: Timestamp,
    last_synced_at: Option<Timestamp>,
    version: u64,
    is_deleted: bool,
}

/// Unvalidated wire shape of an envelope.
#[derive(Deserialize)]
struct RawEnvelope {
    id: EntityId,
    created_at: Timestamp,
    updated_at: Timestamp,
    #[serde(default)]
    last_synced_at: Option<Timestamp>,
    version: u64,
    #[serde(default)]
    is_deleted: bool,
}

impl TryFrom<RawEnvelope> for Envelope {
    type Error = Error;

    fn try_from(raw: RawEnvelope) -> Result<Self> {
        Envelope::from_parts(
            raw.id,
            raw.created_at,
            raw.updated_at,
            raw.last_synced_at,
            raw.version,
            raw.is_deleted,
        )
    }
}

impl Envelope {
    /// Envelope for a brand-new entity with a fresh id, created now.
    pub fn new() -> Self {
        Self::new_at(Utc::now())
    }

    /// Envelope for a brand-new entity with a fresh id, created at `now`.
    pub fn new_at(now: Timestamp) -> Self {
        Self {
            id: EntityId::new(),
            created_at: now,
            updated_at: now,
            last_synced_at: None,
            version: 1,
            is_deleted: false,
        }
    }

    /// Envelope for a brand-new entity with a caller-chosen id.
    ///
    /// # Errors
    /// - `InvariantViolation` if `id` is nil
    pub fn with_id_at(id: EntityId, now: Timestamp) -> Result<Self> {
        Self::from_parts(id, now, now, None, 1, false)
    }

    /// Rebuild an envelope from persisted columns.
    ///
    /// # Errors
    /// - `InvariantViolation` for a nil id, version 0, or `updated_at < created_at`
    pub fn from_parts(
        id: EntityId,
        created_at: Timestamp,
        updated_at: Timestamp,
        last_synced_at: Option<Timestamp>,
        version: u64,
        is_deleted: bool,
    ) -> Result<Self> {
        let envelope = Self {
            id,
            created_at,
            updated_at,
            last_synced_at,
            version,
            is_deleted,
        };
        envelope.validate()?;
        Ok(envelope)
    }

    /// Check the structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_nil() {
            return Err(Error::InvariantViolation(
                "envelope is missing its identifier".to_string(),
            ));
        }
        if self.version == 0 {
            return Err(Error::InvariantViolation(format!(
                "envelope {} has version 0; versions start at 1",
                self.id
            )));
        }
        if self.updated_at < self.created_at {
            return Err(Error::InvariantViolation(format!(
                "envelope {} was updated ({}) before it was created ({})",
                self.id, self.updated_at, self.created_at
            )));
        }
        Ok(())
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn last_synced_at(&self) -> Option<Timestamp> {
        self.last_synced_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    /// Merge ordering key: version first, `updated_at` as tiebreak.
    pub fn order_key(&self) -> (u64, Timestamp) {
        (self.version, self.updated_at)
    }

    /// Whether this entity was edited after its last reconciliation.
    pub fn needs_sync(&self) -> bool {
        match self.last_synced_at {
            Some(synced) => synced < self.updated_at,
            None => true,
        }
    }

    /// Record a successful reconciliation.
    pub fn mark_synced(&mut self, at: Timestamp) {
        self.last_synced_at = Some(at);
    }

    /// Drop sync bookkeeping, leaving only the fields that define content.
    pub(crate) fn clear_sync_marker(&mut self) {
        self.last_synced_at = None;
    }

    /// Apply an accepted mutation. Callers have already checked the base version.
    pub(crate) fn advance(&mut self, now: Timestamp, is_deleted: bool) -> Result<()> {
        self.version = self.version.checked_add(1).ok_or_else(|| {
            Error::InvariantViolation(format!("version of {} overflowed", self.id))
        })?;
        self.updated_at = now.max(self.updated_at);
        self.is_deleted = is_deleted;
        Ok(())
    }

    /// Carry the immutable and sync-owned fields forward from `current`.
    pub(crate) fn inherit(&mut self, current: &Envelope) {
        self.created_at = current.created_at;
        self.updated_at = current.updated_at;
        self.last_synced_at = current.last_synced_at;
        self.is_deleted = current.is_deleted;
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}
