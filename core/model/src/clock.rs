//! Version clock and soft-delete ledger.
//!
//! [`stamp`] is the single place where an envelope moves forward: it bumps
//! the version by exactly one, refreshes `updated_at`, and flips the
//! tombstone for deletes and restores.

use serde::{Deserialize, Serialize};

use firewood_common::{Error, Result, Timestamp};

use crate::envelope::Envelope;
use crate::records::Record;

/// What kind of mutation is being stamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StampKind {
    /// Ordinary edit of a live entity.
    Edit,
    /// Soft delete; the entity becomes a tombstone.
    Delete,
    /// Bring a tombstone back.
    Restore,
}

/// Accept an edit made against `current`.
///
/// `edited` must carry the version it was loaded at; anything else means
/// the caller worked from a stale (or fabricated) base. `created_at` and
/// `last_synced_at` are always taken from `current`.
///
/// # Errors
/// - `InvariantViolation` if ids differ, the base version is stale or ahead,
///   or the version would overflow
/// - `InvalidInput` for edits/deletes of a tombstone or restores of a live entity
pub fn stamp<R: Record>(
    current: &Envelope,
    mut edited: R,
    kind: StampKind,
    now: Timestamp,
) -> Result<R> {
    current.validate()?;
    let base = edited.envelope();

    if base.id() != current.id() {
        return Err(Error::InvariantViolation(format!(
            "{} {} cannot be stamped against envelope {}",
            R::KIND,
            base.id(),
            current.id()
        )));
    }
    if base.version() < current.version() {
        return Err(Error::InvariantViolation(format!(
            "stale base version {} for {} {}; current version is {}",
            base.version(),
            R::KIND,
            current.id(),
            current.version()
        )));
    }
    if base.version() > current.version() {
        return Err(Error::InvariantViolation(format!(
            "base version {} for {} {} is ahead of current version {}",
            base.version(),
            R::KIND,
            current.id(),
            current.version()
        )));
    }

    let is_deleted = match (kind, current.is_deleted()) {
        (StampKind::Edit, false) => false,
        (StampKind::Delete, false) => true,
        (StampKind::Restore, true) => false,
        (StampKind::Edit, true) => {
            return Err(Error::InvalidInput(format!(
                "{} {} is deleted; restore it before editing",
                R::KIND,
                current.id()
            )))
        }
        (StampKind::Delete, true) => {
            return Err(Error::InvalidInput(format!(
                "{} {} is already deleted",
                R::KIND,
                current.id()
            )))
        }
        (StampKind::Restore, false) => {
            return Err(Error::InvalidInput(format!(
                "{} {} is not deleted",
                R::KIND,
                current.id()
            )))
        }
    };

    let envelope = edited.envelope_mut();
    envelope.inherit(current);
    envelope.advance(now, is_deleted)?;
    Ok(edited)
}
