//! Merge resolution for two snapshots of the same entity.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, error};

use firewood_common::{Error, Result};
use firewood_model::Snapshot;

/// Which input a resolution winner came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Local,
    Remote,
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Accepted snapshot, taken whole from one side.
    pub winner: Snapshot,
    /// Both sides edited the same version and one edit was discarded.
    pub had_conflict: bool,
    pub side: Side,
}

/// Pick the accepted state of one entity from its local and remote snapshots.
///
/// Rules, in order:
/// 1. A tombstone beats a live snapshot at equal or lower version.
/// 2. The strictly higher version wins.
/// 3. At equal versions the later `updated_at` wins; differing content
///    flags a conflict. An exact timestamp tie falls back to the larger
///    content fingerprint.
///
/// The winner does not depend on argument order.
///
/// # Errors
/// - `InvariantViolation` if the snapshots have different ids or kinds, or
///   either envelope is malformed
/// - `MergeAmbiguous` if no ordering can be established
pub fn resolve(local: &Snapshot, remote: &Snapshot) -> Result<Resolution> {
    if local.id() != remote.id() {
        return Err(Error::InvariantViolation(format!(
            "cannot merge {} with {}",
            local.id(),
            remote.id()
        )));
    }
    if local.kind() != remote.kind() {
        return Err(Error::InvariantViolation(format!(
            "{} is a {} locally but a {} remotely",
            local.id(),
            local.kind(),
            remote.kind()
        )));
    }
    local.envelope().validate()?;
    remote.envelope().validate()?;

    let (ordering, had_conflict) = compare(local, remote)?;
    let resolution = match ordering {
        Ordering::Less => Resolution {
            winner: remote.clone(),
            had_conflict,
            side: Side::Remote,
        },
        _ => Resolution {
            winner: local.clone(),
            had_conflict,
            side: Side::Local,
        },
    };

    debug!(
        "Resolved {} {} in favour of {:?} v{} (conflict: {})",
        local.kind(),
        local.id(),
        resolution.side,
        resolution.winner.envelope().version(),
        had_conflict
    );
    Ok(resolution)
}

/// Order `a` against `b`; `Equal` only when they are interchangeable.
fn compare(a: &Snapshot, b: &Snapshot) -> Result<(Ordering, bool)> {
    let (ea, eb) = (a.envelope(), b.envelope());

    if ea.is_deleted() != eb.is_deleted() {
        let a_dead = ea.is_deleted();
        let (dead, live) = if a_dead { (ea, eb) } else { (eb, ea) };
        if dead.version() >= live.version() {
            let ordering = if a_dead { Ordering::Greater } else { Ordering::Less };
            return Ok((ordering, dead.version() == live.version()));
        }
        return Ok((ea.version().cmp(&eb.version()), false));
    }

    match ea.version().cmp(&eb.version()) {
        Ordering::Equal => {}
        ordering => return Ok((ordering, false)),
    }

    if a.content_eq(b) {
        // Same state observed by both; keep the fresher sync marker.
        return Ok((ea.last_synced_at().cmp(&eb.last_synced_at()), false));
    }

    match ea.updated_at().cmp(&eb.updated_at()) {
        Ordering::Equal => {}
        ordering => return Ok((ordering, true)),
    }

    match a.fingerprint()?.cmp(&b.fingerprint()?) {
        Ordering::Equal => {
            error!(
                "Cannot order {} {}: equal fingerprints but different content",
                a.kind(),
                a.id()
            );
            Err(Error::MergeAmbiguous(format!(
                "{} {} v{} has two indistinguishable states",
                a.kind(),
                a.id(),
                ea.version()
            )))
        }
        ordering => Ok((ordering, true)),
    }
}
