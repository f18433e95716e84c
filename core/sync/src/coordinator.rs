//! Sync coordinator.
//!
//! A reconciliation pass takes the local snapshot set and a batch received
//! from another install and produces the merged set to persist, along with
//! conflict reports and the audit entries for remote changes that were
//! accepted. The pass is a pure function; committing its output atomically
//! is the store's job.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use firewood_common::{Actor, EntityId, Result, Timestamp};
use firewood_model::Snapshot;
use firewood_workflow::{record, AuditEvent, AuditLogEntry, FieldChange};

use crate::conflict::{find_conflicts, identity_conflicts, ConflictFinding, DuplicatePolicy};
use crate::merge::{resolve, Side};

/// Inputs that are the same for every entity in one pass.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    /// Written to `last_synced_at` of every merged entity.
    pub synced_at: Timestamp,
    /// Recorded on `sync_accept` audit entries.
    pub actor: Actor,
    pub policy: DuplicatePolicy,
}

impl ReconcileContext {
    pub fn new(synced_at: Timestamp) -> Self {
        Self {
            synced_at,
            actor: Actor::system(),
            policy: DuplicatePolicy::default(),
        }
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    /// Needs a human to look, but nothing was blocked.
    Warning,
    /// Decided automatically; reported for visibility.
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    ConcurrentEdit,
    DivergentOrigin,
    SemanticDuplicate,
}

/// A conflict surfaced by a reconciliation pass. Never blocks the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub entity_id: EntityId,
    pub kind: ConflictKind,
    pub severity: ConflictSeverity,
    pub detail: String,
}

impl ConflictReport {
    /// Reports the pass should not see again when run over its own output.
    pub fn is_true_conflict(&self) -> bool {
        self.kind != ConflictKind::SemanticDuplicate
    }
}

/// Output of [`reconcile`].
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Accepted state of every entity, sorted by id.
    pub merged: Vec<Snapshot>,
    pub conflicts: Vec<ConflictReport>,
    /// One `sync_accept` entry per entity whose local state was replaced.
    pub audit: Vec<AuditLogEntry>,
    /// Version of each id in the local input as this pass read it. Ids
    /// missing here were not stored locally.
    pub local_versions: BTreeMap<EntityId, u64>,
}

impl Reconciliation {
    /// Ids whose accepted state came from the remote batch.
    pub fn accepted_ids(&self) -> BTreeSet<EntityId> {
        self.audit.iter().filter_map(|entry| entry.entity_id).collect()
    }
}

/// Merge `remote` into `local`.
///
/// Reconciling the merged output against an empty batch with the same
/// `synced_at` reproduces it exactly.
///
/// # Errors
/// - `InvariantViolation` if any envelope on either side is malformed, or
///   one id names two kinds of entity; nothing is returned in that case
/// - `MergeAmbiguous` if two states of one entity cannot be ordered
pub fn reconcile(
    local: &[Snapshot],
    remote: &[Snapshot],
    ctx: &ReconcileContext,
) -> Result<Reconciliation> {
    for snapshot in local.iter().chain(remote) {
        snapshot.envelope().validate()?;
    }

    let mut out = Reconciliation::default();
    let local = collapse(local, &mut out.conflicts)?;
    let remote = collapse(remote, &mut out.conflicts)?;
    let ids: BTreeSet<EntityId> = local.keys().chain(remote.keys()).copied().collect();
    out.local_versions = local.iter().map(|(id, s)| (*id, s.envelope().version())).collect();

    for id in ids {
        let accepted = match (local.get(&id), remote.get(&id)) {
            (Some(mine), None) => mine.clone(),
            (None, Some(theirs)) => {
                out.audit.push(accept_entry(None, theirs, ctx));
                theirs.clone()
            }
            (Some(mine), Some(theirs)) => {
                let resolution = resolve(mine, theirs)?;
                let findings = pair_findings(mine, theirs, resolution.had_conflict);
                out.conflicts.extend(findings.iter().filter_map(report));
                if resolution.side == Side::Remote && !resolution.winner.content_eq(mine) {
                    out.audit.push(accept_entry(Some(mine), theirs, ctx));
                }
                resolution.winner
            }
            (None, None) => continue,
        };
        out.merged.push(accepted);
    }

    for snapshot in &mut out.merged {
        // a skewed remote clock must not leave the entity looking unsynced
        let synced_at = ctx.synced_at.max(snapshot.envelope().updated_at());
        snapshot.envelope_mut().mark_synced(synced_at);
    }

    out.conflicts.extend(duplicate_reports(&out.merged, &ctx.policy));
    out.conflicts
        .sort_by(|a, b| (a.entity_id, a.kind, &a.detail).cmp(&(b.entity_id, b.kind, &b.detail)));

    info!(
        "Reconciled {} local and {} remote entities: {} merged, {} accepted, {} conflicts",
        local.len(),
        remote.len(),
        out.merged.len(),
        out.audit.len(),
        out.conflicts.len()
    );
    Ok(out)
}

/// Keep only the current snapshot per id within one side, reporting
/// divergent copies of the same id into `conflicts`.
fn collapse(
    snapshots: &[Snapshot],
    conflicts: &mut Vec<ConflictReport>,
) -> Result<BTreeMap<EntityId, Snapshot>> {
    let mut current: BTreeMap<EntityId, Snapshot> = BTreeMap::new();
    for snapshot in snapshots {
        match current.entry(snapshot.id()) {
            Entry::Vacant(slot) => {
                slot.insert(snapshot.clone());
            }
            Entry::Occupied(mut slot) => {
                let resolution = resolve(slot.get(), snapshot)?;
                let findings = pair_findings(slot.get(), snapshot, resolution.had_conflict);
                conflicts.extend(findings.iter().filter_map(report));
                slot.insert(resolution.winner);
            }
        }
    }
    Ok(current)
}

/// Identity findings for two states of one id, plus a concurrent edit
/// whenever the resolver had to break a tie the detector did not flag.
fn pair_findings(a: &Snapshot, b: &Snapshot, had_conflict: bool) -> Vec<ConflictFinding> {
    let mut findings = identity_conflicts(a, b);
    let flagged = findings
        .iter()
        .any(|f| matches!(f, ConflictFinding::ConcurrentEdit { .. }));
    if had_conflict && !flagged {
        findings.push(ConflictFinding::ConcurrentEdit {
            id: a.id(),
            version: a.envelope().version().max(b.envelope().version()),
        });
    }
    findings
}

fn accept_entry(mine: Option<&Snapshot>, theirs: &Snapshot, ctx: &ReconcileContext) -> AuditLogEntry {
    let change = FieldChange::new(
        "version",
        mine.map(|s| s.envelope().version().to_string()),
        Some(theirs.envelope().version().to_string()),
    );
    record(
        AuditEvent::SyncAccept,
        &ctx.actor,
        Some((theirs.kind(), theirs.id())),
        Some(change),
        ctx.synced_at,
    )
}

fn report(finding: &ConflictFinding) -> Option<ConflictReport> {
    match *finding {
        ConflictFinding::ConcurrentEdit { id, version } => Some(ConflictReport {
            entity_id: id,
            kind: ConflictKind::ConcurrentEdit,
            severity: ConflictSeverity::Resolved,
            detail: format!("both sides edited v{}; kept the later edit", version),
        }),
        ConflictFinding::DivergentOrigin { id } => {
            warn!("Entity {} was created independently on two installs", id);
            Some(ConflictReport {
                entity_id: id,
                kind: ConflictKind::DivergentOrigin,
                severity: ConflictSeverity::Warning,
                detail: "same id created independently on two installs".to_string(),
            })
        }
        // duplicates are reported over the merged set; kind mismatches fail resolve()
        ConflictFinding::KindMismatch { .. } | ConflictFinding::SemanticDuplicate { .. } => None,
    }
}

/// Duplicate warnings over the live merged clients, one per unordered pair.
fn duplicate_reports(merged: &[Snapshot], policy: &DuplicatePolicy) -> Vec<ConflictReport> {
    let clients: Vec<Snapshot> = merged
        .iter()
        .filter(|s| s.as_client().is_some() && !s.envelope().is_deleted())
        .cloned()
        .collect();

    let mut pairs = BTreeSet::new();
    for candidate in &clients {
        for finding in find_conflicts(candidate, &clients, policy) {
            if let ConflictFinding::SemanticDuplicate { candidate, existing } = finding {
                pairs.insert((candidate.min(existing), candidate.max(existing)));
            }
        }
    }

    pairs
        .into_iter()
        .map(|(first, second)| ConflictReport {
            entity_id: first,
            kind: ConflictKind::SemanticDuplicate,
            severity: ConflictSeverity::Warning,
            detail: format!("possible duplicate of client {}", second),
        })
        .collect()
}
