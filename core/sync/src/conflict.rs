//! Conflict detection.
//!
//! Two families of collision are detected:
//! - identity conflicts, where two snapshots share an id but their version
//!   chains diverged
//! - semantic duplicates, where two different client ids most likely describe
//!   the same household

use serde::{Deserialize, Serialize};

use firewood_common::{EntityId, EntityKind};
use firewood_model::{Client, Snapshot};

/// How aggressively client records are matched as duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicatePolicy {
    /// Turn duplicate detection off entirely.
    pub enabled: bool,
    /// Ignore punctuation, so "12 Elm St." matches "12 Elm St".
    pub strip_punctuation: bool,
    /// Also require the postal codes to agree.
    pub match_postal_code: bool,
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            strip_punctuation: false,
            match_postal_code: false,
        }
    }
}

/// A detected collision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConflictFinding {
    /// Both sides edited the same version independently.
    ConcurrentEdit { id: EntityId, version: u64 },
    /// Same id, different `created_at`: the two chains never shared an origin.
    DivergentOrigin { id: EntityId },
    /// Same id used for two different kinds of entity.
    KindMismatch {
        id: EntityId,
        left: EntityKind,
        right: EntityKind,
    },
    /// Two live clients that look like the same household.
    SemanticDuplicate {
        candidate: EntityId,
        existing: EntityId,
    },
}

impl ConflictFinding {
    /// Ids involved in the collision.
    pub fn ids(&self) -> Vec<EntityId> {
        match self {
            ConflictFinding::ConcurrentEdit { id, .. }
            | ConflictFinding::DivergentOrigin { id }
            | ConflictFinding::KindMismatch { id, .. } => vec![*id],
            ConflictFinding::SemanticDuplicate { candidate, existing } => {
                vec![*candidate, *existing]
            }
        }
    }

    /// Duplicates are advisory; everything else is an identity problem.
    pub fn is_identity(&self) -> bool {
        !matches!(self, ConflictFinding::SemanticDuplicate { .. })
    }
}

/// Identity conflicts between two snapshots of the same id, if any.
pub fn identity_conflicts(left: &Snapshot, right: &Snapshot) -> Vec<ConflictFinding> {
    let id = left.id();
    if id != right.id() {
        return Vec::new();
    }
    if left.kind() != right.kind() {
        return vec![ConflictFinding::KindMismatch {
            id,
            left: left.kind(),
            right: right.kind(),
        }];
    }

    let mut findings = Vec::new();
    let (l, r) = (left.envelope(), right.envelope());
    if l.created_at() != r.created_at() {
        findings.push(ConflictFinding::DivergentOrigin { id });
    }
    if l.version() == r.version() && !left.content_eq(right) {
        findings.push(ConflictFinding::ConcurrentEdit {
            id,
            version: l.version(),
        });
    }
    findings
}

/// All collisions between `candidate` and an existing set.
///
/// Identity conflicts are always reported. Duplicate warnings are only
/// produced for live clients and only when the policy enables them.
pub fn find_conflicts(
    candidate: &Snapshot,
    existing: &[Snapshot],
    policy: &DuplicatePolicy,
) -> Vec<ConflictFinding> {
    let mut findings: Vec<ConflictFinding> = existing
        .iter()
        .flat_map(|other| identity_conflicts(candidate, other))
        .collect();

    if let Some(client) = candidate.as_client() {
        if !client.meta.is_deleted() {
            findings.extend(
                duplicates_of(client, existing.iter().filter_map(Snapshot::as_client), policy)
                    .map(|existing| ConflictFinding::SemanticDuplicate {
                        candidate: client.meta.id(),
                        existing,
                    }),
            );
        }
    }
    findings
}

/// Whether a client about to be onboarded looks like one already on file.
pub fn check_new_client(client: &Client, existing: &[Client], policy: &DuplicatePolicy) -> bool {
    duplicates_of(client, existing.iter(), policy).next().is_some()
}

fn duplicates_of<'a>(
    client: &'a Client,
    existing: impl Iterator<Item = &'a Client> + 'a,
    policy: &'a DuplicatePolicy,
) -> impl Iterator<Item = EntityId> + 'a {
    let key = policy.enabled.then(|| match_key(client, policy));
    existing
        .filter(move |other| {
            key.is_some()
                && !other.meta.is_deleted()
                && other.meta.id() != client.meta.id()
                && key.as_ref() == Some(&match_key(other, policy))
        })
        .map(|other| other.meta.id())
}

fn match_key(client: &Client, policy: &DuplicatePolicy) -> Vec<String> {
    let address = &client.physical_address;
    let mut key = vec![
        normalize(&client.name, policy),
        normalize(&address.line1, policy),
        normalize(&address.city, policy),
        normalize(&address.state, policy),
    ];
    if policy.match_postal_code {
        key.push(normalize(&address.postal_code, policy));
    }
    key
}

/// Lowercase and collapse runs of whitespace.
fn normalize(value: &str, policy: &DuplicatePolicy) -> String {
    let lowered = value.to_lowercase();
    let cleaned: String = if policy.strip_punctuation {
        lowered
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect()
    } else {
        lowered
    };
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
