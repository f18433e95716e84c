//! SQLite persistence for snapshots, status history and the audit log.

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use firewood_common::{EntityId, EntityKind, Error, Result, Timestamp};
use firewood_model::{Record, Snapshot};
use firewood_sync::{current, pending_changes, PendingChange, Reconciliation, SortOrder};
use firewood_workflow::{AuditLogEntry, HistoryRecord, Stamped, Transitioned, WorkflowEntity};

use crate::rows::{decode_ts, encode_ts, encode_version, sql, AuditRow, HistoryRow};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS entities (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        version INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        last_synced_at TEXT,
        is_deleted INTEGER NOT NULL,
        body TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_entities_kind ON entities(kind, is_deleted);

    CREATE TABLE IF NOT EXISTS status_history (
        id TEXT PRIMARY KEY,
        workflow TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        old_status TEXT NOT NULL,
        new_status TEXT NOT NULL,
        actor TEXT NOT NULL,
        role TEXT NOT NULL,
        reason TEXT,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_status_history_entity ON status_history(entity_id, created_at);

    CREATE TABLE IF NOT EXISTS audit_logs (
        id TEXT PRIMARY KEY,
        event TEXT NOT NULL,
        role TEXT NOT NULL,
        actor TEXT NOT NULL,
        entity TEXT,
        entity_id TEXT,
        field TEXT,
        old_value TEXT,
        new_value TEXT,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_audit_logs_created ON audit_logs(created_at);

    CREATE TRIGGER IF NOT EXISTS audit_logs_no_update BEFORE UPDATE ON audit_logs
    BEGIN
        SELECT RAISE(ABORT, 'audit log is append-only');
    END;

    CREATE TRIGGER IF NOT EXISTS audit_logs_no_delete BEFORE DELETE ON audit_logs
    BEGIN
        SELECT RAISE(ABORT, 'audit log is append-only');
    END;
"#;

/// How an entity write is guarded against concurrent writers.
#[derive(Debug, Clone, Copy)]
enum Guard {
    /// The id must not exist yet.
    New,
    /// The stored row must be exactly one version behind.
    Successor,
    /// The stored row must still be at the version a reconciliation pass
    /// read, or still be absent when the pass read nothing.
    Unchanged(Option<u64>),
}

/// The application-state owner: a single SQLite database.
///
/// Every write runs in one transaction under the connection lock, so
/// writers are serialized and each accepted mutation lands together with
/// its audit entry or not at all.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create or open a store database.
    ///
    /// # Errors
    /// - `Storage` if the database cannot be opened or the schema cannot be created
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).map_err(sql)?;
        conn.execute_batch(SCHEMA).map_err(sql)?;
        info!("Store opened at {}", db_path.as_ref().display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("connection lock poisoned".to_string()))
    }

    /// Persist a newly created record with its audit entry.
    pub fn insert(&self, snapshot: &Snapshot, audit: &AuditLogEntry) -> Result<()> {
        self.write(|tx| {
            write_entity(tx, snapshot, Guard::New)?;
            write_audit(tx, audit)
        })
    }

    /// Persist an accepted edit, delete or restore with its audit entry.
    ///
    /// # Errors
    /// - `InvariantViolation` if the stored row moved on since the edit was loaded
    pub fn save(&self, snapshot: &Snapshot, audit: &AuditLogEntry) -> Result<()> {
        self.write(|tx| {
            write_entity(tx, snapshot, Guard::Successor)?;
            write_audit(tx, audit)
        })
    }

    /// Persist an accepted transition with its history row and audit entry.
    pub fn save_transition(
        &self,
        snapshot: &Snapshot,
        history: &HistoryRecord,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        self.write(|tx| {
            write_entity(tx, snapshot, Guard::Successor)?;
            write_history(tx, history)?;
            write_audit(tx, audit)
        })
    }

    /// Persist a batch of newly created records in one transaction. One
    /// rejected record leaves the whole batch unwritten.
    pub fn insert_all(&self, created: &[Stamped<Snapshot>]) -> Result<()> {
        self.write(|tx| {
            for stamped in created {
                write_entity(tx, &stamped.record, Guard::New)?;
                write_audit(tx, &stamped.audit)?;
            }
            Ok(())
        })?;
        info!("Inserted {} records", created.len());
        Ok(())
    }

    pub fn insert_record<R: Record>(&self, created: &Stamped<R>) -> Result<()> {
        self.insert(&created.record.clone().into_snapshot(), &created.audit)
    }

    pub fn save_record<R: Record>(&self, stamped: &Stamped<R>) -> Result<()> {
        self.save(&stamped.record.clone().into_snapshot(), &stamped.audit)
    }

    pub fn save_transitioned<E: WorkflowEntity>(&self, moved: &Transitioned<E>) -> Result<()> {
        self.save_transition(
            &moved.record.clone().into_snapshot(),
            &HistoryRecord::from(moved.history.clone()),
            &moved.audit,
        )
    }

    /// Commit a whole reconciliation pass atomically.
    ///
    /// # Errors
    /// - `InvariantViolation` if any stored entity is no longer at the version
    ///   the pass read, meaning a local write landed after the pass read its
    ///   input; nothing is written
    pub fn commit_reconciliation(&self, pass: &Reconciliation) -> Result<()> {
        self.write(|tx| {
            for snapshot in &pass.merged {
                let read = pass.local_versions.get(&snapshot.id()).copied();
                write_entity(tx, snapshot, Guard::Unchanged(read))?;
            }
            for entry in &pass.audit {
                write_audit(tx, entry)?;
            }
            Ok(())
        })?;
        info!(
            "Committed reconciliation: {} entities, {} audit entries",
            pass.merged.len(),
            pass.audit.len()
        );
        Ok(())
    }

    fn write<F>(&self, body: F) -> Result<()>
    where
        F: FnOnce(&Transaction<'_>) -> Result<()>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(sql)?;
        // dropping `tx` on error rolls back
        body(&tx)?;
        tx.commit().map_err(sql)
    }

    /// Every stored snapshot, tombstones included, ordered by id.
    pub fn snapshots(&self) -> Result<Vec<Snapshot>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT body FROM entities ORDER BY id")
            .map_err(sql)?;
        let bodies = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(sql)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sql)?;
        bodies.iter().map(|body| Snapshot::from_json(body)).collect()
    }

    pub fn get(&self, id: EntityId) -> Result<Option<Snapshot>> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM entities WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql)?;
        body.as_deref().map(Snapshot::from_json).transpose()
    }

    /// Load one record of a known type.
    ///
    /// # Errors
    /// - `NotFound` if the id is unknown
    /// - `InvalidInput` if the id belongs to another kind of entity
    pub fn load<R: Record>(&self, id: EntityId) -> Result<R> {
        let snapshot = self
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("{} {}", R::KIND, id)))?;
        let kind = snapshot.kind();
        R::from_snapshot(snapshot)
            .ok_or_else(|| Error::InvalidInput(format!("{} is a {}, not a {}", id, kind, R::KIND)))
    }

    /// Live entities, optionally of one kind.
    pub fn current(&self, kind: Option<EntityKind>, order: SortOrder) -> Result<Vec<Snapshot>> {
        Ok(current(&self.snapshots()?, kind, order))
    }

    /// Entities edited since their last reconciliation.
    pub fn pending(&self) -> Result<Vec<PendingChange>> {
        Ok(pending_changes(&self.snapshots()?))
    }

    /// The audit log in insertion-time order.
    pub fn audit_log(&self) -> Result<Vec<AuditLogEntry>> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {} FROM audit_logs ORDER BY created_at, id",
            AuditRow::COLUMNS
        );
        let mut stmt = conn.prepare(&query).map_err(sql)?;
        let rows = stmt
            .query_map([], AuditRow::read)
            .map_err(sql)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sql)?;
        rows.into_iter().map(AuditRow::decode).collect()
    }

    /// All status history rows in time order.
    pub fn history(&self) -> Result<Vec<HistoryRecord>> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {} FROM status_history ORDER BY created_at, id",
            HistoryRow::COLUMNS
        );
        let mut stmt = conn.prepare(&query).map_err(sql)?;
        let rows = stmt
            .query_map([], HistoryRow::read)
            .map_err(sql)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sql)?;
        rows.into_iter().map(HistoryRow::decode).collect()
    }

    /// Last time this store committed a reconciliation, if ever.
    pub fn last_reconciled_at(&self) -> Result<Option<Timestamp>> {
        let conn = self.conn()?;
        let latest: Option<String> = conn
            .query_row("SELECT MAX(last_synced_at) FROM entities", [], |row| row.get(0))
            .map_err(sql)?;
        latest.as_deref().map(decode_ts).transpose()
    }

    /// Get total entity count, tombstones included.
    pub fn count(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))
            .map_err(sql)?;
        Ok(count.max(0) as u64)
    }
}

fn write_entity(tx: &Transaction<'_>, snapshot: &Snapshot, guard: Guard) -> Result<()> {
    let meta = snapshot.envelope();
    meta.validate()?;
    let id = meta.id().to_string();
    let version = encode_version(meta.version())?;
    let body = snapshot.to_json()?;
    let created_at = encode_ts(&meta.created_at());
    let updated_at = encode_ts(&meta.updated_at());
    let last_synced_at = meta.last_synced_at().map(|ts| encode_ts(&ts));
    let values = params![
        id,
        snapshot.kind().as_str(),
        version,
        created_at,
        updated_at,
        last_synced_at,
        meta.is_deleted(),
        body,
    ];

    let changed = match guard {
        Guard::New | Guard::Unchanged(None) => tx.execute(
            r#"
            INSERT INTO entities
            (id, kind, version, created_at, updated_at, last_synced_at, is_deleted, body)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO NOTHING
            "#,
            values,
        ),
        Guard::Successor => {
            stored_kind_matches(tx, snapshot)?;
            tx.execute(
                r#"
                UPDATE entities
                SET kind = ?2, version = ?3, created_at = ?4, updated_at = ?5,
                    last_synced_at = ?6, is_deleted = ?7, body = ?8
                WHERE id = ?1 AND version = ?3 - 1
                "#,
                values,
            )
        }
        Guard::Unchanged(Some(read)) => {
            stored_kind_matches(tx, snapshot)?;
            let read = encode_version(read)?;
            tx.execute(
                r#"
                UPDATE entities
                SET kind = ?2, version = ?3, created_at = ?4, updated_at = ?5,
                    last_synced_at = ?6, is_deleted = ?7, body = ?8
                WHERE id = ?1 AND version = ?9
                "#,
                params![
                    id,
                    snapshot.kind().as_str(),
                    version,
                    created_at,
                    updated_at,
                    last_synced_at,
                    meta.is_deleted(),
                    body,
                    read,
                ],
            )
        }
    }
    .map_err(sql)?;

    if changed == 0 {
        warn!("Rejected write of {} {} v{} ({:?})", snapshot.kind(), id, version, guard);
        return Err(Error::InvariantViolation(match guard {
            Guard::New => format!("{} {} already exists", snapshot.kind(), id),
            Guard::Successor => format!(
                "{} {} is not at v{}; reload and retry",
                snapshot.kind(),
                id,
                version - 1
            ),
            Guard::Unchanged(_) => format!(
                "{} {} changed locally during reconciliation",
                snapshot.kind(),
                id
            ),
        }));
    }
    debug!("Wrote {} {} v{}", snapshot.kind(), id, version);
    Ok(())
}

fn stored_kind_matches(tx: &Transaction<'_>, snapshot: &Snapshot) -> Result<()> {
    let stored: Option<String> = tx
        .query_row(
            "SELECT kind FROM entities WHERE id = ?1",
            [snapshot.id().to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(sql)?;
    match stored {
        Some(kind) if kind != snapshot.kind().as_str() => Err(Error::InvariantViolation(format!(
            "{} is stored as a {}, not a {}",
            snapshot.id(),
            kind,
            snapshot.kind()
        ))),
        _ => Ok(()),
    }
}

fn write_audit(tx: &Transaction<'_>, entry: &AuditLogEntry) -> Result<()> {
    tx.execute(
        &format!(
            "INSERT INTO audit_logs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            AuditRow::COLUMNS
        ),
        params![
            entry.id.to_string(),
            entry.event.as_str(),
            entry.role.as_str(),
            entry.actor,
            entry.entity.map(|k| k.as_str()),
            entry.entity_id.map(|id| id.to_string()),
            entry.field,
            entry.old_value,
            entry.new_value,
            encode_ts(&entry.created_at),
        ],
    )
    .map_err(sql)?;
    Ok(())
}

fn write_history(tx: &Transaction<'_>, row: &HistoryRecord) -> Result<()> {
    tx.execute(
        &format!(
            "INSERT INTO status_history ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            HistoryRow::COLUMNS
        ),
        params![
            row.id.to_string(),
            row.workflow.as_str(),
            row.entity_id.to_string(),
            row.old_status,
            row.new_status,
            row.actor,
            row.role.as_str(),
            row.reason,
            encode_ts(&row.created_at),
        ],
    )
    .map_err(sql)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use firewood_common::{Actor, Role};
    use firewood_model::{Address, ApprovalStatus, Client, InventoryItem};
    use firewood_sync::{reconcile, ReconcileContext};
    use firewood_workflow::{AuditEvent, Lifecycle};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap()
    }

    fn staff() -> Actor {
        Actor::new("jo", Role::Staff)
    }

    fn jane() -> Client {
        Client::new("C-1", "Jane Doe", Address::new("12 Elm St", "Springfield", "IL", "62701"))
    }

    #[test]
    fn test_insert_and_load() {
        let store = SqliteStore::in_memory().unwrap();
        let created = Lifecycle::default().create(jane(), &staff(), now()).unwrap();
        store.insert_record(&created).unwrap();

        let loaded: Client = store.load(created.record.id()).unwrap();
        assert_eq!(loaded, created.record);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.audit_log().unwrap(), vec![created.audit.clone()]);

        assert!(matches!(store.insert_record(&created), Err(Error::InvariantViolation(_))));
        assert!(matches!(
            store.load::<InventoryItem>(created.record.id()),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(store.load::<Client>(EntityId::new()), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_transition_writes_entity_history_and_audit() {
        let store = SqliteStore::in_memory().unwrap();
        let lifecycle = Lifecycle::default();
        let client = lifecycle.create(jane(), &staff(), now()).unwrap();
        store.insert_record(&client).unwrap();

        let denied = lifecycle
            .transition(&client.record, ApprovalStatus::Denied, &staff(), Some("out of area"), now())
            .unwrap();
        store.save_transitioned(&denied).unwrap();

        let history = store.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].new_status, "denied");
        assert_eq!(history[0].reason.as_deref(), Some("out of area"));

        let audit = store.audit_log().unwrap();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[1].event, AuditEvent::Transition);

        let stored: Client = store.load(client.record.id()).unwrap();
        assert_eq!(stored.approval_status, ApprovalStatus::Denied);
    }

    #[test]
    fn test_stale_save_is_rejected_and_nothing_is_written() {
        let store = SqliteStore::in_memory().unwrap();
        let lifecycle = Lifecycle::default();
        let item = lifecycle
            .create(InventoryItem::new("Bar oil", "gal", 4.0), &staff(), now())
            .unwrap();
        store.insert_record(&item).unwrap();

        let mut first = item.record.clone();
        first.quantity_on_hand = 3.0;
        let first = lifecycle.update(&item.record, first, &staff(), now()).unwrap();
        let mut second = item.record.clone();
        second.quantity_on_hand = 5.0;
        let second = lifecycle.update(&item.record, second, &staff(), now()).unwrap();

        store.save_record(&first).unwrap();
        assert!(matches!(store.save_record(&second), Err(Error::InvariantViolation(_))));

        let stored: InventoryItem = store.load(item.record.id()).unwrap();
        assert_eq!(stored.quantity_on_hand, 3.0);
        assert_eq!(store.audit_log().unwrap().len(), 2);
    }

    #[test]
    fn test_reconciliation_commit_and_pending() {
        let store = SqliteStore::in_memory().unwrap();
        let lifecycle = Lifecycle::default();
        let local = lifecycle.create(jane(), &staff(), now()).unwrap();
        store.insert_record(&local).unwrap();
        assert_eq!(store.pending().unwrap().len(), 1);

        let remote = InventoryItem::new("Wedge", "pcs", 2.0).into_snapshot();
        let synced_at = now() + Duration::hours(1);
        let pass = reconcile(
            &store.snapshots().unwrap(),
            &[remote.clone()],
            &ReconcileContext::new(synced_at),
        )
        .unwrap();
        store.commit_reconciliation(&pass).unwrap();

        assert_eq!(store.count().unwrap(), 2);
        assert!(store.get(remote.id()).unwrap().is_some());
        assert_eq!(store.last_reconciled_at().unwrap(), Some(synced_at));
        assert_eq!(
            store.audit_log().unwrap().iter().filter(|e| e.event == AuditEvent::SyncAccept).count(),
            1
        );
        assert!(store.pending().unwrap().iter().all(|p| p.entity_id == remote.id()));
    }

    #[test]
    fn test_reconciliation_is_all_or_nothing() {
        let store = SqliteStore::in_memory().unwrap();
        let lifecycle = Lifecycle::default();
        let item = lifecycle
            .create(InventoryItem::new("Helmet", "pcs", 1.0), &staff(), now())
            .unwrap();
        store.insert_record(&item).unwrap();

        let stale_input = store.snapshots().unwrap();
        let newcomer = InventoryItem::new("Wedge", "pcs", 2.0).into_snapshot();
        let pass = reconcile(&stale_input, &[newcomer.clone()], &ReconcileContext::new(now())).unwrap();

        // a local edit lands between reading the input and committing
        let mut edited = item.record.clone();
        edited.quantity_on_hand = 9.0;
        store
            .save_record(&lifecycle.update(&item.record, edited, &staff(), now()).unwrap())
            .unwrap();

        assert!(matches!(store.commit_reconciliation(&pass), Err(Error::InvariantViolation(_))));
        assert!(store.get(newcomer.id()).unwrap().is_none());
        assert!(store.audit_log().unwrap().iter().all(|e| e.event != AuditEvent::SyncAccept));
    }

    #[test]
    fn test_reconciliation_rejects_local_edit_at_same_version() {
        let store = SqliteStore::in_memory().unwrap();
        let lifecycle = Lifecycle::default();
        let item = lifecycle
            .create(InventoryItem::new("Helmet", "pcs", 1.0), &staff(), now())
            .unwrap();
        store.insert_record(&item).unwrap();

        let mut theirs = item.record.clone();
        theirs.quantity_on_hand = 50.0;
        let theirs = lifecycle.update(&item.record, theirs, &staff(), now()).unwrap();
        let pass = reconcile(
            &store.snapshots().unwrap(),
            &[theirs.record.clone().into_snapshot()],
            &ReconcileContext::new(now() + Duration::hours(1)),
        )
        .unwrap();

        // local edit to the same version the remote side reached
        let mut mine = item.record.clone();
        mine.quantity_on_hand = 9.0;
        store
            .save_record(&lifecycle.update(&item.record, mine, &staff(), now()).unwrap())
            .unwrap();

        assert!(matches!(store.commit_reconciliation(&pass), Err(Error::InvariantViolation(_))));
        let stored: InventoryItem = store.load(item.record.id()).unwrap();
        assert_eq!(stored.quantity_on_hand, 9.0);
        assert!(store.audit_log().unwrap().iter().all(|e| e.event != AuditEvent::SyncAccept));
    }

    #[test]
    fn test_reconciliation_rejects_id_stored_after_pass_read() {
        let store = SqliteStore::in_memory().unwrap();
        let lifecycle = Lifecycle::default();
        let remote = lifecycle
            .create(InventoryItem::new("Wedge", "pcs", 2.0), &staff(), now())
            .unwrap();
        let pass = reconcile(
            &store.snapshots().unwrap(),
            &[remote.record.clone().into_snapshot()],
            &ReconcileContext::new(now()),
        )
        .unwrap();

        store.insert_record(&remote).unwrap();
        assert!(matches!(store.commit_reconciliation(&pass), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_insert_all_is_all_or_nothing() {
        let store = SqliteStore::in_memory().unwrap();
        let lifecycle = Lifecycle::default();
        let first = lifecycle
            .create_snapshot(jane().into_snapshot(), &staff(), now())
            .unwrap();
        let second = lifecycle
            .create_snapshot(InventoryItem::new("Wedge", "pcs", 2.0).into_snapshot(), &staff(), now())
            .unwrap();

        let batch = vec![first.clone(), second.clone(), first.clone()];
        assert!(matches!(store.insert_all(&batch), Err(Error::InvariantViolation(_))));
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.audit_log().unwrap().is_empty());

        store.insert_all(&[first, second]).unwrap();
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.audit_log().unwrap().len(), 2);
    }

    #[test]
    fn test_audit_log_is_append_only() {
        let store = SqliteStore::in_memory().unwrap();
        let created = Lifecycle::default().create(jane(), &staff(), now()).unwrap();
        store.insert_record(&created).unwrap();

        let conn = store.conn().unwrap();
        assert!(conn.execute("DELETE FROM audit_logs", []).is_err());
        assert!(conn.execute("UPDATE audit_logs SET actor = 'x'", []).is_err());
    }

    #[test]
    fn test_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firewood.db");
        let created = Lifecycle::default().create(jane(), &staff(), now()).unwrap();
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_record(&created).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let clients = store.current(Some(EntityKind::Client), SortOrder::Ascending).unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].id(), created.record.id());
    }
}
