//! Firewood Bank CLI - command line front end for the sync and lifecycle core.
//!
//! Snapshot files exchanged with other installs are JSON arrays of tagged
//! entity snapshots, as written by `firewood export`.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use firewood_common::{Actor, EntityId, EntityKind, Error, Role};
use firewood_model::{
    ApprovalStatus, ChangeRequestStatus, Client, InvoiceStatus, Snapshot, WorkOrderStatus,
};
use firewood_store::SqliteStore;
use firewood_sync::{
    audit_feed, check_new_client, history_feed, reconcile, AuditFilter, ConflictSeverity,
    CoreConfig, ReconcileContext, SortOrder,
};
use firewood_workflow::{AuditEvent, Lifecycle, WorkflowEntity};

const APP_DIR: &str = "firewood-bank";
const DB_FILENAME: &str = "firewood.db";
const CONFIG_FILENAME: &str = "config.json";

#[derive(Parser)]
#[command(name = "firewood")]
#[command(about = "Firewood Bank - offline-first case records and sync")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Database file (default: <data dir>/firewood-bank/firewood.db).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Configuration file (default: config.json next to the database).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Name recorded on history and audit entries.
    #[arg(long, global = true, default_value = "operator")]
    actor: String,

    /// Role of the acting user: admin, lead, staff or driver.
    #[arg(long, global = true, default_value = "staff")]
    role: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and a default configuration file.
    Init,

    /// Create new records from a snapshot file.
    Import {
        /// JSON array of snapshots.
        file: PathBuf,
    },

    /// Write stored snapshots to a file for another install.
    Export {
        /// Destination file.
        file: PathBuf,

        /// Only entities edited since the last reconciliation.
        #[arg(long)]
        pending: bool,
    },

    /// Merge a snapshot file received from another install.
    Reconcile {
        /// JSON array of snapshots.
        remote_file: PathBuf,
    },

    /// Move a client, work order, invoice or change request to a new status.
    Transition {
        /// Entity id.
        id: String,

        /// Target status, e.g. "approved" or "in_progress".
        status: String,

        /// Reason (required for denials, rejections and voids).
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Show the audit log.
    Audit {
        /// Only entries about this entity.
        #[arg(long)]
        entity_id: Option<String>,

        /// Only entries for this kind of entity.
        #[arg(long)]
        kind: Option<String>,

        /// Only this event: create, update, delete, restore, transition or sync_accept.
        #[arg(long)]
        event: Option<String>,

        /// Only entries by this actor.
        #[arg(long)]
        by: Option<String>,

        /// Newest first.
        #[arg(long)]
        desc: bool,

        /// Show at most this many entries.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show status history.
    History {
        /// Only rows for this entity.
        #[arg(long)]
        entity_id: Option<String>,

        /// Newest first.
        #[arg(long)]
        desc: bool,
    },

    /// List entities edited since the last reconciliation.
    Pending,

    /// List current clients.
    Clients {
        /// Only clients with this approval status.
        #[arg(long)]
        status: Option<String>,

        /// Most recently updated first.
        #[arg(long)]
        desc: bool,
    },

    /// Check whether a client record looks like one already on file.
    CheckClient {
        /// JSON file holding one client record.
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<Error>() {
                Some(core) if core.is_recoverable() => eprintln!("{}", core.user_message()),
                _ => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

/// Everything a command needs, resolved from the global options.
struct Session {
    store: SqliteStore,
    config: CoreConfig,
    actor: Actor,
}

impl Session {
    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::new(self.config.workflow_policy.clone())
    }
}

fn run(cli: Cli) -> Result<()> {
    let db_path = match cli.db {
        Some(path) => path,
        None => default_data_dir()?.join(DB_FILENAME),
    };
    let config_path = match cli.config {
        Some(path) => path,
        None => db_path
            .parent()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME)),
    };

    if let Commands::Init = cli.command {
        return cmd_init(&db_path, &config_path);
    }

    let role: Role = cli.role.parse().context("Invalid --role")?;
    let actor = Actor::new(cli.actor, role);
    actor.validate().context("Invalid --actor")?;

    let session = Session {
        store: SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?,
        config: CoreConfig::load_or_default(&config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?,
        actor,
    };

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Import { file } => cmd_import(&session, &file),
        Commands::Export { file, pending } => cmd_export(&session, &file, pending),
        Commands::Reconcile { remote_file } => cmd_reconcile(&session, &remote_file),
        Commands::Transition { id, status, reason } => {
            cmd_transition(&session, &id, &status, reason.as_deref())
        }
        Commands::Audit {
            entity_id,
            kind,
            event,
            by,
            desc,
            limit,
        } => {
            let filter = AuditFilter {
                entity: kind.as_deref().map(str::parse::<EntityKind>).transpose()?,
                entity_id: entity_id.as_deref().map(EntityId::parse).transpose()?,
                event: event.as_deref().map(str::parse::<AuditEvent>).transpose()?,
                actor: by,
                since: None,
            };
            cmd_audit(&session, &filter, order(desc), limit)
        }
        Commands::History { entity_id, desc } => {
            let entity = entity_id.as_deref().map(EntityId::parse).transpose()?;
            cmd_history(&session, entity, order(desc))
        }
        Commands::Pending => cmd_pending(&session),
        Commands::Clients { status, desc } => {
            let status = status.as_deref().map(str::parse::<ApprovalStatus>).transpose()?;
            cmd_clients(&session, status, order(desc))
        }
        Commands::CheckClient { file } => cmd_check_client(&session, &file),
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("Could not determine the user data directory; pass --db")?;
    Ok(base.join(APP_DIR))
}

fn order(desc: bool) -> SortOrder {
    if desc {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    }
}

fn read_snapshots(path: &Path) -> Result<Vec<Snapshot>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Snapshot::list_from_json(&json).with_context(|| format!("Invalid snapshot file {}", path.display()))
}

/// Create the database and default config.
fn cmd_init(db_path: &Path, config_path: &Path) -> Result<()> {
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    SqliteStore::open(db_path).context("Failed to create database")?;

    if config_path.exists() {
        println!("Keeping existing config: {}", config_path.display());
    } else {
        std::fs::write(config_path, CoreConfig::default().to_json()?)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("Wrote default config: {}", config_path.display());
    }

    println!("Database ready: {}", db_path.display());
    Ok(())
}

/// Create records from a file. Either every record is imported or none is.
fn cmd_import(session: &Session, file: &Path) -> Result<()> {
    let snapshots = read_snapshots(file)?;
    let lifecycle = session.lifecycle();
    let now = Utc::now();

    let created = snapshots
        .into_iter()
        .map(|snapshot| {
            let (kind, id) = (snapshot.kind(), snapshot.id());
            lifecycle
                .create_snapshot(snapshot, &session.actor, now)
                .with_context(|| format!("Invalid {} {}", kind, id))
        })
        .collect::<Result<Vec<_>>>()?;
    session
        .store
        .insert_all(&created)
        .with_context(|| format!("Nothing imported from {}", file.display()))?;

    println!("Imported {} records from {}", created.len(), file.display());
    Ok(())
}

/// Export snapshots for another install.
fn cmd_export(session: &Session, file: &Path, pending_only: bool) -> Result<()> {
    let mut snapshots = session.store.snapshots()?;
    if pending_only {
        snapshots.retain(|s| s.envelope().needs_sync());
    }
    std::fs::write(file, Snapshot::list_to_json(&snapshots)?)
        .with_context(|| format!("Failed to write {}", file.display()))?;

    println!("Exported {} snapshots to {}", snapshots.len(), file.display());
    Ok(())
}

/// Merge a remote batch into the local database.
fn cmd_reconcile(session: &Session, remote_file: &Path) -> Result<()> {
    let remote = read_snapshots(remote_file)?;
    let local = session.store.snapshots()?;
    let ctx = ReconcileContext::new(Utc::now())
        .with_actor(session.actor.clone())
        .with_policy(session.config.duplicate_policy.clone());

    info!("Reconciling {} local with {} remote snapshots", local.len(), remote.len());
    let pass = reconcile(&local, &remote, &ctx).context("Reconciliation failed")?;
    session
        .store
        .commit_reconciliation(&pass)
        .context("Failed to commit reconciliation")?;

    println!(
        "Merged {} entities ({} accepted from remote)",
        pass.merged.len(),
        pass.audit.len()
    );
    for conflict in &pass.conflicts {
        let tag = match conflict.severity {
            ConflictSeverity::Warning => "WARN",
            ConflictSeverity::Resolved => "RESOLVED",
        };
        println!("  [{}] {}: {}", tag, conflict.entity_id, conflict.detail);
    }
    Ok(())
}

/// Apply a status transition to any workflow entity.
fn cmd_transition(session: &Session, id: &str, status: &str, reason: Option<&str>) -> Result<()> {
    let id = EntityId::parse(id)?;
    let snapshot = session
        .store
        .get(id)?
        .ok_or_else(|| Error::NotFound(format!("entity {}", id)))?;

    match snapshot {
        Snapshot::Client(client) => apply(session, &client, status.parse::<ApprovalStatus>()?, reason),
        Snapshot::WorkOrder(order) => apply(session, &order, status.parse::<WorkOrderStatus>()?, reason),
        Snapshot::Invoice(invoice) => apply(session, &invoice, status.parse::<InvoiceStatus>()?, reason),
        Snapshot::ChangeRequest(request) => {
            apply(session, &request, status.parse::<ChangeRequestStatus>()?, reason)
        }
        other => bail!("{} records have no status workflow", other.kind()),
    }
}

fn apply<E: WorkflowEntity>(
    session: &Session,
    entity: &E,
    target: E::Status,
    reason: Option<&str>,
) -> Result<()> {
    let moved = session
        .lifecycle()
        .transition(entity, target, &session.actor, reason, Utc::now())?;
    session.store.save_transitioned(&moved)?;

    println!(
        "{} {}: {} -> {} (v{})",
        E::KIND,
        entity.id(),
        moved.history.old_status,
        moved.history.new_status,
        moved.record.envelope().version()
    );
    Ok(())
}

fn cmd_audit(
    session: &Session,
    filter: &AuditFilter,
    order: SortOrder,
    limit: Option<usize>,
) -> Result<()> {
    let feed = audit_feed(&session.store.audit_log()?, filter, order);
    if feed.is_empty() {
        println!("No audit entries.");
        return Ok(());
    }

    for entry in feed.iter().take(limit.unwrap_or(usize::MAX)) {
        let target = entry.entity_id.map(|id| id.to_string()).unwrap_or_default();
        let change = match (&entry.field, &entry.old_value, &entry.new_value) {
            (Some(field), old, new) => format!(
                " {}: {} -> {}",
                field,
                old.as_deref().unwrap_or("-"),
                new.as_deref().unwrap_or("-")
            ),
            _ => String::new(),
        };
        println!(
            "{}  {:<22} {} ({}) {}{}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.label(),
            entry.actor,
            entry.role,
            target,
            change
        );
    }
    Ok(())
}

fn cmd_history(session: &Session, entity: Option<EntityId>, order: SortOrder) -> Result<()> {
    let feed = history_feed(&session.store.history()?, entity, order);
    if feed.is_empty() {
        println!("No status history.");
        return Ok(());
    }

    for row in feed {
        println!(
            "{}  {} {}: {} -> {} by {} ({}){}",
            row.created_at.format("%Y-%m-%d %H:%M:%S"),
            row.workflow,
            row.entity_id,
            row.old_status,
            row.new_status,
            row.actor,
            row.role,
            row.reason.map(|r| format!(" - {}", r)).unwrap_or_default()
        );
    }
    Ok(())
}

fn cmd_pending(session: &Session) -> Result<()> {
    let pending = session.store.pending()?;
    match session.store.last_reconciled_at()? {
        Some(at) => println!("Last reconciled: {}", at.format("%Y-%m-%d %H:%M:%S")),
        None => println!("Never reconciled."),
    }
    if pending.is_empty() {
        println!("Everything is in sync.");
        return Ok(());
    }

    println!("{} entities waiting to sync:", pending.len());
    for change in pending {
        println!(
            "  {:<15} {} v{}{} (edited {}, last synced {})",
            change.kind,
            change.entity_id,
            change.version,
            if change.is_deleted { " [deleted]" } else { "" },
            change.updated_at.format("%Y-%m-%d %H:%M"),
            change
                .last_synced_at
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string())
        );
    }
    Ok(())
}

fn cmd_clients(session: &Session, status: Option<ApprovalStatus>, order: SortOrder) -> Result<()> {
    let clients: Vec<Client> = session
        .store
        .current(Some(EntityKind::Client), order)?
        .into_iter()
        .filter_map(|s| match s {
            Snapshot::Client(client) => Some(client),
            _ => None,
        })
        .filter(|c| status.map_or(true, |s| c.approval_status == s))
        .collect();

    if clients.is_empty() {
        println!("No clients.");
        return Ok(());
    }
    for client in clients {
        println!(
            "  {:<8} {:<24} {:<9} {}, {}",
            client.client_number,
            client.name,
            client.approval_status,
            client.physical_address.line1,
            client.physical_address.city
        );
    }
    Ok(())
}

fn cmd_check_client(session: &Session, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let candidate: Client = serde_json::from_str(&json)
        .with_context(|| format!("Invalid client record in {}", file.display()))?;

    let existing: Vec<Client> = session
        .store
        .current(Some(EntityKind::Client), SortOrder::Ascending)?
        .into_iter()
        .filter_map(|s| match s {
            Snapshot::Client(client) => Some(client),
            _ => None,
        })
        .collect();

    if check_new_client(&candidate, &existing, &session.config.duplicate_policy) {
        println!("Possible duplicate: a client with this name and address is already on file.");
    } else {
        println!("No matching client on file.");
    }
    Ok(())
}
