mod config;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use access::{AccessResolver, Role};
use audit::{ActivityQuery, AuditLogger, NewActivity, ValidationError};
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use storage::{
    ActivityFilter, ActivityKind, ActivityRecord, EstateId, EstateStore, SqliteStore, UserId,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "estates.toml";

#[derive(Parser)]
#[command(name = "estates")]
#[command(about = "Estate access control and activity history", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage estates and their collaborators
    Estate {
        #[command(subcommand)]
        command: EstateCommands,
    },
    /// Show what a user may do on an estate
    Access {
        estate: String,
        #[arg(short, long)]
        user: String,
    },
    /// Record a change on an estate
    Log {
        estate: String,
        /// Acting user
        #[arg(short, long)]
        user: String,
        /// invoice, document, task or note
        #[arg(short, long)]
        kind: String,
        #[arg(short, long)]
        action: String,
        /// Id of the affected invoice, document, task or note
        #[arg(short, long)]
        entity: String,
        #[arg(short, long)]
        message: String,
        /// Before/after fields as JSON
        #[arg(long)]
        snapshot: Option<String>,
    },
    /// Show the activity history of an estate
    History {
        estate: String,
        #[arg(short, long)]
        user: String,
        /// Filter by kind (invoice, document, task, note)
        #[arg(short, long)]
        kind: Option<String>,
        /// Filter by action
        #[arg(short, long)]
        action: Option<String>,
        /// Continue after a previous page
        #[arg(long)]
        cursor: Option<String>,
        /// Records per page
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum EstateCommands {
    /// Create an estate
    Create {
        estate: String,
        #[arg(short, long)]
        owner: String,
    },
    /// Grant a collaborator a role (EDITOR or VIEWER)
    Share {
        estate: String,
        user: String,
        #[arg(short, long)]
        role: String,
    },
    /// Revoke a collaborator
    Unshare { estate: String, user: String },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;
    init_logging(&config.log.level);

    match cli.command {
        Commands::Estate { command } => cmd_estate(&config, command),
        Commands::Access { estate, user } => cmd_access(&config, &estate.into(), &user.into()),
        Commands::Log {
            estate,
            user,
            kind,
            action,
            entity,
            message,
            snapshot,
        } => {
            let snapshot = snapshot
                .map(|s| serde_json::from_str(&s))
                .transpose()
                .map_err(Error::InvalidSnapshot)?;
            let entry = LogEntry {
                kind,
                action,
                entity_id: entity,
                message,
                snapshot,
            };
            cmd_log(&config, &estate.into(), &user.into(), entry)
        }
        Commands::History {
            estate,
            user,
            kind,
            action,
            cursor,
            limit,
        } => {
            let filter = ActivityFilter {
                kind: kind.as_deref().map(parse_kind).transpose()?,
                action,
            };
            let limit = limit.unwrap_or(config.history.page_size);
            cmd_history(&config, &estate.into(), &user.into(), &filter, cursor.as_deref(), limit)
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_estate(config: &Config, command: EstateCommands) -> Result<()> {
    let store = create_store(config)?;

    match command {
        EstateCommands::Create { estate, owner } => {
            let (estate, owner) = (EstateId::from(estate), UserId::from(owner));
            store.create_estate(&estate, &owner)?;
            info!(%estate, %owner, "estate created");
            println!("Created estate {estate} owned by {owner}");
        }
        EstateCommands::Share { estate, user, role } => {
            let role = parse_collaborator_role(&role)?;
            let (estate, user) = (EstateId::from(estate), UserId::from(user));
            store.put_collaborator(&estate, &user, role.as_str())?;
            info!(%estate, %user, %role, "collaborator granted");
            println!("{user} is now {role} on {estate}");
        }
        EstateCommands::Unshare { estate, user } => {
            let (estate, user) = (EstateId::from(estate), UserId::from(user));
            if store.remove_collaborator(&estate, &user)? {
                info!(%estate, %user, "collaborator revoked");
                println!("{user} removed from {estate}");
            } else {
                println!("{user} had no grant on {estate}");
            }
        }
    }

    Ok(())
}

fn cmd_access(config: &Config, estate: &EstateId, user: &UserId) -> Result<()> {
    let resolver = AccessResolver::new(open_store(config)?);

    match resolver.resolve(estate, user)? {
        Some(access) => {
            println!("Estate:         {}", access.estate_id);
            println!("Role:           {}", access.role);
            println!("Can edit:       {}", yes_no(access.can_edit));
            println!("Sensitive data: {}", yes_no(access.can_view_sensitive));
        }
        None => println!("{user} has no access to {estate}"),
    }

    Ok(())
}

/// Parsed `log` arguments; the owner is looked up once access is established.
struct LogEntry {
    kind: String,
    action: String,
    entity_id: String,
    message: String,
    snapshot: Option<serde_json::Value>,
}

fn cmd_log(config: &Config, estate: &EstateId, user: &UserId, entry: LogEntry) -> Result<()> {
    let store = open_store(config)?;
    let resolver = AccessResolver::new(store.clone());

    let grant = resolver.require_access(estate, user)?;
    grant.require_edit()?;

    let projection = store
        .fetch_access_projection(estate)?
        .ok_or(access::Error::Forbidden)?;
    let entry = NewActivity {
        estate_id: estate.clone(),
        owner_id: projection.owner_id,
        kind: entry.kind,
        action: entry.action,
        entity_id: entry.entity_id,
        message: entry.message,
        snapshot: entry.snapshot,
    };

    // The change itself has already happened by the time it is logged, so a
    // store failure here is reported but does not fail the command.
    match AuditLogger::new(store).append(entry) {
        Ok(record) => {
            println!("Logged {} {} ({})", record.kind, record.action, record.id);
            Ok(())
        }
        Err(e) if e.is_warning() => {
            warn!(error = %e, "history entry not recorded");
            eprintln!("Warning: {e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_history(
    config: &Config,
    estate: &EstateId,
    user: &UserId,
    filter: &ActivityFilter,
    cursor: Option<&str>,
    limit: usize,
) -> Result<()> {
    let store = open_store(config)?;
    let grant = AccessResolver::new(store.clone()).require_access(estate, user)?;
    let query = ActivityQuery::new(store).with_max_limit(config.history.max_page_size);

    let page = query.list_from(estate, filter, cursor, limit)?;

    if page.records.is_empty() {
        println!("No activity found for estate {estate}");
        return Ok(());
    }

    for record in &page.records {
        print_record(record, grant.can_view_sensitive);
    }

    if let Some(next) = page.next_cursor {
        println!("\nMore: --cursor {next}");
    }

    Ok(())
}

fn print_record(record: &ActivityRecord, show_snapshot: bool) {
    let time = Local
        .from_utc_datetime(&record.created_at.naive_utc())
        .format("%Y-%m-%d %H:%M:%S");

    println!(
        "[{time}] {:<8} {:<14} {:<12} {}",
        record.kind, record.action, record.entity_id, record.message
    );

    if show_snapshot {
        if let Some(snapshot) = &record.snapshot {
            println!("{:>21} {snapshot}", "");
        }
    }
}

fn parse_kind(kind: &str) -> Result<ActivityKind> {
    kind.parse::<ActivityKind>()
        .map_err(|e| Error::Audit(ValidationError::from(e).into()))
}

/// Owners are set at creation; collaborators may only be editors or viewers.
fn parse_collaborator_role(role: &str) -> Result<Role> {
    match Role::parse(&role.trim().to_ascii_uppercase()) {
        Some(role @ (Role::Editor | Role::Viewer)) => Ok(role),
        _ => Err(Error::InvalidRole(role.to_string())),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let db_path = config.database_path();

    if !db_path.exists() {
        return Err(Error::DatabaseNotFound { path: db_path });
    }

    Ok(Arc::new(SqliteStore::open(&db_path)?))
}

fn create_store(config: &Config) -> Result<SqliteStore> {
    let db_path = config.database_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(SqliteStore::open(&db_path)?)
}
