//! `itam-stocktake` -- command-line front-end for stocktake sessions.
//!
//! Talks to the asset management backend configured through the
//! environment and drives the same controllers an interactive front-end
//! would use.
//!
//! # Environment variables
//!
//! | Variable                    | Required | Default                 |
//! |-----------------------------|----------|-------------------------|
//! | `ITAM_API_URL`              | no       | `http://localhost:8080` |
//! | `ITAM_TOKEN`                | no       | --                      |
//! | `ITAM_TOKEN_FILE`           | no       | `.itam_token`           |
//! | `ITAM_REQUEST_TIMEOUT_SECS` | no       | `30`                    |
//! | `LOG_FORMAT`                | no       | text (`json` for JSON)  |

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use itam_client::api::StocktakeApi;
use itam_client::backend::StocktakeBackend;
use itam_client::config::ClientConfig;
use itam_core::asset::AssetStatus;
use itam_core::scope::{Refinement, ScopeMode};
use itam_core::stocktake::LinePatch;
use itam_core::types::DbId;
use itam_stocktake::creator::SessionCreator;
use itam_stocktake::editor::ReconciliationEditor;
use itam_stocktake::notice::Notice;

#[derive(Parser)]
#[command(name = "itam-stocktake")]
#[command(about = "Create, reconcile and close IT asset stocktake sessions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List stocktake sessions
    Sessions,

    /// Show the lines of a session
    Show {
        session_id: DbId,

        /// Only lines whose name, code, serial or remarks contain this text
        #[arg(long)]
        filter: Option<String>,
    },

    /// Create a session from a scope and seed it with the matching assets
    Create(CreateArgs),

    /// Stage edits from a JSON file and save them
    Apply {
        session_id: DbId,

        /// JSON object mapping line id to a partial line, e.g.
        /// `{"12": {"Found": 1}, "13": {"Found": 0, "MissingQty": 2}}`
        #[arg(long)]
        edits: PathBuf,

        /// Save only these lines
        #[arg(long, value_delimiter = ',')]
        selected: Option<Vec<DbId>>,
    },

    /// Export a session's lines as CSV
    Export {
        session_id: DbId,

        /// Output path (default: stocktake_session_<id>.csv)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Close a session. This cannot be undone.
    Close { session_id: DbId },
}

#[derive(Args)]
#[command(group(ArgGroup::new("scope").required(true).args(["department", "holder", "location"])))]
struct CreateArgs {
    /// Count every asset of this department
    #[arg(long)]
    department: Option<DbId>,

    /// Count every asset held by this user
    #[arg(long)]
    holder: Option<DbId>,

    /// Count every asset stored at this location
    #[arg(long)]
    location: Option<DbId>,

    /// Narrow the preview by name, code or serial number
    #[arg(long)]
    keyword: Option<String>,

    /// Narrow the preview by asset status, e.g. IN_USE
    #[arg(long)]
    status: Option<String>,

    #[arg(long, default_value = "")]
    note: String,

    /// Seed every line as found instead of missing
    #[arg(long)]
    default_found: bool,
}

impl CreateArgs {
    fn scope(&self) -> (ScopeMode, Option<DbId>) {
        if self.department.is_some() {
            (ScopeMode::ByDepartment, self.department)
        } else if self.holder.is_some() {
            (ScopeMode::ByHolder, self.holder)
        } else {
            (ScopeMode::ByLocation, self.location)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "itam_stocktake=info,itam_client=info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let cli = Cli::parse();

    // --- Configuration ---
    let config = ClientConfig::from_env().context("Invalid client configuration")?;
    tracing::info!(api_url = %config.api_url, "Loaded client configuration");

    let api = StocktakeApi::new(&config, config.credentials())
        .context("Failed to build HTTP client")?;
    let backend: Arc<dyn StocktakeBackend> = Arc::new(api);

    match cli.command {
        Command::Sessions => list_sessions(backend).await,
        Command::Show { session_id, filter } => show(backend, session_id, filter).await,
        Command::Create(args) => create(backend, args).await,
        Command::Apply {
            session_id,
            edits,
            selected,
        } => apply(backend, session_id, edits, selected).await,
        Command::Export { session_id, out } => export(backend, session_id, out).await,
        Command::Close { session_id } => close(backend, session_id).await,
    }
}

fn print_notices(notices: Vec<Notice>) {
    for notice in notices {
        eprintln!("{notice}");
    }
}

async fn list_sessions(backend: Arc<dyn StocktakeBackend>) -> anyhow::Result<()> {
    let sessions = backend
        .list_sessions()
        .await
        .context("Failed to list sessions")?;
    for summary in sessions {
        let s = &summary.session;
        println!(
            "{:>6}  {:<6}  dept={:<6}  lines={:<5} found={:<5} {}",
            s.id,
            s.status.as_str(),
            s.department_id.map_or_else(|| "-".to_string(), |d| d.to_string()),
            summary.line_count.unwrap_or(0),
            summary.found_count.unwrap_or(0),
            s.note.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}

async fn open_editor(
    backend: Arc<dyn StocktakeBackend>,
    session_id: DbId,
) -> anyhow::Result<ReconciliationEditor> {
    let mut editor = ReconciliationEditor::new(backend, session_id);
    let loaded = editor.load().await;
    print_notices(editor.take_notices());
    loaded.with_context(|| format!("Failed to load session {session_id}"))?;
    Ok(editor)
}

async fn show(
    backend: Arc<dyn StocktakeBackend>,
    session_id: DbId,
    filter: Option<String>,
) -> anyhow::Result<()> {
    let mut editor = open_editor(backend, session_id).await?;
    if let Some(filter) = filter {
        editor.set_filter(filter);
    }

    if let Some(session) = editor.session() {
        println!(
            "Session {} [{}] {}",
            session.id,
            session.status.as_str(),
            session.note.as_deref().unwrap_or("")
        );
    }
    for row in editor.visible_rows() {
        println!(
            "{:>6}  {:<7}  {:<12}  {:<30}  loc={:<6} missing={:<4} {}",
            row.id,
            row.found_label(),
            row.manage_code.as_deref().unwrap_or(""),
            row.asset_name.as_deref().unwrap_or(""),
            row.found_location_id
                .map_or_else(|| "-".to_string(), |l| l.to_string()),
            row.missing_qty.unwrap_or(0),
            row.remarks.as_deref().unwrap_or(""),
        );
    }
    let progress = editor.progress();
    println!(
        "{} lines: {} found, {} missing",
        progress.total, progress.found, progress.missing
    );
    Ok(())
}

async fn create(backend: Arc<dyn StocktakeBackend>, args: CreateArgs) -> anyhow::Result<()> {
    let (mode, selector) = args.scope();
    let status = args.status.as_deref().map(AssetStatus::parse);

    let mut creator = SessionCreator::new(backend, mode);
    creator.load_reference_data().await;
    creator.set_selector(selector);
    creator.set_refinement(Refinement {
        keyword: args.keyword.clone(),
        status,
    });

    let count = creator.preview()?.len();
    print_notices(creator.take_notices());
    if count == 0 {
        bail!("No assets match scope {}", mode.as_str());
    }
    println!("{count} asset(s) match scope {}", mode.as_str());

    let created = creator.confirm(&args.note, args.default_found).await;
    print_notices(creator.take_notices());
    let session_id = created.context("Failed to create session")?;
    println!("{session_id}");
    Ok(())
}

async fn apply(
    backend: Arc<dyn StocktakeBackend>,
    session_id: DbId,
    edits: PathBuf,
    selected: Option<Vec<DbId>>,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&edits)
        .with_context(|| format!("Failed to read {}", edits.display()))?;
    let patches: BTreeMap<DbId, LinePatch> =
        serde_json::from_str(&raw).context("Edits must be a JSON object of line id to fields")?;

    let mut editor = open_editor(backend, session_id).await?;
    for (line_id, patch) in patches {
        if let Err(e) = editor.stage(line_id, patch) {
            eprintln!("[error] line {line_id}: {e}");
        }
    }
    tracing::info!(session_id, dirty = editor.dirty_count(), "Edits staged");

    let selected_only = match selected {
        Some(ids) => {
            editor.select(ids);
            true
        }
        None => false,
    };
    let report = editor.save_dirty(selected_only).await;
    print_notices(editor.take_notices());
    let report = report?;

    for (line_id, message) in &report.failed {
        eprintln!("[error] line {line_id}: {message}");
    }
    println!(
        "{} saved, {} failed",
        report.success_count(),
        report.failure_count()
    );
    if report.failure_count() > 0 {
        bail!("{} line(s) failed to save", report.failure_count());
    }
    Ok(())
}

async fn export(
    backend: Arc<dyn StocktakeBackend>,
    session_id: DbId,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let editor = open_editor(backend, session_id).await?;
    let bytes = editor.export_csv()?;
    let path = out.unwrap_or_else(|| PathBuf::from(editor.export_filename()));
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(session_id, path = %path.display(), "Session exported");
    println!("{}", path.display());
    Ok(())
}

async fn close(backend: Arc<dyn StocktakeBackend>, session_id: DbId) -> anyhow::Result<()> {
    let mut editor = open_editor(backend, session_id).await?;
    if !editor.can_close() {
        bail!("Session {session_id} cannot be closed (already closed or has unsaved edits)");
    }
    let closed = editor.close().await;
    print_notices(editor.take_notices());
    closed?;
    Ok(())
}
