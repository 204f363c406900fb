// aiops-cli/src/main.rs
// ============================================================================
// Module: Operator CLI Entry Point
// Description: Command dispatcher for ingesting alerts, driving the C1-C7
//              investigate pipeline, and serving incidents/approval/audit
//              commands against the SQLite store.
// Dependencies: clap, aiops-core, aiops-config, aiops-store-sqlite,
//               tokio, tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! `aiops` is the operator-facing binary. It loads a [`PipelineConfig`],
//! opens the shared SQLite store at `backends.store_path`, and dispatches to
//! one of a handful of subcommands. `investigate` is the only command that
//! drives the full pipeline (see [`investigate::run`]); the rest are thin
//! reads and writes against the store for an operator to inspect and act on
//! incidents and pending approvals.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod backends;
mod investigate;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use aiops_config::PipelineConfig;
use aiops_core::ActionId;
use aiops_core::ApprovalOutcome;
use aiops_core::Incident;
use aiops_core::IncidentId;
use aiops_core::Timestamp;
use aiops_core::WorkflowStore;
use aiops_store_sqlite::SqliteStore;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "aiops", disable_help_subcommand = true)]
struct Cli {
    /// Path to the pipeline configuration file (defaults to `aiops.toml` in
    /// the working directory).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Opens a new incident from a normalized alert file.
    Ingest(IngestCommand),
    /// Drives the investigate pipeline (C1-C7) for one incident.
    Investigate(IncidentIdArg),
    /// Incident store inspection commands.
    Incidents {
        /// Selected incidents subcommand.
        #[command(subcommand)]
        command: IncidentsCommand,
    },
    /// Approves a pending remediation action.
    Approve(DecisionCommand),
    /// Denies a pending remediation action.
    Deny(DecisionCommand),
    /// Prints an incident's journal of workflow events.
    Audit(IncidentIdArg),
}

/// Incident store subcommands.
#[derive(Subcommand, Debug)]
enum IncidentsCommand {
    /// Lists every materialized incident.
    List,
    /// Shows a single incident record.
    Show(IncidentIdArg),
}

/// Arguments for `ingest`.
#[derive(clap::Args, Debug)]
struct IngestCommand {
    /// Path to a normalized alert JSON file describing the new incident.
    #[arg(long, value_name = "PATH")]
    alert: PathBuf,
}

/// An incident identifier argument shared by several subcommands.
#[derive(clap::Args, Debug)]
struct IncidentIdArg {
    /// The incident identifier.
    incident_id: String,
}

/// Arguments for `approve`/`deny`.
#[derive(clap::Args, Debug)]
struct DecisionCommand {
    /// The remediation action identifier.
    action_id: String,
    /// Operator identity recorded against the decision.
    #[arg(long, value_name = "NAME")]
    approved_by: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from `message`.
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
///
/// The CLI's own work (config load, store I/O, pipeline orchestration) is
/// entirely synchronous; `investigate::run` blocks on
/// [`aiops_core::ApprovalChannel::request`]'s polling loop. `tokio` supplies
/// only the thread on which that blocking work runs, via
/// [`tokio::task::spawn_blocking`], so a future async transport (an HTTP
/// approval webhook, a server-sent event stream) can be added without
/// reworking the entry point.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match tokio::task::spawn_blocking(run).await {
        Ok(Ok(code)) => code,
        Ok(Err(err)) => emit_error(&err.to_string()),
        Err(err) => emit_error(&format!("worker thread panicked: {err}")),
    }
}

/// Parses CLI arguments and dispatches to the selected subcommand.
fn run() -> CliResult<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref()).map_err(|err| CliError::new(err.to_string()))?;
    config.validate().map_err(|err| CliError::new(err.to_string()))?;
    let store = SqliteStore::open_at(config.backends.store_path.clone()).map_err(|err| CliError::new(err.to_string()))?;

    match cli.command {
        Commands::Ingest(command) => command_ingest(&store, &command),
        Commands::Investigate(command) => command_investigate(&store, &config, &command),
        Commands::Incidents { command } => command_incidents(&store, command),
        Commands::Approve(command) => command_decision(&store, &command, ApprovalOutcome::Approved),
        Commands::Deny(command) => command_decision(&store, &command, ApprovalOutcome::Denied),
        Commands::Audit(command) => command_audit(&store, &command),
    }
}

/// Initializes structured logging, honoring `RUST_LOG` when set.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("aiops_cli=info,aiops_core=info,aiops_dispatch=info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

// ============================================================================
// SECTION: Ingest Command
// ============================================================================

/// Opens a new incident from a normalized alert JSON file and persists it.
fn command_ingest(store: &SqliteStore, command: &IngestCommand) -> CliResult<ExitCode> {
    let bytes = std::fs::read(&command.alert).map_err(|err| CliError::new(format!("failed to read alert file: {err}")))?;
    let incident: Incident =
        serde_json::from_slice(&bytes).map_err(|err| CliError::new(format!("invalid alert json: {err}")))?;
    store.save_incident(&incident).map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(incident.id.as_str())?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Investigate Command
// ============================================================================

/// Drives the investigate pipeline for one incident.
fn command_investigate(store: &SqliteStore, config: &PipelineConfig, command: &IncidentIdArg) -> CliResult<ExitCode> {
    let incident_id = IncidentId::new(command.incident_id.as_str());
    investigate::run(store, config, &incident_id).map_err(|err| CliError::new(err.to_string()))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Incidents Commands
// ============================================================================

/// Dispatches `incidents` subcommands.
fn command_incidents(store: &SqliteStore, command: IncidentsCommand) -> CliResult<ExitCode> {
    match command {
        IncidentsCommand::List => command_incidents_list(store),
        IncidentsCommand::Show(command) => command_incidents_show(store, &command),
    }
}

/// Lists every materialized incident as newline-delimited JSON.
fn command_incidents_list(store: &SqliteStore) -> CliResult<ExitCode> {
    let incidents = store.list_incidents().map_err(|err| CliError::new(err.to_string()))?;
    for incident in &incidents {
        write_json_line(incident)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Prints a single incident record as JSON.
fn command_incidents_show(store: &SqliteStore, command: &IncidentIdArg) -> CliResult<ExitCode> {
    let incident_id = IncidentId::new(command.incident_id.as_str());
    let incident = store
        .load_incident(&incident_id)
        .map_err(|err| CliError::new(err.to_string()))?
        .ok_or_else(|| CliError::new(format!("incident {} not found", incident_id.as_str())))?;
    write_json_line(&incident)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Approve / Deny Commands
// ============================================================================

/// Records an operator decision against a pending remediation action.
///
/// Updates the action's own `approved_by`/`approved_at` fields (the only
/// place those survive) before resolving the out-of-band
/// [`aiops_core::ApprovalChannel`] request the blocked `investigate` run is
/// polling.
fn command_decision(store: &SqliteStore, command: &DecisionCommand, outcome: ApprovalOutcome) -> CliResult<ExitCode> {
    let action_id = ActionId::new(command.action_id.as_str());
    if outcome == ApprovalOutcome::Approved {
        let mut action = store
            .load_action(&action_id)
            .map_err(|err| CliError::new(err.to_string()))?
            .ok_or_else(|| CliError::new(format!("action {} not found", action_id.as_str())))?;
        action.approved_by = Some(command.approved_by.clone());
        action.approved_at = Some(wall_clock_now());
        store.save_action(&action).map_err(|err| CliError::new(err.to_string()))?;
    }
    store.resolve_approval(&action_id, outcome).map_err(|err| CliError::new(err.to_string()))?;
    Ok(ExitCode::SUCCESS)
}

/// Reads the current wall clock as a [`Timestamp`]. The sole place in the
/// CLI outside `investigate::run` that reads the wall clock; the workflow
/// core never does.
fn wall_clock_now() -> Timestamp {
    let now = time::OffsetDateTime::now_utc();
    #[allow(clippy::cast_possible_truncation, reason = "unix millis fit in i64 until the year 292277026596")]
    let millis = (now.unix_timestamp_nanos() / 1_000_000) as i64;
    Timestamp::UnixMillis(millis)
}

// ============================================================================
// SECTION: Audit Command
// ============================================================================

/// Prints an incident's journal, one event per line.
fn command_audit(store: &SqliteStore, command: &IncidentIdArg) -> CliResult<ExitCode> {
    let incident_id = IncidentId::new(command.incident_id.as_str());
    let journal = store.load_journal(&incident_id).map_err(|err| CliError::new(err.to_string()))?;
    for event_json in &journal {
        write_stdout_line(event_json)?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes `message` to stdout with a trailing newline.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

/// Serializes `value` as JSON and writes it to stdout with a trailing
/// newline.
fn write_json_line<T: serde::Serialize>(value: &T) -> CliResult<()> {
    let line = serde_json::to_string(value).map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{line}").map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

/// Writes `message` to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "{message}");
    ExitCode::FAILURE
}
