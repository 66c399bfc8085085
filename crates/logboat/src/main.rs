use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use logboat_core::aggregator::AGGREGATE_FILE;
use logboat_core::config::{AnalysisConfig, SessionConfig, SessionManifest};
use logboat_core::{
    aggregate_sessions, analyze_session, write_aggregate_csv, write_session_outputs,
    SessionAnalysis,
};
use logboat_parser::{
    parse_log_time, parse_navigation_log, NavigationLog, MESSAGE_COLUMN, TIMESTAMP_COLUMN,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DATA_DIR_VAR: &str = "LOGBOAT_DATA_DIR";
const OUTPUT_DIR_VAR: &str = "LOGBOAT_OUTPUT_DIR";
const DEFAULT_OUTPUT_ROOT: &str = "analyses";

#[derive(Parser, Debug)]
#[command(author, version, about = "Transect analysis for boat navigation logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one session of a navigation log
    Analyze(AnalyzeArgs),
    /// Analyze every session listed in a manifest
    Batch(BatchArgs),
    /// Merge the transect tables of all analyzed sessions
    Aggregate(AggregateArgs),
    /// List the message types and fields of a navigation log
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Boat name, used in transect ids and the output directory
    name: String,
    /// Navigation log CSV; relative paths are resolved against LOGBOAT_DATA_DIR
    dataset: PathBuf,
    /// Session start, e.g. "2023-06-12 10:00:00"
    #[arg(value_parser = parse_time_arg)]
    start_time: NaiveDateTime,
    /// Drop positions whose latitude text matches this regular expression
    latitude_exclude: Option<String>,
    /// Keep only positions whose longitude text matches this regular expression
    longitude_require: Option<String>,
    /// Session end; defaults to the end of the log
    #[arg(long, value_parser = parse_time_arg)]
    end: Option<NaiveDateTime>,
    /// Analysis configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output directory; defaults to <LOGBOAT_OUTPUT_DIR>/<YYMMDD>_<name>
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Session manifest (TOML with [[session]] entries)
    #[arg(long)]
    manifest: PathBuf,
    /// Root directory for session outputs
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct AggregateArgs {
    /// Directory holding one sub-directory per analyzed session
    #[arg(long)]
    root: Option<PathBuf>,
    /// Aggregate CSV to write
    #[arg(long, default_value = AGGREGATE_FILE)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Navigation log CSV; relative paths are resolved against LOGBOAT_DATA_DIR
    dataset: PathBuf,
    /// Analysis configuration (TOML), for a custom column layout
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Batch(args) => run_batch(args),
        Command::Aggregate(args) => run_aggregate(args),
        Command::Inspect(args) => run_inspect(args),
    }
}

fn parse_time_arg(value: &str) -> Result<NaiveDateTime, String> {
    parse_log_time(value).ok_or_else(|| format!("unrecognized time '{value}'"))
}

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let session = SessionConfig {
        name: args.name,
        log: args.dataset,
        start: args.start_time,
        end: args.end,
        latitude_exclude: args.latitude_exclude,
        longitude_require: args.longitude_require,
        output_dir: None,
    };

    let log_path = resolve_data_path(&session.log, None);
    let log = read_log(&log_path, &config)?;
    let analysis = analyze_session(&log, &session, &config)
        .with_context(|| format!("failed to analyze session '{}'", session.name))?;

    let dir = args
        .out
        .unwrap_or_else(|| session.resolve_output_dir(&output_root(None, None)));
    write_session_outputs(&dir, &analysis)
        .with_context(|| format!("failed to write outputs to {}", dir.display()))?;

    println!("{}", transect_table(&analysis));
    Ok(())
}

fn run_batch(args: BatchArgs) -> Result<()> {
    let manifest = SessionManifest::load(&args.manifest)?;
    let manifest_dir = args.manifest.parent().map(Path::to_path_buf);
    let root = output_root(args.out, manifest.output_root.clone());

    let mut failed = Vec::new();
    for session in &manifest.sessions {
        let log_path = resolve_data_path(&session.log, manifest_dir.as_deref());
        let outcome = read_log(&log_path, &manifest.analysis).and_then(|log| {
            let analysis = analyze_session(&log, session, &manifest.analysis)?;
            let dir = session.resolve_output_dir(&root);
            write_session_outputs(&dir, &analysis)?;
            Ok(analysis)
        });

        match outcome {
            Ok(analysis) => println!("{}\n{}", session.name, transect_table(&analysis)),
            Err(err) => {
                let message = format!("{err:#}");
                error!(session = %session.name, error = %message, "Session failed");
                failed.push(session.name.clone());
            }
        }
    }

    info!(
        sessions = manifest.sessions.len(),
        failed = failed.len(),
        "Batch finished"
    );
    if !failed.is_empty() {
        bail!("{} session(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

fn run_aggregate(args: AggregateArgs) -> Result<()> {
    let root = output_root(args.root, None);
    let rows = aggregate_sessions(&root)
        .with_context(|| format!("failed to aggregate sessions under {}", root.display()))?;
    write_aggregate_csv(&args.out, &rows)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    info!(rows = rows.len(), out = %args.out.display(), "Wrote aggregate table");
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let log = read_log(&resolve_data_path(&args.dataset, None), &config)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Message", "Rows", "Fields"]);
    for name in log.message_names()? {
        let rows = log.messages(&name)?;
        let fields: Vec<&str> = rows
            .get_column_names()
            .into_iter()
            .map(|column| column.as_str())
            .filter(|column| *column != TIMESTAMP_COLUMN && *column != MESSAGE_COLUMN)
            .collect();
        table.add_row(vec![name.clone(), rows.height().to_string(), fields.join(", ")]);
    }

    println!("{} rows, {} skipped, hash {}", log.height(), log.skipped_rows, log.file_hash);
    println!("{table}");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => Ok(AnalysisConfig::load(path)?),
        None => Ok(AnalysisConfig::default()),
    }
}

fn read_log(path: &Path, config: &AnalysisConfig) -> Result<NavigationLog> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let log = parse_navigation_log(&bytes, &config.log)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    info!(
        path = %path.display(),
        rows = log.height(),
        skipped = log.skipped_rows,
        "Loaded navigation log"
    );
    Ok(log)
}

/// Relative logs live under LOGBOAT_DATA_DIR, or next to the manifest that lists them.
fn resolve_data_path(path: &Path, fallback_base: Option<&Path>) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::var_os(DATA_DIR_VAR) {
        Some(base) => PathBuf::from(base).join(path),
        None => match fallback_base {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        },
    }
}

fn output_root(explicit: Option<PathBuf>, configured: Option<PathBuf>) -> PathBuf {
    explicit
        .or(configured)
        .or_else(|| std::env::var_os(OUTPUT_DIR_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_ROOT))
}

fn transect_table(analysis: &SessionAnalysis) -> Table {
    let value = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Transect",
        "Length [m]",
        "Direction [deg]",
        "Duration [s]",
        "Speed [m/s]",
        "STW [m/s]",
        "Bearing [deg]",
        "Wind [deg]",
        "Wind [m/s]",
        "Check",
    ]);
    for transect in &analysis.transects {
        table.add_row(vec![
            transect.traj_id.clone(),
            format!("{:.1}", transect.length_m),
            format!("{:.1}", transect.direction_deg),
            format!("{:.1}", transect.duration_s),
            value(transect.speed),
            value(transect.speed_water),
            value(transect.bearing),
            value(transect.wind_direction),
            value(transect.wind_speed),
            transect.check.to_string(),
        ]);
    }
    table
}
