// LogScope - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation (debug mode support)
// 3. Registry loading (built-in + user-defined profiles)
// 4. Dispatch to the run / preview / defaults commands

use chrono::{Datelike, NaiveDate};
use clap::{Args, Parser, Subcommand};
use logscope::app::adapter::{ParserAdapter, Upload};
use logscope::app::miner::LogparserMiner;
use logscope::app::session::{Completion, Session};
use logscope::app::{preview, registry_mgr};
use logscope::core::aggregate::BucketWidth;
use logscope::core::dashboard::{self, DashboardOptions, DashboardOutcome};
use logscope::core::filter::{self, FilterSelection, FilteredView};
use logscope::core::model::{Algorithm, SourceKind, SourceProfile};
use logscope::core::registry::Registry;
use logscope::core::export::{self, RowFormat};
use logscope::core::{datetime, params};
use logscope::platform::config::{self, AppConfig, PlatformPaths};
use logscope::platform::fs;
use logscope::ui;
use logscope::util::constants;
use logscope::util::error::{ConfigError, ExportError, LogScopeError, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Mine event templates from log files and summarise them.
#[derive(Parser, Debug)]
#[command(name = "logscope", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory containing user-defined format profiles.
    #[arg(short = 'p', long = "profile-dir", global = true)]
    profile_dir: Option<PathBuf>,

    /// Path to config.toml (defaults to the platform config directory).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a log file with a mining algorithm and show its dashboard.
    Run(RunArgs),
    /// Show what the log format and masking rules make of sample lines.
    Preview(PreviewArgs),
    /// List default algorithm parameters per log type.
    Defaults(DefaultsArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Log file to parse.
    file: PathBuf,

    /// Log type: windows, linux, mac, suricata.
    #[arg(short = 'k', long)]
    kind: String,

    /// Algorithm: drain, spell, logcluster, iplom, molfi.
    #[arg(short = 'a', long)]
    algorithm: String,

    /// Parameter override, e.g. -P depth=5 (repeatable).
    #[arg(short = 'P', long = "param")]
    params: Vec<String>,

    /// Keep rows whose column has one of the values, e.g. Level=Info,Error.
    #[arg(short = 'f', long = "filter")]
    filters: Vec<String>,

    /// First calendar day to include (YYYY-MM-DD).
    #[arg(long)]
    from: Option<String>,

    /// Last calendar day to include (YYYY-MM-DD).
    #[arg(long)]
    to: Option<String>,

    /// Time-series bucket: 1min, 5min, 15min, 30min, 1h, 3h, 1d.
    #[arg(long)]
    bucket: Option<BucketWidth>,

    /// Year assumed for log types whose timestamps omit it.
    #[arg(long = "reference-year")]
    reference_year: Option<i32>,

    /// Print the dashboard as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Write the filtered rows to a CSV file.
    #[arg(long = "export-csv")]
    export_csv: Option<PathBuf>,

    /// Write the filtered rows to a JSON file.
    #[arg(long = "export-json")]
    export_json: Option<PathBuf>,

    /// Write the template summary to a CSV file.
    #[arg(long = "export-templates")]
    export_templates: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    /// Log file to sample.
    file: PathBuf,

    /// Log type: windows, linux, mac, suricata.
    #[arg(short = 'k', long)]
    kind: String,

    /// Number of lines to sample.
    #[arg(short = 'n', long, default_value_t = constants::DEFAULT_PREVIEW_LINES)]
    lines: usize,

    /// Print the preview as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct DefaultsArgs {
    /// Only this log type.
    #[arg(short = 'k', long)]
    kind: Option<String>,

    /// Only this algorithm.
    #[arg(short = 'a', long)]
    algorithm: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let platform_paths = PlatformPaths::resolve();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| platform_paths.config_file.clone());
    let (app_config, config_warnings) = config::load_config(&config_path);

    logscope::util::logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        config = %config_path.display(),
        "LogScope starting"
    );
    for warning in &config_warnings {
        tracing::warn!("{warning}");
    }

    // Profile directory: CLI > config.toml > platform default
    let user_profile_dir = cli
        .profile_dir
        .clone()
        .or_else(|| app_config.user_profile_directory.clone())
        .unwrap_or_else(|| platform_paths.user_profiles_dir.clone());

    let registry = match registry_mgr::load_registry(Some(&user_profile_dir)) {
        Ok((registry, profile_errors)) => {
            for err in &profile_errors {
                eprintln!("warning: {err}");
            }
            registry
        }
        Err(e) => {
            tracing::error!(error = %e, "Built-in profiles failed to load");
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    let result = match cli.command {
        Command::Run(args) => cmd_run(&registry, &app_config, args),
        Command::Preview(args) => cmd_preview(&registry, args),
        Command::Defaults(args) => cmd_defaults(&registry, args),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

// =============================================================================
// Commands
// =============================================================================

fn cmd_run(registry: &Registry, app_config: &AppConfig, args: RunArgs) -> Result<()> {
    let kind = parse_kind(&args.kind)?;
    let algorithm = parse_algorithm(&args.algorithm)?;
    let overrides = params::parse_overrides(&args.params)?;
    let selection = build_selection(&args)?;
    let profile = lookup(registry, kind)?;

    let bytes = fs::read_file_capped(&args.file, constants::MAX_UPLOAD_BYTES).map_err(|e| {
        LogScopeError::Io {
            path: args.file.clone(),
            operation: "read log file",
            source: e,
        }
    })?;
    let upload = Upload::new(args.file.to_string_lossy(), bytes);

    let miner = LogparserMiner::new(
        app_config.python.clone(),
        Duration::from_secs(app_config.miner_timeout_secs),
    );
    let adapter = ParserAdapter::new(registry, &miner);

    let mut session = Session::new();
    let ticket = session.begin_run();
    let result = adapter.run(&upload, algorithm, kind, &overrides);
    match session.complete(ticket, result) {
        Completion::Committed => {}
        Completion::AlgorithmFailed(e) => return Err(e.into()),
        Completion::Rejected(e) => return Err(e.into()),
        Completion::Stale => {
            tracing::warn!("Run was superseded; nothing to show");
            return Ok(());
        }
    }
    let Some(results) = session.results() else {
        return Ok(());
    };

    let reference_year = args
        .reference_year
        .unwrap_or_else(|| chrono::Local::now().year());
    let datetimes = datetime::derive_all(&results.structured, &profile.datetime, reference_year);

    let options = DashboardOptions {
        bucket: args.bucket,
        top_n: app_config.top_n,
    };
    let outcome =
        dashboard::build_dashboard(&results.structured, &datetimes, profile, &selection, &options);

    let empty_view = FilteredView::default();
    let view = match &outcome {
        DashboardOutcome::Report(report) => &report.view,
        DashboardOutcome::Empty { .. } => &empty_view,
    };

    if let Some(path) = &args.export_csv {
        let rows = export::export_rows_to_path(&results.structured, view, RowFormat::Csv, path)?;
        eprintln!("Exported {rows} rows to {}", path.display());
    }
    if let Some(path) = &args.export_json {
        let rows = export::export_rows_to_path(&results.structured, view, RowFormat::Json, path)?;
        eprintln!("Exported {rows} rows to {}", path.display());
    }
    if let Some(path) = &args.export_templates {
        let count = export::export_templates_to_path(&results.templates, path)?;
        eprintln!("Exported {count} templates to {}", path.display());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        export::export_dashboard_json(&outcome, &mut out, Path::new("<stdout>"))?;
        writeln!(out).map_err(stdout_err)?;
    } else {
        ui::dashboard::render_run(&mut out, results).map_err(stdout_err)?;
        ui::dashboard::render_templates(&mut out, &results.templates).map_err(stdout_err)?;
        ui::dashboard::render_outcome(&mut out, &outcome).map_err(stdout_err)?;
    }
    Ok(())
}

fn cmd_preview(registry: &Registry, args: PreviewArgs) -> Result<()> {
    let kind = parse_kind(&args.kind)?;
    let profile = lookup(registry, kind)?;
    let max_lines = args.lines.clamp(1, constants::MAX_PREVIEW_LINES);

    let lines = fs::read_first_lines(&args.file, max_lines).map_err(|e| LogScopeError::Io {
        path: args.file.clone(),
        operation: "read sample lines",
        source: e,
    })?;
    let previewed = preview::preview(profile, lines.iter().map(String::as_str), max_lines);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &previewed).map_err(|e| ExportError::Json {
            path: PathBuf::from("<stdout>"),
            source: e,
        })?;
        writeln!(out).map_err(stdout_err)?;
    } else {
        ui::listing::render_preview(&mut out, profile, &previewed).map_err(stdout_err)?;
    }
    Ok(())
}

fn cmd_defaults(registry: &Registry, args: DefaultsArgs) -> Result<()> {
    let profiles: Vec<&SourceProfile> = match &args.kind {
        Some(k) => vec![lookup(registry, parse_kind(k)?)?],
        None => registry.profiles().collect(),
    };
    let algorithms: Vec<Algorithm> = match &args.algorithm {
        Some(a) => vec![parse_algorithm(a)?],
        None => Algorithm::all().to_vec(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    ui::listing::render_defaults(&mut out, &profiles, &algorithms).map_err(stdout_err)?;
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_kind(value: &str) -> std::result::Result<SourceKind, ConfigError> {
    value
        .parse()
        .map_err(|value| ConfigError::UnknownSourceKind { value })
}

fn parse_algorithm(value: &str) -> std::result::Result<Algorithm, ConfigError> {
    value
        .parse()
        .map_err(|value| ConfigError::UnknownAlgorithm { value })
}

fn lookup(registry: &Registry, kind: SourceKind) -> std::result::Result<&SourceProfile, ConfigError> {
    registry.get(kind).ok_or_else(|| ConfigError::ProfileNotFound {
        kind: kind.label().to_string(),
    })
}

/// Assemble the filter selection from `--filter`, `--from` and `--to`.
/// A missing bound leaves that side of the range open.
fn build_selection(args: &RunArgs) -> Result<FilterSelection> {
    let mut selection = FilterSelection::default();
    for spec in &args.filters {
        selection.add_spec(spec)?;
    }

    let from = args.from.as_deref().map(filter::parse_date).transpose()?;
    let to = args.to.as_deref().map(filter::parse_date).transpose()?;
    if from.is_some() || to.is_some() {
        selection.set_date_range(
            from.unwrap_or(NaiveDate::MIN),
            to.unwrap_or(NaiveDate::MAX),
        )?;
    }
    Ok(selection)
}

fn stdout_err(e: io::Error) -> LogScopeError {
    LogScopeError::Io {
        path: PathBuf::from("<stdout>"),
        operation: "write output",
        source: e,
    }
}
