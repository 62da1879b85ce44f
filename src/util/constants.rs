// LogScope - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogScope";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogScope";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Upload limits
// =============================================================================

/// Maximum size of an uploaded log file in bytes.
pub const MAX_UPLOAD_BYTES: u64 = 512 * 1024 * 1024; // 512 MB

/// File name used for an upload when the caller supplies none.
pub const DEFAULT_UPLOAD_NAME: &str = "upload.log";

// =============================================================================
// Template compiler
// =============================================================================

/// Maximum length of a field-extraction template string.
pub const MAX_TEMPLATE_LENGTH: usize = 2_048;

/// Maximum generated regex size handed to the regex builder (bytes).
/// Bounds compile-time memory for pathological templates.
pub const MAX_COMPILED_REGEX_SIZE: usize = 1024 * 1024;

// =============================================================================
// Masking
// =============================================================================

/// Token substituted for every span a mask rule matches.
/// Matches the wildcard used by the mining libraries.
pub const WILDCARD_TOKEN: &str = "<*>";

/// Maximum regex pattern length for a single mask rule.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4_096;

/// Maximum number of mask rules per source kind.
pub const MAX_MASK_RULES: usize = 64;

/// Backtracking step limit for a single mask rule evaluation.
pub const MASK_BACKTRACK_LIMIT: usize = 1_000_000;

// =============================================================================
// Miner invocation
// =============================================================================

/// Default wall-clock limit for one algorithm run.
pub const DEFAULT_MINER_TIMEOUT_SECS: u64 = 600;

/// Minimum user-configurable miner timeout.
pub const MIN_MINER_TIMEOUT_SECS: u64 = 1;

/// Maximum user-configurable miner timeout (6 hours).
pub const MAX_MINER_TIMEOUT_SECS: u64 = 6 * 3_600;

/// How often the miner child process is polled for exit (ms).
pub const MINER_POLL_INTERVAL_MS: u64 = 50;

/// Default Python interpreter used to reach the logparser package.
pub const DEFAULT_PYTHON: &str = "python3";

/// Maximum bytes of miner stderr kept for failure reports.
pub const MAX_MINER_STDERR_BYTES: usize = 16 * 1024;

/// Suffix of the per-line structured output table.
pub const STRUCTURED_SUFFIX: &str = "_structured.csv";

/// Suffix of the per-template summary output table.
pub const TEMPLATES_SUFFIX: &str = "_templates.csv";

/// Name of the job description file written next to the bridge script.
pub const MINER_JOB_FILE_NAME: &str = "job.json";

/// Name of the bridge script written into transient storage.
pub const BRIDGE_SCRIPT_NAME: &str = "logparser_bridge.py";

// =============================================================================
// Dashboard
// =============================================================================

/// Sentinel a user picks to mean "every observed value".
pub const ALL_SENTINEL: &str = "ALL";

/// Default N for top-N frequency tables.
pub const DEFAULT_TOP_N: usize = 10;

/// Maximum user-configurable top-N.
pub const MAX_TOP_N: usize = 1_000;

/// Label for series values collapsed outside the top-N.
pub const OTHER_SERIES_LABEL: &str = "Other";

/// Placeholder shown when no row carries a parseable datetime.
pub const TIME_SPAN_UNAVAILABLE: &str = "N/A";

/// Maximum number of time buckets produced by one series aggregate.
/// Guards against a selected fine width over a very long span.
pub const MAX_TIME_BUCKETS: usize = 100_000;

// =============================================================================
// Profile limits
// =============================================================================

/// Maximum size of a profile TOML file in bytes.
pub const MAX_PROFILE_FILE_SIZE: u64 = 64 * 1024; // 64 KB

/// Reference year placeholder usable in a datetime compose pattern.
pub const REFERENCE_YEAR_PLACEHOLDER: &str = "@year";

// =============================================================================
// Preview
// =============================================================================

/// Default number of lines shown by `preview`.
pub const DEFAULT_PREVIEW_LINES: usize = 10;

/// Maximum number of lines shown by `preview`.
pub const MAX_PREVIEW_LINES: usize = 1_000;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
/// Prevents accidental exposure of sensitive data in long lines.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Export
// =============================================================================

/// Maximum number of rows that can be exported in a single operation.
pub const MAX_EXPORT_ROWS: usize = 5_000_000;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// User profiles subdirectory name.
pub const PROFILES_DIR_NAME: &str = "profiles";
