// LogScope - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// All errors preserve the causal chain for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for all LogScope operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LogScopeError {
    /// Format/regex registry loading or validation failed.
    Registry(RegistryError),

    /// A run or application setting is invalid.
    Config(ConfigError),

    /// The external mining algorithm failed.
    Miner(MinerError),

    /// A result table could not be read.
    Table(TableError),

    /// A filter selection could not be built.
    Filter(FilterError),

    /// Export operation failed.
    Export(ExportError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for LogScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry(e) => write!(f, "Registry error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Miner(e) => write!(f, "Algorithm failure: {e}"),
            Self::Table(e) => write!(f, "Table error: {e}"),
            Self::Filter(e) => write!(f, "Filter error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for LogScopeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Registry(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Miner(e) => Some(e),
            Self::Table(e) => Some(e),
            Self::Filter(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Template errors
// ---------------------------------------------------------------------------

/// Errors raised while compiling a field-extraction template.
#[derive(Debug)]
pub enum TemplateError {
    /// The template declares no `<Field>` placeholders.
    NoFields,

    /// A field name appears more than once.
    DuplicateField { name: String },

    /// A placeholder name is not a valid identifier.
    InvalidFieldName { name: String, position: usize },

    /// A `<` was never closed by `>`.
    UnterminatedPlaceholder { position: usize },

    /// A `)` without a matching `(`, or a `(` never closed.
    UnbalancedParentheses { position: usize },

    /// The template ends with a lone backslash.
    TrailingEscape,

    /// The template exceeds the maximum allowed length.
    TooLong { length: usize, max_length: usize },

    /// The generated pattern was rejected by the regex engine.
    Regex {
        pattern: String,
        source: regex::Error,
    },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFields => write!(f, "template declares no <Field> placeholders"),
            Self::DuplicateField { name } => {
                write!(f, "field '{name}' is declared more than once")
            }
            Self::InvalidFieldName { name, position } => write!(
                f,
                "invalid field name '{name}' at offset {position}; \
                 expected letters, digits or '_' not starting with a digit"
            ),
            Self::UnterminatedPlaceholder { position } => {
                write!(f, "placeholder opened at offset {position} is never closed")
            }
            Self::UnbalancedParentheses { position } => {
                write!(f, "unbalanced parenthesis at offset {position}")
            }
            Self::TrailingEscape => write!(f, "template ends with a lone backslash"),
            Self::TooLong { length, max_length } => write!(
                f,
                "template is {length} chars, exceeds maximum of {max_length}"
            ),
            Self::Regex { pattern, source } => {
                write!(f, "generated pattern '{pattern}' is invalid: {source}")
            }
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Regex { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Mask errors
// ---------------------------------------------------------------------------

/// Errors raised while compiling an ordered mask rule list.
#[derive(Debug)]
pub enum MaskError {
    /// A rule's pattern is not a valid regular expression.
    InvalidRegex {
        index: usize,
        pattern: String,
        source: Box<fancy_regex::Error>,
    },

    /// A rule's pattern exceeds the maximum allowed length.
    RegexTooLong {
        index: usize,
        length: usize,
        max_length: usize,
    },

    /// The rule list exceeds the maximum rule count.
    TooManyRules { count: usize, max: usize },
}

impl fmt::Display for MaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegex {
                index,
                pattern,
                source,
            } => write!(f, "mask rule #{index} ('{pattern}') is invalid: {source}"),
            Self::RegexTooLong {
                index,
                length,
                max_length,
            } => write!(
                f,
                "mask rule #{index} is {length} chars, exceeds maximum of {max_length}"
            ),
            Self::TooManyRules { count, max } => {
                write!(f, "{count} mask rules declared, maximum is {max}")
            }
        }
    }
}

impl std::error::Error for MaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRegex { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

/// Errors related to source profile loading and registry validation.
#[derive(Debug)]
pub enum RegistryError {
    /// TOML file could not be parsed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Profile file exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// A required field is missing or empty.
    MissingField {
        profile_id: String,
        field: &'static str,
    },

    /// The profile names a source kind that does not exist.
    UnknownSourceKind { profile_id: String, value: String },

    /// A `[defaults.<name>]` table names an algorithm that does not exist.
    UnknownAlgorithm { profile_id: String, value: String },

    /// The profile's field template does not compile.
    Template {
        profile_id: String,
        source: TemplateError,
    },

    /// The profile's mask rules do not compile.
    Mask {
        profile_id: String,
        source: MaskError,
    },

    /// No profile was loaded for a declared source kind.
    MissingKind { kind: String },

    /// Two profiles of the same origin claim the same source kind.
    DuplicateKind {
        kind: String,
        first: String,
        second: String,
    },

    /// A declared (algorithm, kind) pair lacks a default for a parameter.
    MissingDefault {
        kind: String,
        algorithm: String,
        parameter: String,
    },

    /// A registry default does not convert to its declared type.
    InvalidDefault {
        kind: String,
        algorithm: String,
        parameter: String,
        value: String,
        expected: &'static str,
    },

    /// I/O error reading a profile file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Failed to parse TOML '{}': {source}", path.display())
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "Profile '{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::MissingField { profile_id, field } => {
                write!(f, "Profile '{profile_id}': missing required field '{field}'")
            }
            Self::UnknownSourceKind { profile_id, value } => {
                write!(f, "Profile '{profile_id}': unknown source kind '{value}'")
            }
            Self::UnknownAlgorithm { profile_id, value } => {
                write!(f, "Profile '{profile_id}': unknown algorithm '{value}' in defaults")
            }
            Self::Template { profile_id, source } => {
                write!(f, "Profile '{profile_id}': invalid log format: {source}")
            }
            Self::Mask { profile_id, source } => {
                write!(f, "Profile '{profile_id}': invalid masking rules: {source}")
            }
            Self::MissingKind { kind } => {
                write!(f, "No profile defines source kind '{kind}'")
            }
            Self::DuplicateKind {
                kind,
                first,
                second,
            } => write!(f, "Source kind '{kind}' defined by both '{first}' and '{second}'"),
            Self::MissingDefault {
                kind,
                algorithm,
                parameter,
            } => write!(
                f,
                "No default for parameter '{parameter}' of {algorithm} on {kind} logs"
            ),
            Self::InvalidDefault {
                kind,
                algorithm,
                parameter,
                value,
                expected,
            } => write!(
                f,
                "Default '{parameter}' = '{value}' of {algorithm} on {kind} logs \
                 is not a valid {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "I/O error reading profile '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Template { source, .. } => Some(source),
            Self::Mask { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<RegistryError> for LogScopeError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Configuration errors: invalid run selections and tuning parameters.
/// config.toml problems are warnings, not errors. A run that hits one of these is aborted before the
/// algorithm is invoked.
#[derive(Debug)]
pub enum ConfigError {
    /// A tuning parameter does not convert to its declared type.
    InvalidParameter {
        algorithm: String,
        parameter: String,
        value: String,
        expected: &'static str,
    },

    /// A parameter override is not of the form `key=value`.
    MalformedOverride { pair: String },

    /// The selected source kind is not known.
    UnknownSourceKind { value: String },

    /// The selected algorithm is not known.
    UnknownAlgorithm { value: String },

    /// No profile is registered for the selected kind.
    ProfileNotFound { kind: String },

    /// The uploaded file exceeds the size limit.
    UploadTooLarge { size: u64, max_size: u64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter {
                algorithm,
                parameter,
                value,
                expected,
            } => write!(
                f,
                "{algorithm} parameter '{parameter}' must be of type {expected}, got '{value}'"
            ),
            Self::MalformedOverride { pair } => {
                write!(f, "Parameter override '{pair}' must be of the form key=value")
            }
            Self::UnknownSourceKind { value } => write!(
                f,
                "Unknown log type '{value}'. Expected one of: windows, linux, mac, suricata"
            ),
            Self::UnknownAlgorithm { value } => write!(
                f,
                "Unknown parser '{value}'. Expected one of: drain, spell, logcluster, iplom, molfi"
            ),
            Self::ProfileNotFound { kind } => {
                write!(f, "No format profile registered for {kind} logs")
            }
            Self::UploadTooLarge { size, max_size } => write!(
                f,
                "Uploaded file is {size} bytes, exceeds maximum of {max_size} bytes"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for LogScopeError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Miner errors
// ---------------------------------------------------------------------------

/// Failures of the external template-mining algorithm. The adapter turns
/// these into an empty result plus a report; they never escape as panics.
#[derive(Debug)]
pub enum MinerError {
    /// The miner process could not be started.
    Spawn {
        program: String,
        source: io::Error,
    },

    /// The miner exited unsuccessfully.
    Exited {
        algorithm: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The miner exceeded its wall-clock limit and was killed.
    Timeout { algorithm: String, limit: Duration },

    /// An expected output table was not produced.
    MissingOutput { path: PathBuf },

    /// An output table could not be read.
    Table(TableError),

    /// The job description could not be serialised.
    Job { source: serde_json::Error },

    /// The miner reported a failure of its own.
    Failed { algorithm: String, reason: String },

    /// I/O error on transient storage.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for MinerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { program, source } => {
                write!(f, "cannot start miner '{program}': {source}")
            }
            Self::Exited {
                algorithm,
                code,
                stderr,
            } => {
                match code {
                    Some(c) => write!(f, "{algorithm} exited with status {c}")?,
                    None => write!(f, "{algorithm} was terminated by a signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
            Self::Timeout { algorithm, limit } => {
                write!(f, "{algorithm} did not finish within {limit:?} and was stopped")
            }
            Self::MissingOutput { path } => {
                write!(f, "expected output '{}' was not produced", path.display())
            }
            Self::Table(e) => write!(f, "{e}"),
            Self::Job { source } => write!(f, "cannot serialise miner job: {source}"),
            Self::Failed { algorithm, reason } => write!(f, "{algorithm} failed: {reason}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for MinerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::Table(e) => Some(e),
            Self::Job { source } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<TableError> for MinerError {
    fn from(e: TableError) -> Self {
        Self::Table(e)
    }
}

impl From<MinerError> for LogScopeError {
    fn from(e: MinerError) -> Self {
        Self::Miner(e)
    }
}

// ---------------------------------------------------------------------------
// Table errors
// ---------------------------------------------------------------------------

/// Errors reading the algorithm's CSV result tables.
#[derive(Debug)]
pub enum TableError {
    /// CSV decoding error.
    Csv { path: PathBuf, source: csv::Error },

    /// A column required by this reader is absent.
    MissingColumn { path: PathBuf, column: String },

    /// A cell could not be interpreted.
    InvalidValue {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    /// I/O error opening the table.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv { path, source } => {
                write!(f, "cannot read table '{}': {source}", path.display())
            }
            Self::MissingColumn { path, column } => {
                write!(f, "table '{}' has no '{column}' column", path.display())
            }
            Self::InvalidValue {
                path,
                row,
                column,
                value,
            } => write!(
                f,
                "table '{}' row {row}: invalid '{column}' value '{value}'",
                path.display()
            ),
            Self::Io { path, source } => {
                write!(f, "cannot open table '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Csv { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<TableError> for LogScopeError {
    fn from(e: TableError) -> Self {
        Self::Table(e)
    }
}

// ---------------------------------------------------------------------------
// Filter errors
// ---------------------------------------------------------------------------

/// Errors building a filter selection from user input.
#[derive(Debug)]
pub enum FilterError {
    /// A `Column=v1,v2` spec could not be parsed.
    InvalidSpec { spec: String },

    /// A date bound could not be parsed.
    InvalidDate {
        value: String,
        source: chrono::ParseError,
    },

    /// The start of the date range is after its end.
    InvertedRange { start: String, end: String },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSpec { spec } => write!(
                f,
                "invalid filter '{spec}'; expected Column=value[,value...]"
            ),
            Self::InvalidDate { value, source } => {
                write!(f, "invalid date '{value}' (expected YYYY-MM-DD): {source}")
            }
            Self::InvertedRange { start, end } => {
                write!(f, "date range start {start} is after end {end}")
            }
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidDate { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<FilterError> for LogScopeError {
    fn from(e: FilterError) -> Self {
        Self::Filter(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Export would exceed maximum row count.
    TooManyRows { count: usize, max: usize },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
            Self::TooManyRows { count, max } => write!(
                f,
                "Export of {count} rows exceeds maximum of {max}. \
                 Apply filters to reduce the result set."
            ),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ExportError> for LogScopeError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

/// Convenience type alias for LogScope results.
pub type Result<T> = std::result::Result<T, LogScopeError>;
