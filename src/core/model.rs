// LogScope - core/model.rs
//
// Core data model types. Pure data definitions with no I/O, no UI,
// no platform dependencies.
//
// These types are the shared vocabulary across all layers.

use crate::core::mask::MaskPipeline;
use crate::core::template::Matcher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Source kind
// =============================================================================

/// The family of log source a file comes from. Each kind maps to exactly one
/// field-extraction template and one ordered mask rule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Windows CBS event-style logs.
    Windows,
    /// Syslog-style Linux logs.
    Linux,
    /// macOS system.log-style logs.
    Mac,
    /// Suricata IDS fast-alert logs.
    Suricata,
}

impl SourceKind {
    /// Returns all variants in display order.
    pub fn all() -> &'static [SourceKind] {
        &[
            SourceKind::Windows,
            SourceKind::Linux,
            SourceKind::Mac,
            SourceKind::Suricata,
        ]
    }

    /// Stable lowercase identifier used in profiles and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::Windows => "windows",
            SourceKind::Linux => "linux",
            SourceKind::Mac => "mac",
            SourceKind::Suricata => "suricata",
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Windows => "Windows",
            SourceKind::Linux => "Linux",
            SourceKind::Mac => "Mac",
            SourceKind::Suricata => "Suricata",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    /// Case-insensitive match on the identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SourceKind::all()
            .iter()
            .copied()
            .find(|k| k.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| s.to_string())
    }
}

// =============================================================================
// Algorithm
// =============================================================================

/// Declared scalar type of a tuning parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Int,
    Float,
}

impl ScalarType {
    /// Name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Int => "integer",
            ScalarType::Float => "float",
        }
    }
}

/// Name and type of one tuning parameter an algorithm accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ScalarType,
}

const DRAIN_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "depth",
        ty: ScalarType::Int,
    },
    ParamSpec {
        name: "threshold",
        ty: ScalarType::Float,
    },
];

const SPELL_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "threshold",
    ty: ScalarType::Float,
}];

const LOGCLUSTER_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "rsupport",
    ty: ScalarType::Int,
}];

const IPLOM_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "CT",
        ty: ScalarType::Float,
    },
    ParamSpec {
        name: "lowerBound",
        ty: ScalarType::Float,
    },
];

/// A template-mining algorithm provided by the external mining library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Drain,
    Spell,
    LogCluster,
    Iplom,
    Molfi,
}

impl Algorithm {
    /// Returns all variants in display order.
    pub fn all() -> &'static [Algorithm] {
        &[
            Algorithm::Drain,
            Algorithm::Spell,
            Algorithm::LogCluster,
            Algorithm::Iplom,
            Algorithm::Molfi,
        ]
    }

    /// Stable lowercase identifier used in profiles and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Algorithm::Drain => "drain",
            Algorithm::Spell => "spell",
            Algorithm::LogCluster => "logcluster",
            Algorithm::Iplom => "iplom",
            Algorithm::Molfi => "molfi",
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Algorithm::Drain => "Drain",
            Algorithm::Spell => "Spell",
            Algorithm::LogCluster => "LogCluster",
            Algorithm::Iplom => "IPLoM",
            Algorithm::Molfi => "MoLFI",
        }
    }

    /// Tuning parameters this algorithm accepts, in declaration order.
    pub fn parameter_specs(&self) -> &'static [ParamSpec] {
        match self {
            Algorithm::Drain => DRAIN_PARAMS,
            Algorithm::Spell => SPELL_PARAMS,
            Algorithm::LogCluster => LOGCLUSTER_PARAMS,
            Algorithm::Iplom => IPLOM_PARAMS,
            Algorithm::Molfi => &[],
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Algorithm::all()
            .iter()
            .copied()
            .find(|a| a.id().eq_ignore_ascii_case(wanted) || a.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| s.to_string())
    }
}

// =============================================================================
// Parameters
// =============================================================================

/// A parameter value after conversion to its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Int(i64),
    Float(f64),
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Int(v) => write!(f, "{v}"),
            TypedValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One resolved tuning parameter handed to the miner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParserParameter {
    pub name: String,
    pub ty: ScalarType,
    /// The string the value was converted from (override or default).
    pub raw: String,
    pub value: TypedValue,
}

// =============================================================================
// Masking
// =============================================================================

/// One ordered masking rule: every span `pattern` matches is replaced by
/// `replacement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaskRule {
    pub pattern: String,
    pub replacement: String,
}

impl MaskRule {
    /// Rule that substitutes the mining libraries' wildcard token.
    pub fn wildcard(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: crate::util::constants::WILDCARD_TOKEN.to_string(),
        }
    }
}

// =============================================================================
// Derived datetime and dashboard definitions
// =============================================================================

/// Recipe for synthesising a datetime from a row's extracted fields.
///
/// `compose` interpolates `{Field}` column values and `{@year}` (the
/// reference year); the result is tried against each chrono format in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatetimeRecipe {
    pub compose: String,
    pub formats: Vec<String>,
}

/// Which widgets a source kind's dashboard shows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DashboardDef {
    /// Categorical columns offered as filters.
    pub filter_columns: Vec<String>,
    /// Columns whose unique counts appear among the scalar metrics.
    pub metric_columns: Vec<String>,
    /// Column whose per-value counts appear as individual widgets.
    pub count_column: Option<String>,
    /// Column splitting the time series; `None` for a single series.
    pub series_column: Option<String>,
    /// Collapse series values outside the top N into "Other".
    pub series_top_n: Option<usize>,
    /// Column whose per-value activity over time is shown as a heatmap.
    pub heatmap_column: Option<String>,
    /// Column ranked by the top-N frequency table.
    pub top_column: String,
    /// Column pairs cross-tabulated.
    pub crosstabs: Vec<(String, String)>,
}

// =============================================================================
// Source profile (runtime representation)
// =============================================================================

/// Runtime representation of a source profile after TOML parsing,
/// template compilation, and mask rule compilation.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    pub kind: SourceKind,
    pub name: String,
    pub description: String,
    /// Field-extraction template as written in the profile.
    pub log_format: String,
    /// Compiled form of `log_format`.
    pub matcher: Matcher,
    pub mask_rules: Vec<MaskRule>,
    /// Compiled form of `mask_rules`.
    pub masker: MaskPipeline,
    pub datetime: DatetimeRecipe,
    pub dashboard: DashboardDef,
    /// Default parameter strings per algorithm, keyed by parameter name.
    pub defaults: BTreeMap<Algorithm, BTreeMap<String, String>>,
    pub is_builtin: bool,
}

impl SourceProfile {
    /// Default parameter strings for `algorithm`, if any were declared.
    pub fn defaults_for(&self, algorithm: Algorithm) -> Option<&BTreeMap<String, String>> {
        self.defaults.get(&algorithm)
    }
}

// =============================================================================
// Tests
// =============================================================================
