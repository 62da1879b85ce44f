// LogScope - core/registry.rs
//
// Source profile loading, validation, and the kind -> profile registry.
// Core layer: accepts TOML strings, never touches the filesystem.
// I/O for user profiles is handled by app::registry_mgr which feeds content here.

use crate::core::mask::MaskPipeline;
use crate::core::model::{
    Algorithm, DashboardDef, DatetimeRecipe, MaskRule, SourceKind, SourceProfile,
};
use crate::core::{params, template};
use crate::util::constants;
use crate::util::error::RegistryError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// =============================================================================
// TOML deserialization structures (raw input)
// =============================================================================

/// Raw TOML profile definition as deserialized from a .toml file.
/// This is validated and compiled into a `SourceProfile` for runtime use.
#[derive(Debug, Deserialize)]
pub struct ProfileDefinition {
    pub profile: ProfileMeta,
    pub format: FormatDef,
    #[serde(default)]
    pub masking: MaskingDef,
    pub datetime: DatetimeDef,
    #[serde(default)]
    pub dashboard: DashboardTable,
    #[serde(default)]
    pub defaults: BTreeMap<String, BTreeMap<String, RawScalar>>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileMeta {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct FormatDef {
    pub template: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct MaskingDef {
    #[serde(default)]
    pub rules: Vec<RawMaskRule>,
}

/// A mask rule written either as a bare pattern (replaced by the wildcard
/// token) or as a `{ pattern, replacement }` table.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawMaskRule {
    Pattern(String),
    Rule {
        pattern: String,
        replacement: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
pub struct DatetimeDef {
    pub compose: String,
    #[serde(default)]
    pub formats: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardTable {
    #[serde(default)]
    pub filter_columns: Vec<String>,
    #[serde(default)]
    pub metric_columns: Vec<String>,
    #[serde(default)]
    pub count_column: Option<String>,
    #[serde(default)]
    pub series_column: Option<String>,
    #[serde(default)]
    pub series_top_n: Option<usize>,
    #[serde(default)]
    pub heatmap_column: Option<String>,
    #[serde(default = "default_top_column")]
    pub top_column: String,
    #[serde(default)]
    pub crosstabs: Vec<(String, String)>,
}

impl Default for DashboardTable {
    fn default() -> Self {
        Self {
            filter_columns: Vec::new(),
            metric_columns: Vec::new(),
            count_column: None,
            series_column: None,
            series_top_n: None,
            heatmap_column: None,
            top_column: default_top_column(),
            crosstabs: Vec::new(),
        }
    }
}

fn default_top_column() -> String {
    "EventTemplate".to_string()
}

/// Default parameter values may be written as strings or bare numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    Text(String),
    Int(i64),
    Float(f64),
}

impl RawScalar {
    fn into_string(self) -> String {
        match self {
            RawScalar::Text(s) => s,
            RawScalar::Int(v) => v.to_string(),
            RawScalar::Float(v) => v.to_string(),
        }
    }
}

// =============================================================================
// Profile validation and compilation
// =============================================================================

/// Parse a TOML string into a `ProfileDefinition`.
///
/// `source_path` is used for error messages only (not for I/O).
pub fn parse_profile_toml(
    toml_content: &str,
    source_path: &Path,
) -> Result<ProfileDefinition, RegistryError> {
    toml::from_str(toml_content).map_err(|e| RegistryError::TomlParse {
        path: source_path.to_path_buf(),
        source: e,
    })
}

/// Validate a `ProfileDefinition` and compile it into a runtime `SourceProfile`.
///
/// Validates:
/// - The kind is known and the name is non-empty
/// - The log format compiles and the mask rules compile
/// - The datetime recipe has at least one format
/// - Every parameter of every algorithm has a default that converts to
///   its declared type
pub fn validate_and_compile(
    def: ProfileDefinition,
    source_path: &Path,
    is_builtin: bool,
) -> Result<SourceProfile, RegistryError> {
    let profile_id = def.profile.kind.clone();

    let kind: SourceKind =
        def.profile
            .kind
            .parse()
            .map_err(|value| RegistryError::UnknownSourceKind {
                profile_id: profile_id.clone(),
                value,
            })?;

    if def.profile.name.trim().is_empty() {
        return Err(RegistryError::MissingField {
            profile_id,
            field: "profile.name",
        });
    }
    if def.format.template.trim().is_empty() {
        return Err(RegistryError::MissingField {
            profile_id,
            field: "format.template",
        });
    }
    if def.datetime.formats.is_empty() {
        return Err(RegistryError::MissingField {
            profile_id,
            field: "datetime.formats",
        });
    }

    let matcher =
        template::compile(&def.format.template).map_err(|source| RegistryError::Template {
            profile_id: profile_id.clone(),
            source,
        })?;

    let mask_rules: Vec<MaskRule> = def
        .masking
        .rules
        .into_iter()
        .map(|raw| match raw {
            RawMaskRule::Pattern(pattern) => MaskRule::wildcard(pattern),
            RawMaskRule::Rule {
                pattern,
                replacement,
            } => MaskRule {
                pattern,
                replacement: replacement
                    .unwrap_or_else(|| constants::WILDCARD_TOKEN.to_string()),
            },
        })
        .collect();

    let masker = MaskPipeline::new(&mask_rules).map_err(|source| RegistryError::Mask {
        profile_id: profile_id.clone(),
        source,
    })?;

    for name in compose_references(&def.datetime.compose) {
        if name != constants::REFERENCE_YEAR_PLACEHOLDER
            && !matcher.field_names().iter().any(|f| f == name)
        {
            tracing::warn!(
                profile_id = %profile_id,
                source = %source_path.display(),
                field = name,
                "Datetime recipe references a field the log format does not declare"
            );
        }
    }

    let defaults = compile_defaults(kind, &profile_id, def.defaults)?;

    let dashboard = DashboardDef {
        filter_columns: def.dashboard.filter_columns,
        metric_columns: def.dashboard.metric_columns,
        count_column: def.dashboard.count_column,
        series_column: def.dashboard.series_column,
        series_top_n: def.dashboard.series_top_n,
        heatmap_column: def.dashboard.heatmap_column,
        top_column: def.dashboard.top_column,
        crosstabs: def.dashboard.crosstabs,
    };

    Ok(SourceProfile {
        kind,
        name: def.profile.name,
        description: def.profile.description,
        log_format: def.format.template,
        matcher,
        mask_rules,
        masker,
        datetime: DatetimeRecipe {
            compose: def.datetime.compose,
            formats: def.datetime.formats,
        },
        dashboard,
        defaults,
        is_builtin,
    })
}

/// Check every algorithm's defaults for completeness and type.
fn compile_defaults(
    kind: SourceKind,
    profile_id: &str,
    raw: BTreeMap<String, BTreeMap<String, RawScalar>>,
) -> Result<BTreeMap<Algorithm, BTreeMap<String, String>>, RegistryError> {
    let mut defaults: BTreeMap<Algorithm, BTreeMap<String, String>> = BTreeMap::new();

    for (name, table) in raw {
        let algorithm: Algorithm =
            name.parse()
                .map_err(|value| RegistryError::UnknownAlgorithm {
                    profile_id: profile_id.to_string(),
                    value,
                })?;
        let values: BTreeMap<String, String> = table
            .into_iter()
            .map(|(k, v)| (k, v.into_string()))
            .collect();
        for key in values.keys() {
            if !algorithm.parameter_specs().iter().any(|s| s.name == key) {
                tracing::warn!(
                    profile_id,
                    algorithm = algorithm.id(),
                    parameter = %key,
                    "Default for undeclared parameter will be ignored"
                );
            }
        }
        defaults.insert(algorithm, values);
    }

    for &algorithm in Algorithm::all() {
        for spec in algorithm.parameter_specs() {
            let value = defaults
                .get(&algorithm)
                .and_then(|d| d.get(spec.name))
                .ok_or_else(|| RegistryError::MissingDefault {
                    kind: kind.label().to_string(),
                    algorithm: algorithm.label().to_string(),
                    parameter: spec.name.to_string(),
                })?;
            if params::convert(value, spec.ty).is_none() {
                return Err(RegistryError::InvalidDefault {
                    kind: kind.label().to_string(),
                    algorithm: algorithm.label().to_string(),
                    parameter: spec.name.to_string(),
                    value: value.clone(),
                    expected: spec.ty.name(),
                });
            }
        }
    }

    Ok(defaults)
}

/// Names inside `{...}` of a datetime compose pattern.
pub fn compose_references(compose: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = compose;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                names.push(&after[..close]);
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    names
}

// =============================================================================
// Registry
// =============================================================================

/// Immutable kind -> profile table, complete for every `SourceKind`.
#[derive(Debug, Clone)]
pub struct Registry {
    profiles: BTreeMap<SourceKind, SourceProfile>,
}

impl Registry {
    /// Build a registry, requiring exactly one profile per kind.
    pub fn new(profiles: Vec<SourceProfile>) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for profile in profiles {
            let kind = profile.kind;
            let name = profile.name.clone();
            if let Some(previous) = map.insert(kind, profile) {
                return Err(RegistryError::DuplicateKind {
                    kind: kind.label().to_string(),
                    first: previous.name,
                    second: name,
                });
            }
        }
        for kind in SourceKind::all() {
            if !map.contains_key(kind) {
                return Err(RegistryError::MissingKind {
                    kind: kind.label().to_string(),
                });
            }
        }
        Ok(Self { profiles: map })
    }

    /// Profile for `kind`.
    pub fn get(&self, kind: SourceKind) -> Option<&SourceProfile> {
        self.profiles.get(&kind)
    }

    /// Replace the profile for its kind, returning the one it displaced.
    pub fn replace(&mut self, profile: SourceProfile) -> Option<SourceProfile> {
        self.profiles.insert(profile.kind, profile)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &SourceProfile> {
        self.profiles.values()
    }
}

// =============================================================================
// Built-in profiles (embedded at compile time)
// =============================================================================

/// Embedded TOML content for built-in profiles.
/// Each tuple is (filename, TOML content).
pub fn builtin_profile_sources() -> Vec<(&'static str, &'static str)> {
    vec![
        ("windows.toml", include_str!("../../profiles/windows.toml")),
        ("linux.toml", include_str!("../../profiles/linux.toml")),
        ("mac.toml", include_str!("../../profiles/mac.toml")),
        ("suricata.toml", include_str!("../../profiles/suricata.toml")),
    ]
}

/// Load and validate all built-in profiles into a complete registry.
///
/// Any failure here is a packaging defect and is returned to the caller,
/// which aborts start-up.
pub fn load_builtin_registry() -> Result<Registry, RegistryError> {
    let mut profiles = Vec::new();
    let mut paths: BTreeMap<SourceKind, PathBuf> = BTreeMap::new();

    for (filename, content) in builtin_profile_sources() {
        let path = PathBuf::from(format!("<builtin>/{filename}"));
        let profile = parse_profile_toml(content, &path)
            .and_then(|def| validate_and_compile(def, &path, true))
            .map_err(|e| {
                tracing::error!(file = filename, error = %e, "Failed to load built-in profile");
                e
            })?;
        if let Some(previous) = paths.insert(profile.kind, path.clone()) {
            return Err(RegistryError::DuplicateKind {
                kind: profile.kind.label().to_string(),
                first: previous.display().to_string(),
                second: path.display().to_string(),
            });
        }
        tracing::debug!(kind = profile.kind.id(), "Loaded built-in profile");
        profiles.push(profile);
    }

    Registry::new(profiles)
}

// =============================================================================
// Tests
// =============================================================================
