// LogScope - platform/config.rs
//
// Platform-specific configuration, data directory resolution, and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for LogScope data and configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logscope/ or %APPDATA%\LogScope\)
    pub config_dir: PathBuf,

    /// Default location of config.toml.
    pub config_file: PathBuf,

    /// User profile directory (e.g. ~/.config/logscope/profiles/)
    pub user_profiles_dir: PathBuf,

    /// Data directory for log files.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let config_file = config_dir.join(constants::CONFIG_FILE_NAME);
            let user_profiles_dir = config_dir.join(constants::PROFILES_DIR_NAME);
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                profiles = %user_profiles_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                config_file,
                user_profiles_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                config_file: fallback.join(constants::CONFIG_FILE_NAME),
                user_profiles_dir: fallback.join(constants::PROFILES_DIR_NAME),
                config_dir: fallback.clone(),
                data_dir: fallback,
            }
        }
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so a newer config file still loads
/// with an older binary.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[miner]` section.
    pub miner: MinerSection,
    /// `[profiles]` section.
    pub profiles: ProfilesSection,
    /// `[dashboard]` section.
    pub dashboard: DashboardSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[miner]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct MinerSection {
    /// Python interpreter that has the `logparser` package installed.
    pub python: Option<String>,
    /// Wall-clock limit for one algorithm run.
    pub timeout_secs: Option<u64>,
}

/// `[profiles]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ProfilesSection {
    /// Profile directory used instead of the platform default.
    pub user_profile_directory: Option<String>,
}

/// `[dashboard]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DashboardSection {
    /// N for the top-N frequency table.
    pub top_n: Option<usize>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub python: String,
    pub miner_timeout_secs: u64,
    pub user_profile_directory: Option<PathBuf>,
    pub top_n: usize,
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            python: constants::DEFAULT_PYTHON.to_string(),
            miner_timeout_secs: constants::DEFAULT_MINER_TIMEOUT_SECS,
            user_profile_directory: None,
            top_n: constants::DEFAULT_TOP_N,
            log_level: None,
            log_file: None,
        }
    }
}

/// Load and validate the config file at `config_path`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// A missing file gives defaults with no warnings (first run). An unreadable
/// or unparseable file gives defaults with a warning; the application still
/// starts but the user is informed.
///
/// Runs before logging is initialised, so problems are only returned, not
/// logged.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) => {
            warnings.push(format!(
                "Could not read config file '{}': {e}. Using defaults.",
                config_path.display()
            ));
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            warnings.push(format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                config_path.display()
            ));
            return (AppConfig::default(), warnings);
        }
    };

    let config = validate(raw, &mut warnings);
    (config, warnings)
}

/// Check each raw value against the named limits, accumulating warnings.
fn validate(raw: RawConfig, warnings: &mut Vec<String>) -> AppConfig {
    let mut config = AppConfig::default();

    // -- Miner: python --
    if let Some(python) = raw.miner.python {
        if python.trim().is_empty() {
            warnings.push(format!(
                "[miner] python is empty. Using default ({}).",
                constants::DEFAULT_PYTHON
            ));
        } else {
            config.python = python;
        }
    }

    // -- Miner: timeout_secs --
    if let Some(secs) = raw.miner.timeout_secs {
        if (constants::MIN_MINER_TIMEOUT_SECS..=constants::MAX_MINER_TIMEOUT_SECS).contains(&secs)
        {
            config.miner_timeout_secs = secs;
        } else {
            warnings.push(format!(
                "[miner] timeout_secs = {secs} is out of range ({}-{}). Using default ({}).",
                constants::MIN_MINER_TIMEOUT_SECS,
                constants::MAX_MINER_TIMEOUT_SECS,
                constants::DEFAULT_MINER_TIMEOUT_SECS,
            ));
        }
    }

    // -- Profiles: user_profile_directory --
    if let Some(dir) = raw.profiles.user_profile_directory {
        if !dir.trim().is_empty() {
            config.user_profile_directory = Some(PathBuf::from(dir));
        }
    }

    // -- Dashboard: top_n --
    if let Some(n) = raw.dashboard.top_n {
        if (1..=constants::MAX_TOP_N).contains(&n) {
            config.top_n = n;
        } else {
            warnings.push(format!(
                "[dashboard] top_n = {n} is out of range (1-{}). Using default ({}).",
                constants::MAX_TOP_N,
                constants::DEFAULT_TOP_N,
            ));
        }
    }

    // -- Logging: level --
    if let Some(level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Logging: file --
    if let Some(file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(PathBuf::from(file));
        }
    }

    config
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn load_str(content: &str) -> (AppConfig, Vec<String>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(constants::CONFIG_FILE_NAME);
        std::fs::write(&path, content).unwrap();
        load_config(&path)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = load_config(&dir.path().join("absent.toml"));
        assert_eq!(config, AppConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_valid_values_applied() {
        let (config, warnings) = load_str(
            r#"
            [miner]
            python = "/opt/venv/bin/python"
            timeout_secs = 30

            [profiles]
            user_profile_directory = "/etc/logscope/profiles"

            [dashboard]
            top_n = 25

            [logging]
            level = "DEBUG"
            file = "/tmp/logscope.log"

            [future_section]
            key = 1
            "#,
        );
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(config.python, "/opt/venv/bin/python");
        assert_eq!(config.miner_timeout_secs, 30);
        assert_eq!(
            config.user_profile_directory,
            Some(PathBuf::from("/etc/logscope/profiles"))
        );
        assert_eq!(config.top_n, 25);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/logscope.log")));
    }

    #[test]
    fn test_out_of_range_values_fall_back_with_warnings() {
        let (config, warnings) = load_str(
            r#"
            [miner]
            timeout_secs = 0
            [dashboard]
            top_n = 0
            [logging]
            level = "loud"
            "#,
        );
        assert_eq!(warnings.len(), 3);
        assert_eq!(config.miner_timeout_secs, constants::DEFAULT_MINER_TIMEOUT_SECS);
        assert_eq!(config.top_n, constants::DEFAULT_TOP_N);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_unparseable_file_warns() {
        let (config, warnings) = load_str("[miner\npython = ");
        assert_eq!(config, AppConfig::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Failed to parse"));
    }
}
