// LogScope - app/registry_mgr.rs
//
// Builds the process-wide registry from the built-in profiles (embedded in
// the binary) and user-defined TOML files on disk. A user profile replaces
// the built-in profile for its kind wholesale.

use crate::core::model::SourceProfile;
use crate::core::registry::{self, Registry};
use crate::util::constants;
use crate::util::error::RegistryError;
use std::path::Path;

/// Load the registry: built-ins first, then user overrides.
///
/// A broken built-in profile is fatal. Invalid user profiles are skipped
/// (the built-in stays in force) and returned alongside the registry.
pub fn load_registry(
    user_profile_dir: Option<&Path>,
) -> Result<(Registry, Vec<RegistryError>), RegistryError> {
    let mut registry = registry::load_builtin_registry()?;
    let mut errors = Vec::new();

    tracing::info!(
        builtin_count = registry.profiles().count(),
        "Loaded built-in profiles"
    );

    if let Some(dir) = user_profile_dir {
        if dir.is_dir() {
            let (user_profiles, user_errors) = load_user_profiles(dir);
            errors.extend(user_errors);

            for user_profile in user_profiles {
                tracing::info!(
                    kind = user_profile.kind.id(),
                    name = %user_profile.name,
                    "User profile overrides built-in"
                );
                registry.replace(user_profile);
            }
        } else {
            tracing::debug!(
                dir = %dir.display(),
                "User profile directory does not exist (skipping)"
            );
        }
    }

    for e in &errors {
        tracing::warn!(error = %e, "Skipped user profile");
    }

    Ok((registry, errors))
}

/// Load user-defined profiles from a directory, in file-name order so that
/// of two files for the same kind the later one wins deterministically.
fn load_user_profiles(dir: &Path) -> (Vec<SourceProfile>, Vec<RegistryError>) {
    let mut profiles = Vec::new();
    let mut errors = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            errors.push(RegistryError::Io {
                path: dir.to_path_buf(),
                source: e,
            });
            return (profiles, errors);
        }
    };

    let mut paths = Vec::new();
    for entry_result in entries {
        match entry_result {
            Ok(entry) => paths.push(entry.path()),
            Err(e) => errors.push(RegistryError::Io {
                path: dir.to_path_buf(),
                source: e,
            }),
        }
    }
    paths.sort();

    for path in paths {
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }

        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                errors.push(RegistryError::Io {
                    path: path.clone(),
                    source: e,
                });
                continue;
            }
        };

        if metadata.len() > constants::MAX_PROFILE_FILE_SIZE {
            errors.push(RegistryError::FileTooLarge {
                path: path.clone(),
                size: metadata.len(),
                max_size: constants::MAX_PROFILE_FILE_SIZE,
            });
            continue;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                errors.push(RegistryError::Io {
                    path: path.clone(),
                    source: e,
                });
                continue;
            }
        };

        match registry::parse_profile_toml(&content, &path)
            .and_then(|def| registry::validate_and_compile(def, &path, false))
        {
            Ok(p) => profiles.push(p),
            Err(e) => errors.push(e),
        }
    }

    (profiles, errors)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Algorithm, SourceKind};

    fn builtin_linux_with(name: &str, mask: &str) -> String {
        let (_, linux) = registry::builtin_profile_sources()
            .into_iter()
            .find(|(f, _)| *f == "linux.toml")
            .unwrap();
        linux
            .replacen("name = \"Linux syslog\"", &format!("name = \"{name}\""), 1)
            .replacen("rules = [", &format!("rules = [\n    '{mask}',"), 1)
    }

    #[test]
    fn test_no_user_dir_gives_builtins() {
        let (registry, errors) = load_registry(None).unwrap();
        assert!(errors.is_empty());
        assert!(registry.profiles().all(|p| p.is_builtin));
    }

    #[test]
    fn test_user_profile_overrides_kind() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("my_linux.toml"),
            builtin_linux_with("Custom Linux", r"\bsshd\b"),
        )
        .unwrap();

        let (registry, errors) = load_registry(Some(dir.path())).unwrap();
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        let linux = registry.get(SourceKind::Linux).unwrap();
        assert_eq!(linux.name, "Custom Linux");
        assert!(!linux.is_builtin);
        assert_eq!(linux.mask_rules[0].pattern, r"\bsshd\b");
        assert!(linux.defaults_for(Algorithm::Drain).is_some());
        assert!(registry.get(SourceKind::Windows).unwrap().is_builtin);
    }

    #[test]
    fn test_invalid_user_profile_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not valid [[[ toml").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let (registry, errors) = load_registry(Some(dir.path())).unwrap();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], RegistryError::TomlParse { .. }));
        assert!(registry.get(SourceKind::Linux).unwrap().is_builtin);
    }

    #[test]
    fn test_oversized_user_profile_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let big = "#".repeat(constants::MAX_PROFILE_FILE_SIZE as usize + 1);
        std::fs::write(dir.path().join("big.toml"), big).unwrap();

        let (_, errors) = load_registry(Some(dir.path())).unwrap();
        assert!(matches!(errors[0], RegistryError::FileTooLarge { .. }));
    }
}
