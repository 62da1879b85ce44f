// LogScope - app/adapter.rs
//
// One parsing run: resolve the kind's profile and the algorithm's typed
// parameters, stage the upload in transient storage, invoke the miner and
// read back its two result tables.
//
// Configuration problems abort the run before the miner is touched and are
// returned as `ConfigError`. Anything that goes wrong once the miner is
// involved is folded into `RunReport::failure` with empty tables.

use crate::app::miner::{MinerJob, TemplateMiner};
use crate::core::model::{Algorithm, ParserParameter, SourceKind};
use crate::core::params;
use crate::core::registry::Registry;
use crate::core::table::{StructuredTable, TemplateSummary};
use crate::util::constants;
use crate::util::error::{ConfigError, MinerError};
use std::collections::BTreeMap;
use std::path::Path;

/// A user-supplied log file.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Original file name; only its final component is used.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// File name safe to place inside the transient input directory.
    pub fn file_name(&self) -> String {
        Path::new(&self.name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(constants::DEFAULT_UPLOAD_NAME)
            .to_string()
    }
}

/// Outcome of a run that got as far as invoking the miner.
#[derive(Debug)]
pub struct RunReport {
    pub kind: SourceKind,
    pub algorithm: Algorithm,
    pub parameters: Vec<ParserParameter>,
    pub structured: StructuredTable,
    pub templates: TemplateSummary,
    /// Set when the algorithm failed; both tables are then empty.
    pub failure: Option<MinerError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Drives runs against a registry and a miner.
pub struct ParserAdapter<'a> {
    registry: &'a Registry,
    miner: &'a dyn TemplateMiner,
}

impl<'a> ParserAdapter<'a> {
    pub fn new(registry: &'a Registry, miner: &'a dyn TemplateMiner) -> Self {
        Self { registry, miner }
    }

    /// Parse `upload` as `kind` logs with `algorithm`.
    ///
    /// `overrides` maps parameter names to raw strings; names the algorithm
    /// does not declare are ignored and missing ones take the kind's default.
    pub fn run(
        &self,
        upload: &Upload,
        algorithm: Algorithm,
        kind: SourceKind,
        overrides: &BTreeMap<String, String>,
    ) -> Result<RunReport, ConfigError> {
        let profile = self
            .registry
            .get(kind)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                kind: kind.label().to_string(),
            })?;

        let size = upload.bytes.len() as u64;
        if size > constants::MAX_UPLOAD_BYTES {
            return Err(ConfigError::UploadTooLarge {
                size,
                max_size: constants::MAX_UPLOAD_BYTES,
            });
        }

        let parameters = params::resolve(algorithm, profile.defaults_for(algorithm), overrides)?;

        tracing::info!(
            kind = kind.id(),
            algorithm = algorithm.id(),
            upload = %upload.name,
            bytes = size,
            mask_rules = profile.mask_rules.len(),
            "Starting parse run"
        );

        let mut report = RunReport {
            kind,
            algorithm,
            parameters,
            structured: StructuredTable::default(),
            templates: TemplateSummary::default(),
            failure: None,
        };

        let job_patterns: Vec<String> = profile
            .mask_rules
            .iter()
            .map(|r| r.pattern.clone())
            .collect();

        match self.mine(upload, algorithm, &profile.log_format, job_patterns, &report.parameters) {
            Ok((structured, templates)) => {
                tracing::info!(
                    kind = kind.id(),
                    algorithm = algorithm.id(),
                    rows = structured.len(),
                    templates = templates.len(),
                    "Parse run complete"
                );
                report.structured = structured;
                report.templates = templates;
            }
            Err(e) => {
                tracing::warn!(
                    kind = kind.id(),
                    algorithm = algorithm.id(),
                    error = %e,
                    "Parse run failed"
                );
                report.failure = Some(e);
            }
        }

        Ok(report)
    }

    /// Stage the upload, run the miner and read its output. Both transient
    /// directories are dropped (and removed) when this returns.
    fn mine(
        &self,
        upload: &Upload,
        algorithm: Algorithm,
        log_format: &str,
        mask_patterns: Vec<String>,
        parameters: &[ParserParameter],
    ) -> Result<(StructuredTable, TemplateSummary), MinerError> {
        let input_dir = tempfile::TempDir::new().map_err(|source| MinerError::Io {
            path: std::env::temp_dir(),
            operation: "create input directory",
            source,
        })?;
        let output_dir = tempfile::TempDir::new().map_err(|source| MinerError::Io {
            path: std::env::temp_dir(),
            operation: "create output directory",
            source,
        })?;

        let log_name = upload.file_name();
        let input_path = input_dir.path().join(&log_name);
        let text = String::from_utf8_lossy(&upload.bytes);
        std::fs::write(&input_path, text.as_bytes()).map_err(|source| MinerError::Io {
            path: input_path.clone(),
            operation: "write upload",
            source,
        })?;

        let job = MinerJob {
            algorithm,
            log_format: log_format.to_string(),
            mask_patterns,
            parameters: parameters.to_vec(),
            input_dir: input_dir.path().to_path_buf(),
            output_dir: output_dir.path().to_path_buf(),
            log_name,
        };

        self.miner.mine(&job)?;

        let structured_path = job.structured_path();
        let templates_path = job.templates_path();
        for path in [&structured_path, &templates_path] {
            if !path.is_file() {
                return Err(MinerError::MissingOutput { path: path.clone() });
            }
        }

        let structured = StructuredTable::read_csv(&structured_path)?;
        let templates = TemplateSummary::read_csv(&templates_path)?;
        Ok((structured, templates))
    }
}

// =============================================================================
// Tests
// =============================================================================
