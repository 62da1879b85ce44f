// LogScope - app/miner.rs
//
// The template-mining boundary. Algorithms run behind `TemplateMiner`;
// the production implementation drives the Python `logparser` package
// through an embedded bridge script in a child process with a wall-clock
// deadline.

use crate::core::model::{Algorithm, ParserParameter, TypedValue};
use crate::util::constants;
use crate::util::error::MinerError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Bridge script embedded at compile time and written out per run.
const BRIDGE_SCRIPT: &str = include_str!("../../bridge/logparser_bridge.py");

/// Everything an algorithm needs for one run.
#[derive(Debug, Clone)]
pub struct MinerJob {
    pub algorithm: Algorithm,
    /// Field-extraction template in the mining library's `<Field>` syntax.
    pub log_format: String,
    /// Masking regexes, in application order.
    pub mask_patterns: Vec<String>,
    pub parameters: Vec<ParserParameter>,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// File name of the log inside `input_dir`.
    pub log_name: String,
}

impl MinerJob {
    /// `<output>/<name>_structured.csv`
    pub fn structured_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}{}", self.log_name, constants::STRUCTURED_SUFFIX))
    }

    /// `<output>/<name>_templates.csv`
    pub fn templates_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}{}", self.log_name, constants::TEMPLATES_SUFFIX))
    }
}

/// A template-mining algorithm.
///
/// On success the two result tables exist at `job.structured_path()` and
/// `job.templates_path()`.
pub trait TemplateMiner {
    fn mine(&self, job: &MinerJob) -> Result<(), MinerError>;
}

/// Wire form of a job as read by the bridge script.
#[derive(Debug, Serialize)]
struct BridgeJob<'a> {
    algorithm: &'static str,
    log_format: &'a str,
    regex: &'a [String],
    params: BTreeMap<&'a str, TypedValue>,
    input_dir: &'a Path,
    output_dir: &'a Path,
    log_name: &'a str,
}

impl<'a> BridgeJob<'a> {
    fn from_job(job: &'a MinerJob) -> Self {
        Self {
            algorithm: job.algorithm.id(),
            log_format: &job.log_format,
            regex: &job.mask_patterns,
            params: job
                .parameters
                .iter()
                .map(|p| (p.name.as_str(), p.value))
                .collect(),
            input_dir: &job.input_dir,
            output_dir: &job.output_dir,
            log_name: &job.log_name,
        }
    }
}

/// Runs the `logparser` package under a Python interpreter.
#[derive(Debug, Clone)]
pub struct LogparserMiner {
    pub python: String,
    pub timeout: Duration,
}

impl Default for LogparserMiner {
    fn default() -> Self {
        Self {
            python: constants::DEFAULT_PYTHON.to_string(),
            timeout: Duration::from_secs(constants::DEFAULT_MINER_TIMEOUT_SECS),
        }
    }
}

impl LogparserMiner {
    pub fn new(python: impl Into<String>, timeout: Duration) -> Self {
        Self {
            python: python.into(),
            timeout,
        }
    }
}

fn io_err(path: &Path, operation: &'static str) -> impl FnOnce(std::io::Error) -> MinerError {
    let path = path.to_path_buf();
    move |source| MinerError::Io {
        path,
        operation,
        source,
    }
}

impl TemplateMiner for LogparserMiner {
    fn mine(&self, job: &MinerJob) -> Result<(), MinerError> {
        // Script, job file and captured stderr live in their own scratch
        // directory, removed on every return path.
        let scratch = tempfile::TempDir::new()
            .map_err(io_err(Path::new("<tempdir>"), "create scratch directory"))?;

        let script_path = scratch.path().join(constants::BRIDGE_SCRIPT_NAME);
        std::fs::write(&script_path, BRIDGE_SCRIPT)
            .map_err(io_err(&script_path, "write bridge script"))?;

        let job_path = scratch.path().join(constants::MINER_JOB_FILE_NAME);
        let job_json = serde_json::to_vec_pretty(&BridgeJob::from_job(job))
            .map_err(|source| MinerError::Job { source })?;
        std::fs::write(&job_path, job_json).map_err(io_err(&job_path, "write job file"))?;

        // stderr goes to a file, not a pipe: a chatty child cannot block on
        // a full pipe while we poll.
        let stderr_path = scratch.path().join("stderr.txt");
        let stderr_file =
            File::create(&stderr_path).map_err(io_err(&stderr_path, "create stderr file"))?;

        tracing::info!(
            algorithm = job.algorithm.id(),
            python = %self.python,
            log = %job.log_name,
            timeout_secs = self.timeout.as_secs(),
            "Starting template miner"
        );

        let started = Instant::now();
        let mut child = Command::new(&self.python)
            .arg(&script_path)
            .arg(&job_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_file))
            .spawn()
            .map_err(|source| MinerError::Spawn {
                program: self.python.clone(),
                source,
            })?;

        let poll = Duration::from_millis(constants::MINER_POLL_INTERVAL_MS);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(MinerError::Io {
                        path: job_path,
                        operation: "wait for miner",
                        source: e,
                    });
                }
            }
            if started.elapsed() >= self.timeout {
                tracing::warn!(
                    algorithm = job.algorithm.id(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Template miner timed out; killing"
                );
                if let Err(e) = child.kill() {
                    tracing::warn!(error = %e, "Failed to kill miner process");
                }
                let _ = child.wait();
                return Err(MinerError::Timeout {
                    algorithm: job.algorithm.label().to_string(),
                    limit: self.timeout,
                });
            }
            std::thread::sleep(poll);
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if !status.success() {
            let stderr = read_stderr_tail(&stderr_path);
            tracing::warn!(
                algorithm = job.algorithm.id(),
                code = ?status.code(),
                elapsed_ms,
                "Template miner failed"
            );
            return Err(MinerError::Exited {
                algorithm: job.algorithm.label().to_string(),
                code: status.code(),
                stderr,
            });
        }

        tracing::info!(algorithm = job.algorithm.id(), elapsed_ms, "Template miner finished");
        Ok(())
    }
}

/// Last `MAX_MINER_STDERR_BYTES` of the captured stderr, trimmed.
fn read_stderr_tail(path: &Path) -> String {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            tracing::debug!(error = %e, "Could not read miner stderr");
            return String::new();
        }
    };
    let start = bytes.len().saturating_sub(constants::MAX_MINER_STDERR_BYTES);
    String::from_utf8_lossy(&bytes[start..]).trim().to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ScalarType;

    fn job() -> MinerJob {
        MinerJob {
            algorithm: Algorithm::Drain,
            log_format: "<Date> <Content>".to_string(),
            mask_patterns: vec![r"\d+".to_string()],
            parameters: vec![
                ParserParameter {
                    name: "depth".into(),
                    ty: ScalarType::Int,
                    raw: "4".into(),
                    value: TypedValue::Int(4),
                },
                ParserParameter {
                    name: "threshold".into(),
                    ty: ScalarType::Float,
                    raw: "0.5".into(),
                    value: TypedValue::Float(0.5),
                },
            ],
            input_dir: PathBuf::from("/in"),
            output_dir: PathBuf::from("/out"),
            log_name: "sample.log".to_string(),
        }
    }

    #[test]
    fn test_output_paths() {
        let j = job();
        assert_eq!(j.structured_path(), PathBuf::from("/out/sample.log_structured.csv"));
        assert_eq!(j.templates_path(), PathBuf::from("/out/sample.log_templates.csv"));
    }

    #[test]
    fn test_bridge_job_wire_format() {
        let j = job();
        let value = serde_json::to_value(BridgeJob::from_job(&j)).unwrap();
        assert_eq!(value["algorithm"], "drain");
        assert_eq!(value["params"]["depth"], 4);
        assert_eq!(value["params"]["threshold"], 0.5);
        assert_eq!(value["regex"][0], r"\d+");
        assert_eq!(value["log_name"], "sample.log");
    }

    #[test]
    fn test_missing_interpreter_is_spawn_error() {
        let miner = LogparserMiner::new("/nonexistent/python-for-logscope", Duration::from_secs(5));
        let err = miner.mine(&job()).unwrap_err();
        assert!(matches!(err, MinerError::Spawn { .. }), "got: {err}");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_reports_status() {
        // `false` ignores its arguments and exits 1.
        let miner = LogparserMiner::new("false", Duration::from_secs(5));
        match miner.mine(&job()) {
            Err(MinerError::Exited { code, .. }) => assert_eq!(code, Some(1)),
            other => panic!("Expected Exited, got: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_miner_killed_on_timeout() {
        use std::os::unix::fs::PermissionsExt;

        // Stand-in interpreter that never finishes on its own.
        let dir = tempfile::tempdir().unwrap();
        let python = dir.path().join("slow-python");
        std::fs::write(&python, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&python, std::fs::Permissions::from_mode(0o755)).unwrap();

        let limit = Duration::from_millis(300);
        let miner = LogparserMiner::new(python.to_string_lossy(), limit);
        let started = Instant::now();
        let err = miner.mine(&job()).unwrap_err();

        match &err {
            MinerError::Timeout { algorithm, limit: reported } => {
                assert_eq!(algorithm, "Drain");
                assert_eq!(*reported, limit);
            }
            other => panic!("Expected Timeout, got: {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(err.to_string().contains("300ms"), "got: {err}");
    }

    #[test]
    fn test_stderr_tail_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stderr.txt");
        let long = "x".repeat(constants::MAX_MINER_STDERR_BYTES * 2);
        std::fs::write(&path, format!("{long}\nTraceback: boom\n")).unwrap();
        let tail = read_stderr_tail(&path);
        assert!(tail.len() <= constants::MAX_MINER_STDERR_BYTES);
        assert!(tail.ends_with("Traceback: boom"));
    }
}
