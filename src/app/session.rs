// LogScope - app/session.rs
//
// Holds the tables from the most recent parse run. Each run takes a ticket
// stamped with the session's generation; when a run completes, its ticket is
// checked against the current generation and stale completions are dropped,
// so the last run started is the one whose results are kept.

use crate::app::adapter::RunReport;
use crate::core::model::{Algorithm, ParserParameter, SourceKind};
use crate::core::table::{StructuredTable, TemplateSummary};
use crate::util::error::{ConfigError, MinerError};

/// Proof that a run was started; hand it back to `Session::complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct RunTicket {
    generation: u64,
}

impl RunTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Tables from a successful run.
#[derive(Debug, Clone)]
pub struct SessionResults {
    pub kind: SourceKind,
    pub algorithm: Algorithm,
    pub parameters: Vec<ParserParameter>,
    pub structured: StructuredTable,
    pub templates: TemplateSummary,
}

/// What happened when a run was handed back.
#[derive(Debug)]
pub enum Completion {
    /// Results replaced the previous ones.
    Committed,
    /// The algorithm failed; previous results were cleared.
    AlgorithmFailed(MinerError),
    /// The run was rejected before the algorithm ran; previous results kept.
    Rejected(ConfigError),
    /// A newer run was started (or the session cleared) meanwhile; ignored.
    Stale,
}

/// Explicit holder of the current results. Created empty; each committed
/// run replaces the results wholesale.
#[derive(Debug, Default)]
pub struct Session {
    generation: u64,
    results: Option<SessionResults>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run. Any run started earlier becomes stale.
    pub fn begin_run(&mut self) -> RunTicket {
        self.generation += 1;
        tracing::debug!(generation = self.generation, "Run started");
        RunTicket {
            generation: self.generation,
        }
    }

    /// Hand back the result of the run `ticket` was issued for.
    pub fn complete(
        &mut self,
        ticket: RunTicket,
        result: Result<RunReport, ConfigError>,
    ) -> Completion {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale run result"
            );
            return Completion::Stale;
        }

        match result {
            Err(e) => {
                tracing::info!(error = %e, "Run rejected; keeping previous results");
                Completion::Rejected(e)
            }
            Ok(RunReport {
                failure: Some(failure),
                ..
            }) => {
                self.results = None;
                Completion::AlgorithmFailed(failure)
            }
            Ok(report) => {
                tracing::debug!(
                    generation = self.generation,
                    rows = report.structured.len(),
                    "Run committed"
                );
                self.results = Some(SessionResults {
                    kind: report.kind,
                    algorithm: report.algorithm,
                    parameters: report.parameters,
                    structured: report.structured,
                    templates: report.templates,
                });
                Completion::Committed
            }
        }
    }

    pub fn results(&self) -> Option<&SessionResults> {
        self.results.as_ref()
    }

    /// Drop the results and invalidate any run in flight.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.results = None;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn report(rows: usize, failure: Option<MinerError>) -> RunReport {
        let structured = StructuredTable::new(
            vec!["EventTemplate".to_string()],
            (0..rows).map(|i| vec![format!("t{i}")]).collect(),
        );
        RunReport {
            kind: SourceKind::Linux,
            algorithm: Algorithm::Drain,
            parameters: Vec::new(),
            structured,
            templates: TemplateSummary::default(),
            failure,
        }
    }

    fn failed() -> MinerError {
        MinerError::Failed {
            algorithm: "Drain".into(),
            reason: "boom".into(),
        }
    }

    #[test]
    fn test_commit_replaces_results() {
        let mut session = Session::new();
        assert!(session.results().is_none());

        let t = session.begin_run();
        assert!(matches!(session.complete(t, Ok(report(2, None))), Completion::Committed));
        let t = session.begin_run();
        assert!(matches!(session.complete(t, Ok(report(5, None))), Completion::Committed));
        assert_eq!(session.results().unwrap().structured.len(), 5);
    }

    #[test]
    fn test_last_run_wins() {
        let mut session = Session::new();
        let first = session.begin_run();
        let second = session.begin_run();

        assert!(matches!(session.complete(second, Ok(report(2, None))), Completion::Committed));
        assert!(matches!(session.complete(first, Ok(report(9, None))), Completion::Stale));
        assert_eq!(session.results().unwrap().structured.len(), 2);
    }

    #[test]
    fn test_algorithm_failure_clears_results() {
        let mut session = Session::new();
        let t = session.begin_run();
        let _ = session.complete(t, Ok(report(3, None)));

        let t = session.begin_run();
        let outcome = session.complete(t, Ok(report(0, Some(failed()))));
        assert!(matches!(outcome, Completion::AlgorithmFailed(_)));
        assert!(session.results().is_none());
    }

    #[test]
    fn test_config_error_keeps_results() {
        let mut session = Session::new();
        let t = session.begin_run();
        let _ = session.complete(t, Ok(report(3, None)));

        let t = session.begin_run();
        let err = ConfigError::UnknownAlgorithm { value: "x".into() };
        assert!(matches!(session.complete(t, Err(err)), Completion::Rejected(_)));
        assert_eq!(session.results().unwrap().structured.len(), 3);
    }

    #[test]
    fn test_clear_invalidates_in_flight_run() {
        let mut session = Session::new();
        let t = session.begin_run();
        session.clear();
        assert!(matches!(session.complete(t, Ok(report(1, None))), Completion::Stale));
        assert!(session.results().is_none());
    }
}
