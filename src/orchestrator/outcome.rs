// Run results and run errors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::candidate::{Artifact, ArtifactCandidate, RunStatus};

/// How a run ended, as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminalStatus {
    /// The last verification passed
    Passed,
    /// The verify ceiling ended the run; the reviewer had genuinely approved
    ApprovedButUnverified,
    /// The verify ceiling ended the run and approval was forced too
    Failed,
}

impl TerminalStatus {
    /// Derive the terminal status from the final state and the last router decisions
    pub fn resolve(status: RunStatus, forced_approval: bool) -> Self {
        if status == RunStatus::Passed {
            TerminalStatus::Passed
        } else if forced_approval {
            TerminalStatus::Failed
        } else {
            TerminalStatus::ApprovedButUnverified
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalStatus::Passed => "passed",
            TerminalStatus::ApprovedButUnverified => "approved-but-unverified",
            TerminalStatus::Failed => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TerminalStatus::Passed)
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened in one PRODUCE → REVIEW (→ VERIFY) pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub rationale: String,
    pub critique: Option<String>,
    pub approved: Option<bool>,
    pub verification: Option<String>,
    pub passed: Option<bool>,
}

impl IterationRecord {
    pub(crate) fn new(iteration: u32, rationale: String) -> Self {
        Self {
            iteration,
            rationale,
            critique: None,
            approved: None,
            verification: None,
            passed: None,
        }
    }
}

/// Result of a run that reached END
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome<X> {
    pub state: ArtifactCandidate<X>,
    pub terminal: TerminalStatus,
    /// The critic ceiling overrode a rejection before the last verification
    pub forced_approval: bool,
    /// The verify ceiling overrode a failed verification
    pub forced_pass: bool,
    pub trail: Vec<IterationRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl<X> RunOutcome<X> {
    /// Last candidate proposed during the run
    pub fn final_artifact(&self) -> Option<&Artifact> {
        self.state.current.as_ref()
    }

    pub fn iterations(&self) -> u32 {
        self.state.iteration
    }
}

/// Terminal run errors
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// A Producer, Reviewer or Verifier call failed; never retried
    #[error("{stage} stage failed at iteration {iteration}: {source:#}")]
    Stage {
        stage: &'static str,
        iteration: u32,
        #[source]
        source: anyhow::Error,
    },
    /// The event subscriber went away; the run stopped after the in-flight stage
    #[error("run cancelled after {stage} stage at iteration {iteration}: event subscriber disconnected")]
    Cancelled { stage: &'static str, iteration: u32 },
}

impl OrchestratorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrchestratorError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_status_resolution() {
        assert_eq!(TerminalStatus::resolve(RunStatus::Passed, true), TerminalStatus::Passed);
        assert_eq!(
            TerminalStatus::resolve(RunStatus::Failed, false),
            TerminalStatus::ApprovedButUnverified
        );
        assert_eq!(TerminalStatus::resolve(RunStatus::Failed, true), TerminalStatus::Failed);
    }

    #[test]
    fn test_terminal_status_serializes_kebab_case() {
        let json = serde_json::to_string(&TerminalStatus::ApprovedButUnverified).unwrap();
        assert_eq!(json, "\"approved-but-unverified\"");
        assert_eq!(TerminalStatus::ApprovedButUnverified.to_string(), "approved-but-unverified");
    }

    #[test]
    fn test_stage_error_message_includes_cause() {
        let err = OrchestratorError::Stage {
            stage: "developer",
            iteration: 2,
            source: anyhow::anyhow!("model unavailable"),
        };
        assert_eq!(
            err.to_string(),
            "developer stage failed at iteration 2: model unavailable"
        );
        assert!(!err.is_cancelled());
    }
}
