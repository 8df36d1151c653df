// Capability ports - the three roles a refinement run is composed of
//
// The orchestrator only knows these shapes. Calls are awaited one at a time
// and may return a different answer every time they are re-invoked.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::candidate::Artifact;

/// Project/test checkout a test-based verifier runs against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRef {
    pub project: String,
    pub bug_id: String,
}

/// Everything a stage may need to know about the task besides the candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskContext {
    /// Natural-language description of the task (bug report, audit scope, ...)
    pub description: String,
    /// The baseline artifact
    pub original: Artifact,
    /// Source file the artifact lives in, when known
    #[serde(default)]
    pub file_path: Option<String>,
    /// Text fed to the program's stdin when it is executed
    #[serde(default)]
    pub input: Option<String>,
    /// Checkout used by test-based verifiers
    #[serde(default)]
    pub checkout: Option<CheckoutRef>,
}

impl TaskContext {
    pub fn new(description: impl Into<String>, original: Artifact) -> Self {
        Self {
            description: description.into(),
            original,
            file_path: None,
            input: None,
            checkout: None,
        }
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Empty input is treated as no input.
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        let input = input.into();
        self.input = if input.is_empty() { None } else { Some(input) };
        self
    }

    pub fn with_checkout(mut self, project: impl Into<String>, bug_id: impl Into<String>) -> Self {
        self.checkout = Some(CheckoutRef {
            project: project.into(),
            bug_id: bug_id.into(),
        });
        self
    }
}

/// Input to one Producer call
#[derive(Debug, Clone, Copy)]
pub struct ProposalRequest<'a> {
    pub task: &'a TaskContext,
    /// Latest candidate, or the baseline when nothing was proposed yet
    pub artifact: &'a Artifact,
    /// Rendered reviewer/verifier feedback; empty on the first iteration
    pub feedback: &'a str,
}

/// Producer output
#[derive(Debug, Clone)]
pub struct Proposal<X> {
    pub candidate: String,
    pub rationale: String,
    pub aux: X,
}

/// Reviewer output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub approved: bool,
    pub feedback: String,
}

/// Verifier output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub passed: bool,
    pub report: String,
}

/// Proposes a new candidate from the current one plus feedback
#[async_trait]
pub trait Producer<X>: Send + Sync {
    async fn propose(&self, request: ProposalRequest<'_>) -> Result<Proposal<X>>;
}

/// Critiques a candidate
#[async_trait]
pub trait Reviewer: Send + Sync {
    async fn critique(&self, task: &TaskContext, candidate: &Artifact) -> Result<Review>;
}

/// Objectively tests or benchmarks a candidate
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn check(&self, task: &TaskContext, candidate: &Artifact) -> Result<Verification>;
}
