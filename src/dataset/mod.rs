// Project checkout - where test-based verifiers get a buildable copy of the code
//
// A checkout materialises one bug (source + tests) on disk; `run_test` writes a
// candidate patch over the source file and runs the project's test command.

mod mock;

pub use mock::{MockDataset, DEMO_PROJECT};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One known defect and the test that exposes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugInfo {
    pub project: String,
    pub id: String,
    pub description: String,
    /// Source file, relative to the checkout root
    pub file_path: String,
    /// Buggy source
    pub code: String,
    pub test_file: String,
    pub test_code: String,
}

/// Result of one test-suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRun {
    pub passed: bool,
    pub stdout: String,
    pub stderr: String,
}

impl TestRun {
    /// A run that never got as far as producing test output
    pub fn not_run(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            stdout: String::new(),
            stderr: reason.into(),
        }
    }

    /// Report handed back to the producer: stdout, newline, stderr
    pub fn report(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Access to a corpus of buggy projects
#[async_trait]
pub trait ProjectCheckout: Send + Sync {
    async fn get_bug_info(&self, project: &str, bug_id: &str) -> Result<BugInfo>;

    /// Write the buggy version to disk and return the checkout root
    async fn checkout(&self, project: &str, bug_id: &str) -> Result<PathBuf>;

    /// Run the bug's tests, first writing `patch` over the source when given.
    ///
    /// Test failures, spawn failures and timeouts are all `Ok` with
    /// `passed = false`; only an unknown bug is an error.
    async fn run_test(&self, project: &str, bug_id: &str, patch: Option<&str>) -> Result<TestRun>;
}
