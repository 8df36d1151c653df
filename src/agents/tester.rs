// Tester agent - runs the project's test suite against a candidate patch

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::candidate::Artifact;
use crate::dataset::ProjectCheckout;
use crate::ports::{TaskContext, Verification, Verifier};

pub struct TesterAgent {
    dataset: Arc<dyn ProjectCheckout>,
}

impl TesterAgent {
    pub fn new(dataset: Arc<dyn ProjectCheckout>) -> Self {
        Self { dataset }
    }
}

#[async_trait]
impl Verifier for TesterAgent {
    async fn check(&self, task: &TaskContext, candidate: &Artifact) -> Result<Verification> {
        let checkout = task
            .checkout
            .as_ref()
            .context("Task has no project checkout to test against")?;

        let run = self
            .dataset
            .run_test(&checkout.project, &checkout.bug_id, Some(&candidate.content))
            .await?;
        tracing::info!("Test passed: {}", run.passed);

        Ok(Verification {
            passed: run.passed,
            report: run.report(),
        })
    }
}
