// Benchmarker agent - verifies an optimization by running both versions

use anyhow::Result;
use async_trait::async_trait;

use crate::benchmark::ExecutionComparator;
use crate::candidate::Artifact;
use crate::ports::{TaskContext, Verification, Verifier};

pub struct BenchmarkerAgent {
    comparator: ExecutionComparator,
}

impl BenchmarkerAgent {
    pub fn new(comparator: ExecutionComparator) -> Self {
        Self { comparator }
    }
}

#[async_trait]
impl Verifier for BenchmarkerAgent {
    async fn check(&self, task: &TaskContext, candidate: &Artifact) -> Result<Verification> {
        let result = self
            .comparator
            .compare(
                &task.original.content,
                &candidate.content,
                task.input.as_deref(),
                &candidate.language,
            )
            .await;

        Ok(Verification {
            passed: result.passed,
            report: result.feedback(),
        })
    }
}
