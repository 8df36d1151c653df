// Pipelines - the three concrete refinement loops
//
// Each pipeline is the generic orchestrator wired with its own stage adapters,
// ceilings and event field names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::agents::{
    BenchmarkerAgent, ComplexityReport, CriticAgent, DeveloperAgent, ModelClient,
    OptimizationCriticAgent, OptimizerAgent, SecurityAgent, SecurityFindings, TesterAgent,
};
use crate::benchmark::ExecutionComparator;
use crate::candidate::{Artifact, LanguageTag};
use crate::dataset::{BugInfo, ProjectCheckout};
use crate::orchestrator::{CeilingPolicy, RefinementOrchestrator, StateLayout};
use crate::ports::TaskContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// Fix a bug until the project's tests pass
    Repair,
    /// Harden a SQL query
    Security,
    /// Speed code up without changing its output
    Optimization,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 3] = [
        PipelineKind::Repair,
        PipelineKind::Security,
        PipelineKind::Optimization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Repair => "repair",
            PipelineKind::Security => "security",
            PipelineKind::Optimization => "optimization",
        }
    }

    pub fn default_ceilings(&self) -> CeilingPolicy {
        match self {
            PipelineKind::Repair => CeilingPolicy::new(5, 10),
            PipelineKind::Security => CeilingPolicy::new(5, 5),
            PipelineKind::Optimization => CeilingPolicy::new(5, 8),
        }
    }

    pub fn layout(&self) -> StateLayout {
        match self {
            PipelineKind::Repair => REPAIR_LAYOUT,
            PipelineKind::Security => SECURITY_LAYOUT,
            PipelineKind::Optimization => OPTIMIZATION_LAYOUT,
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const REPAIR_LAYOUT: StateLayout = StateLayout {
    producer_stage: "developer",
    reviewer_stage: "critic",
    verifier_stage: "tester",
    candidate_field: "current_patch",
    rationale_field: "developer_thought",
    critique_field: "critique_feedback",
    verification_field: "test_feedback",
    verification_label: "Test Output",
};

pub const SECURITY_LAYOUT: StateLayout = StateLayout {
    producer_stage: "security_engineer",
    reviewer_stage: "critic",
    verifier_stage: "tester",
    candidate_field: "current_patch",
    rationale_field: "security_thought",
    critique_field: "critique_feedback",
    verification_field: "test_feedback",
    verification_label: "Test Output",
};

pub const OPTIMIZATION_LAYOUT: StateLayout = StateLayout {
    producer_stage: "optimizer",
    reviewer_stage: "critic",
    verifier_stage: "benchmarker",
    candidate_field: "current_optimized_code",
    rationale_field: "optimizer_thought",
    critique_field: "critique_feedback",
    verification_field: "benchmark_feedback",
    verification_label: "Benchmark Output",
};

/// Developer → critic → tester
pub fn repair_pipeline(
    client: ModelClient,
    dataset: Arc<dyn ProjectCheckout>,
    policy: CeilingPolicy,
) -> RefinementOrchestrator<()> {
    RefinementOrchestrator::new(
        Arc::new(DeveloperAgent::new(client.clone())),
        Arc::new(CriticAgent::new(client)),
        Arc::new(TesterAgent::new(dataset)),
        policy,
        REPAIR_LAYOUT,
    )
}

/// Security engineer → critic → tester
pub fn security_pipeline(
    client: ModelClient,
    dataset: Arc<dyn ProjectCheckout>,
    policy: CeilingPolicy,
) -> RefinementOrchestrator<SecurityFindings> {
    RefinementOrchestrator::new(
        Arc::new(SecurityAgent::new(client.clone())),
        Arc::new(CriticAgent::new(client)),
        Arc::new(TesterAgent::new(dataset)),
        policy,
        SECURITY_LAYOUT,
    )
}

/// Optimizer → optimization critic → benchmarker
pub fn optimization_pipeline(
    client: ModelClient,
    comparator: ExecutionComparator,
    policy: CeilingPolicy,
) -> RefinementOrchestrator<ComplexityReport> {
    RefinementOrchestrator::new(
        Arc::new(OptimizerAgent::new(client.clone())),
        Arc::new(OptimizationCriticAgent::new(client)),
        Arc::new(BenchmarkerAgent::new(comparator)),
        policy,
        OPTIMIZATION_LAYOUT,
    )
}

/// Task for fixing a checked-out bug
pub fn repair_task(bug: &BugInfo) -> TaskContext {
    TaskContext::new(
        bug.description.clone(),
        Artifact::new(bug.code.clone(), LanguageTag::default()),
    )
    .with_file_path(bug.file_path.clone())
    .with_checkout(bug.project.clone(), bug.id.clone())
}

/// Task for auditing a SQL query registered as `bug`
pub fn security_task(bug: &BugInfo) -> TaskContext {
    TaskContext::new(
        bug.description.clone(),
        Artifact::new(bug.code.clone(), LanguageTag::new("sql")),
    )
    .with_file_path(bug.file_path.clone())
    .with_checkout(bug.project.clone(), bug.id.clone())
}

/// Task for optimizing standalone code fed `input` on stdin
pub fn optimization_task(code: impl Into<String>, input: impl Into<String>, language: &str) -> TaskContext {
    TaskContext::new(
        "Optimize the code without changing its output",
        Artifact::new(code, LanguageTag::new(language)),
    )
    .with_input(input)
}
