// Agentic Code Studio - producer/reviewer/verifier refinement loops
// Library exports

pub mod agents;
pub mod benchmark;
pub mod candidate;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod logging;
pub mod orchestrator;
pub mod pipelines;
pub mod ports;
pub mod providers;
pub mod server;

pub use candidate::{Artifact, ArtifactCandidate, LanguageTag, RunStatus, StateDelta};
pub use orchestrator::{
    CeilingPolicy, OrchestratorError, RefinementOrchestrator, RunOutcome, StageEvent,
    TerminalStatus,
};
pub use ports::{Producer, Reviewer, TaskContext, Verifier};
