// End-to-end refinement scenarios driven through the public orchestrator API
// with scripted stage adapters.

use agentic_studio::candidate::{Artifact, LanguageTag, RunStatus};
use agentic_studio::orchestrator::{
    CeilingPolicy, OrchestratorError, RefinementOrchestrator, StageEvent, TerminalStatus,
};
use agentic_studio::pipelines::REPAIR_LAYOUT;
use agentic_studio::ports::{
    Proposal, ProposalRequest, Producer, Review, Reviewer, TaskContext, Verification, Verifier,
};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Scripted adapters
// ---------------------------------------------------------------------------

/// Proposes "v1", "v2", ...
#[derive(Default)]
struct Sequence {
    calls: AtomicU32,
}

#[async_trait]
impl Producer<()> for Sequence {
    async fn propose(&self, _request: ProposalRequest<'_>) -> Result<Proposal<()>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Proposal {
            candidate: format!("v{}", n),
            rationale: format!("attempt {}", n),
            aux: (),
        })
    }
}

struct FailingProducer;

#[async_trait]
impl Producer<()> for FailingProducer {
    async fn propose(&self, _request: ProposalRequest<'_>) -> Result<Proposal<()>> {
        anyhow::bail!("model unavailable")
    }
}

/// Rejects every candidate up to and including `reject_through`
struct RejectThrough {
    reject_through: u32,
    calls: AtomicU32,
}

impl RejectThrough {
    fn new(reject_through: u32) -> Self {
        Self {
            reject_through,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Reviewer for RejectThrough {
    async fn critique(&self, _task: &TaskContext, _candidate: &Artifact) -> Result<Review> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let approved = n > self.reject_through;
        Ok(Review {
            approved,
            feedback: if approved { "looks right".into() } else { format!("reject #{}", n) },
        })
    }
}

/// Fixed verdict; counts and records what it verified
struct FixedVerdict {
    passed: bool,
    calls: AtomicU32,
    seen: std::sync::Mutex<Vec<String>>,
}

impl FixedVerdict {
    fn new(passed: bool) -> Self {
        Self {
            passed,
            calls: AtomicU32::new(0),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Verifier for FixedVerdict {
    async fn check(&self, _task: &TaskContext, candidate: &Artifact) -> Result<Verification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(candidate.content.clone());
        Ok(Verification {
            passed: self.passed,
            report: if self.passed { "1 passed".into() } else { "1 failed".into() },
        })
    }
}

fn task() -> TaskContext {
    TaskContext::new("demo bug", Artifact::new("v0", LanguageTag::default()))
}

// ---------------------------------------------------------------------------
// Ceiling scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_critic_ceiling_forces_approval_at_iteration_six() {
    let reviewer = Arc::new(RejectThrough::new(6));
    let verifier = Arc::new(FixedVerdict::new(true));
    let orch = RefinementOrchestrator::<()>::new(
        Arc::new(Sequence::default()),
        reviewer.clone(),
        verifier.clone(),
        CeilingPolicy::new(5, 10),
        REPAIR_LAYOUT,
    );

    let outcome = orch.run(task()).await.unwrap();

    assert_eq!(outcome.iterations(), 6);
    assert_eq!(reviewer.calls.load(Ordering::SeqCst), 6);
    // Verification only ran for the forced approval
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*verifier.seen.lock().unwrap(), vec!["v6".to_string()]);
    assert!(outcome.forced_approval);
    assert!(!outcome.forced_pass);
    assert_eq!(outcome.terminal, TerminalStatus::Passed);
    assert_eq!(outcome.trail[5].approved, Some(false));
    assert_eq!(outcome.trail[5].passed, Some(true));
}

#[tokio::test]
async fn test_verify_ceiling_ends_run_at_iteration_nine() {
    let verifier = Arc::new(FixedVerdict::new(false));
    let orch = RefinementOrchestrator::<()>::new(
        Arc::new(Sequence::default()),
        Arc::new(RejectThrough::new(0)),
        verifier.clone(),
        CeilingPolicy::new(5, 8),
        REPAIR_LAYOUT,
    );

    let outcome = orch.run(task()).await.unwrap();

    assert_eq!(outcome.iterations(), 9);
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 9);
    assert!(outcome.forced_pass);
    assert!(!outcome.forced_approval);
    assert_eq!(outcome.state.status, RunStatus::Failed);
    assert_eq!(outcome.terminal, TerminalStatus::ApprovedButUnverified);
    assert_eq!(outcome.final_artifact().unwrap().content, "v9");
    assert_eq!(outcome.trail.len(), 9);
}

#[tokio::test]
async fn test_iteration_counter_never_decreases() {
    let orch = RefinementOrchestrator::<()>::new(
        Arc::new(Sequence::default()),
        Arc::new(RejectThrough::new(2)),
        Arc::new(FixedVerdict::new(false)),
        CeilingPolicy::new(5, 4),
        REPAIR_LAYOUT,
    );
    let (tx, mut rx) = mpsc::channel(64);
    let collector = tokio::spawn(async move {
        let mut events: Vec<StageEvent> = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    });

    let outcome = orch.run_streaming(task(), tx).await.unwrap();
    let events = collector.await.unwrap();

    let iterations: Vec<u32> = events.iter().map(|e| e.iteration).collect();
    assert!(iterations.windows(2).all(|w| w[0] <= w[1]));
    let produced = events.iter().filter(|e| e.stage == "developer").count() as u32;
    assert_eq!(produced, outcome.iterations());
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_stream_uses_pipeline_field_names() {
    let orch = RefinementOrchestrator::<()>::new(
        Arc::new(Sequence::default()),
        Arc::new(RejectThrough::new(0)),
        Arc::new(FixedVerdict::new(true)),
        CeilingPolicy::new(5, 10),
        REPAIR_LAYOUT,
    );
    let (tx, mut rx) = mpsc::channel(16);
    let outcome = orch.run_streaming(task(), tx).await.unwrap();
    assert_eq!(outcome.terminal, TerminalStatus::Passed);

    let mut lines = Vec::new();
    while let Some(event) = rx.recv().await {
        lines.push(event.to_value());
    }
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["developer"]["current_patch"], "v1");
    assert_eq!(lines[0]["developer"]["developer_thought"], "attempt 1");
    assert_eq!(lines[0]["developer"]["iterations"], 1);
    assert_eq!(lines[1]["critic"]["status"], "approved");
    assert_eq!(lines[1]["critic"]["critique_feedback"], "looks right");
    assert_eq!(lines[2]["tester"]["status"], "passed");
    assert_eq!(lines[2]["tester"]["test_feedback"], "1 passed");
}

#[tokio::test]
async fn test_dropped_subscriber_cancels_run() {
    let verifier = Arc::new(FixedVerdict::new(true));
    let orch = RefinementOrchestrator::<()>::new(
        Arc::new(Sequence::default()),
        Arc::new(RejectThrough::new(0)),
        verifier.clone(),
        CeilingPolicy::new(5, 10),
        REPAIR_LAYOUT,
    );
    let (tx, rx) = mpsc::channel(16);
    drop(rx);

    let err = orch.run_streaming(task(), tx).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stage_failure_is_terminal() {
    let orch = RefinementOrchestrator::<()>::new(
        Arc::new(FailingProducer),
        Arc::new(RejectThrough::new(0)),
        Arc::new(FixedVerdict::new(true)),
        CeilingPolicy::new(5, 10),
        REPAIR_LAYOUT,
    );

    match orch.run(task()).await {
        Err(OrchestratorError::Stage {
            stage, iteration, ..
        }) => {
            assert_eq!(stage, "developer");
            assert_eq!(iteration, 1);
        }
        other => panic!("expected stage failure, got {:?}", other.map(|o| o.terminal)),
    }
}
