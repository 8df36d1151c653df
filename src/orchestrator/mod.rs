// Refinement orchestrator - the PRODUCE → REVIEW → VERIFY state machine
//
// One orchestrator value drives one run at a time. Stages are awaited strictly
// in sequence; every stage returns a delta that is merged into a fresh state
// value and (optionally) streamed to a subscriber as a `StageEvent`.

pub mod ceiling;
pub mod events;
pub mod outcome;

pub use ceiling::{CeilingPolicy, Route, Stage};
pub use events::{StageEvent, StateLayout};
pub use outcome::{IterationRecord, OrchestratorError, RunOutcome, TerminalStatus};

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::candidate::{ArtifactCandidate, StateDelta};
use crate::ports::{ProposalRequest, Producer, Reviewer, TaskContext, Verifier};

/// Generic three-stage refinement loop, parameterized by its stage adapters
pub struct RefinementOrchestrator<X> {
    producer: Arc<dyn Producer<X>>,
    reviewer: Arc<dyn Reviewer>,
    verifier: Arc<dyn Verifier>,
    policy: CeilingPolicy,
    layout: StateLayout,
}

impl<X> RefinementOrchestrator<X>
where
    X: Clone + Default + Serialize + Send + Sync + 'static,
{
    pub fn new(
        producer: Arc<dyn Producer<X>>,
        reviewer: Arc<dyn Reviewer>,
        verifier: Arc<dyn Verifier>,
        policy: CeilingPolicy,
        layout: StateLayout,
    ) -> Self {
        if !policy.is_consistent() {
            tracing::warn!(
                "Verify ceiling {} is below critic ceiling {}",
                policy.verify,
                policy.critic
            );
        }
        Self {
            producer,
            reviewer,
            verifier,
            policy,
            layout,
        }
    }

    pub fn policy(&self) -> CeilingPolicy {
        self.policy
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    /// Run to completion without a subscriber
    pub async fn run(&self, task: TaskContext) -> Result<RunOutcome<X>, OrchestratorError> {
        self.drive(task, None).await
    }

    /// Run to completion, sending one event per completed stage.
    ///
    /// Dropping the receiving end cancels the run once the in-flight stage returns.
    pub async fn run_streaming(
        &self,
        task: TaskContext,
        events: mpsc::Sender<StageEvent>,
    ) -> Result<RunOutcome<X>, OrchestratorError> {
        self.drive(task, Some(&events)).await
    }

    async fn drive(
        &self,
        task: TaskContext,
        events: Option<&mpsc::Sender<StageEvent>>,
    ) -> Result<RunOutcome<X>, OrchestratorError> {
        let started_at = Utc::now();
        let mut state: ArtifactCandidate<X> = ArtifactCandidate::new(task.original.clone());
        let mut trail: Vec<IterationRecord> = Vec::new();
        let mut forced_approval = false;
        let mut forced_pass = false;
        let mut stage = Stage::Produce;

        while stage != Stage::End {
            stage = match stage {
                Stage::Produce => {
                    let iteration = state.iteration + 1;
                    let name = self.layout.producer_stage;
                    tracing::info!("--- {} (iteration {}) ---", name, iteration);

                    let feedback = state.feedback.render(self.layout.verification_label);
                    let proposal = self
                        .producer
                        .propose(ProposalRequest {
                            task: &task,
                            artifact: state.working_artifact(),
                            feedback: &feedback,
                        })
                        .await
                        .map_err(|source| OrchestratorError::Stage {
                            stage: name,
                            iteration,
                            source,
                        })?;

                    let candidate = state.working_artifact().replaced_with(proposal.candidate);
                    trail.push(IterationRecord::new(iteration, proposal.rationale.clone()));
                    let delta =
                        StateDelta::produced(candidate, proposal.rationale, proposal.aux, iteration);
                    state = self.apply(&state, delta, name, events).await?;
                    Stage::Review
                }
                Stage::Review => {
                    let name = self.layout.reviewer_stage;
                    tracing::info!("--- {} ---", name);

                    let review = self
                        .reviewer
                        .critique(&task, state.working_artifact())
                        .await
                        .map_err(|source| OrchestratorError::Stage {
                            stage: name,
                            iteration: state.iteration,
                            source,
                        })?;
                    tracing::info!(
                        "Decision: {}",
                        if review.approved { "Approved" } else { "Rejected" }
                    );

                    if let Some(record) = trail.last_mut() {
                        record.critique = Some(review.feedback.clone());
                        record.approved = Some(review.approved);
                    }
                    let delta = StateDelta::reviewed(review.approved, review.feedback);
                    state = self.apply(&state, delta, name, events).await?;

                    let route = self.policy.after_review(state.iteration, state.status);
                    forced_approval = route.forced;
                    if route.forced {
                        tracing::warn!(
                            "Critic ceiling {} exceeded at iteration {}; forcing approval",
                            self.policy.critic,
                            state.iteration
                        );
                    }
                    route.next
                }
                Stage::Verify => {
                    let name = self.layout.verifier_stage;
                    tracing::info!("--- {} ---", name);

                    let verification = self
                        .verifier
                        .check(&task, state.working_artifact())
                        .await
                        .map_err(|source| OrchestratorError::Stage {
                            stage: name,
                            iteration: state.iteration,
                            source,
                        })?;
                    tracing::info!("Verification passed: {}", verification.passed);

                    if let Some(record) = trail.last_mut() {
                        record.verification = Some(verification.report.clone());
                        record.passed = Some(verification.passed);
                    }
                    let delta = StateDelta::verified(verification.passed, verification.report);
                    state = self.apply(&state, delta, name, events).await?;

                    let route = self.policy.after_verify(state.iteration, state.status);
                    forced_pass = route.forced;
                    if route.forced {
                        tracing::warn!(
                            "Verify ceiling {} exceeded at iteration {}; ending with best candidate",
                            self.policy.verify,
                            state.iteration
                        );
                    }
                    route.next
                }
                Stage::End => Stage::End,
            };
        }

        let terminal = TerminalStatus::resolve(state.status, forced_approval);
        tracing::info!(
            "Run finished after {} iteration(s): {}",
            state.iteration,
            terminal
        );

        Ok(RunOutcome {
            state,
            terminal,
            forced_approval,
            forced_pass,
            trail,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Merge a stage delta into a fresh state and notify the subscriber.
    async fn apply(
        &self,
        state: &ArtifactCandidate<X>,
        delta: StateDelta<X>,
        stage: &'static str,
        events: Option<&mpsc::Sender<StageEvent>>,
    ) -> Result<ArtifactCandidate<X>, OrchestratorError> {
        let next = state.merge(&delta);
        if let Some(tx) = events {
            let event = StageEvent {
                stage,
                iteration: next.iteration,
                delta: self.layout.render(&delta),
            };
            if tx.send(event).await.is_err() {
                tracing::info!("Event subscriber disconnected; stopping run after {}", stage);
                return Err(OrchestratorError::Cancelled {
                    stage,
                    iteration: next.iteration,
                });
            }
        }
        Ok(next)
    }
}
