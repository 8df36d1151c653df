// Reviewer agents - code review for fixes and for optimizations

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use super::ModelClient;
use crate::candidate::Artifact;
use crate::ports::{Review, Reviewer, TaskContext};

const REVIEW_FORMAT: &str = "Respond with a single JSON object with exactly these keys:\n\
  \"approved\": true or false,\n\
  \"feedback\": detailed feedback on logic, style, or potential bugs.";

const CRITIC_PROMPT: &str = "You are a senior code reviewer. You are critical and strict. \
Review the proposed fix for the bug. Check for logical errors, hallucinations (variables that don't exist), and style issues. \
If the code looks correct and fixes the bug, approve it. Otherwise, reject it with feedback.";

#[derive(Debug, Deserialize)]
struct ReviewReply {
    approved: bool,
    #[serde(default, deserialize_with = "super::null_as_default")]
    feedback: String,
}

impl From<ReviewReply> for Review {
    fn from(reply: ReviewReply) -> Self {
        Review {
            approved: reply.approved,
            feedback: reply.feedback,
        }
    }
}

fn log_review(review: &Review) {
    tracing::info!(
        "Decision: {}",
        if review.approved { "Approved" } else { "Rejected" }
    );
    tracing::debug!("Feedback: {}", review.feedback);
}

/// Strict reviewer for bug fixes and security patches
pub struct CriticAgent {
    client: ModelClient,
}

impl CriticAgent {
    pub fn new(client: ModelClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Reviewer for CriticAgent {
    async fn critique(&self, task: &TaskContext, candidate: &Artifact) -> Result<Review> {
        let system = format!("{}\n{}", CRITIC_PROMPT, REVIEW_FORMAT);
        let user = format!(
            "Bug Description: {}\n\nOriginal Code:\n{}\n\nProposed Fix:\n{}\n\nReview:",
            task.description, task.original.content, candidate.content
        );
        let review: Review = self.client.ask_json::<ReviewReply>(&system, user).await?.into();
        log_review(&review);
        Ok(review)
    }
}

/// Reviewer that rejects any optimization changing observable behavior
pub struct OptimizationCriticAgent {
    client: ModelClient,
}

impl OptimizationCriticAgent {
    pub fn new(client: ModelClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Reviewer for OptimizationCriticAgent {
    async fn critique(&self, task: &TaskContext, candidate: &Artifact) -> Result<Review> {
        let system = format!(
            "You are a senior code reviewer specializing in optimization. \
Review the proposed optimized code against the original code. \
The code is written in {language}.\n\
CRITICAL: The optimized code MUST produce exactly the same output/behavior as the original code for all inputs. \
If logic is changed, REJECT it immediately. \
If it's not actually more optimal, REJECT it. \
If valid and efficient, approve it.\n{format}",
            language = candidate.language,
            format = REVIEW_FORMAT,
        );
        let user = format!(
            "Original Code:\n{}\n\nProposed Optimized Code:\n{}\n\nReview:",
            task.original.content, candidate.content
        );
        let review: Review = self.client.ask_json::<ReviewReply>(&system, user).await?.into();
        log_review(&review);
        Ok(review)
    }
}
