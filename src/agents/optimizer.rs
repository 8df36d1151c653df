// Optimizer agent - proposes faster code that keeps the exact same output

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use super::{feedback_or_none, ModelClient};
use crate::ports::{Proposal, ProposalRequest, Producer};

/// Sampling temperature; a little variety helps escape rejected attempts.
pub const OPTIMIZER_TEMPERATURE: f32 = 0.2;

const UNKNOWN: &str = "?";

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Null or blank estimates read as "?"
fn unknown_if_blank<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(unknown))
}

/// Big-O estimates before and after optimization; "?" when not given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityReport {
    #[serde(default = "unknown", deserialize_with = "unknown_if_blank")]
    pub original_time_complexity: String,
    #[serde(default = "unknown", deserialize_with = "unknown_if_blank")]
    pub original_space_complexity: String,
    #[serde(default = "unknown", deserialize_with = "unknown_if_blank")]
    pub optimized_time_complexity: String,
    #[serde(default = "unknown", deserialize_with = "unknown_if_blank")]
    pub optimized_space_complexity: String,
}

impl Default for ComplexityReport {
    fn default() -> Self {
        Self {
            original_time_complexity: unknown(),
            original_space_complexity: unknown(),
            optimized_time_complexity: unknown(),
            optimized_space_complexity: unknown(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OptimizerReply {
    #[serde(default, deserialize_with = "super::null_as_default")]
    thought: String,
    code: String,
    #[serde(flatten)]
    complexity: ComplexityReport,
}

pub struct OptimizerAgent {
    client: ModelClient,
}

impl OptimizerAgent {
    /// Wrap `client`, raising its temperature to the optimizer's setting
    pub fn new(client: ModelClient) -> Self {
        Self {
            client: client.with_temperature(OPTIMIZER_TEMPERATURE),
        }
    }

    fn system_prompt(language: &str) -> String {
        format!(
            "You are an expert software optimization engineer. Your task is to optimize {language} code. \
You must explain your reasoning first, then provide the code.\n\
CRITICAL INSTRUCTION 1: The output code MUST be in {language}. Do NOT translate it to another language.\n\
CRITICAL INSTRUCTION 2: You must PRESERVE the exact output of the program. \
Do NOT change any print statements, logging messages, or the format of the output. \
The optimized code must produce the EXACT SAME stdout as the original code, otherwise the benchmark will fail.\n\
CRITICAL INSTRUCTION 3: If the requested language is NOT Python, do NOT attempt to make it runnable in Python. \
Just provide the optimized code in the requested language.\n\
Additionally, estimate the time and space complexity of both the original and optimized code, in Big O notation.\n\
Respond with a single JSON object with exactly these keys: \"thought\", \"code\", \
\"original_time_complexity\", \"original_space_complexity\", \
\"optimized_time_complexity\", \"optimized_space_complexity\"."
        )
    }
}

#[async_trait]
impl Producer<ComplexityReport> for OptimizerAgent {
    async fn propose(&self, request: ProposalRequest<'_>) -> Result<Proposal<ComplexityReport>> {
        let language = request.artifact.language.as_str();
        tracing::debug!("Optimizer running for language: {}", language);
        let user = format!(
            "Original Code:\n{}\n\nFeedback (if any): {}\n\n\
Optimize it and estimate the time and space complexity for both the original and optimized code:",
            request.artifact.content,
            feedback_or_none(request.feedback),
        );
        let reply: OptimizerReply = self
            .client
            .ask_json(&Self::system_prompt(language), user)
            .await?;
        tracing::info!(
            "Optimizer thought: {} ({} -> {})",
            reply.thought,
            reply.complexity.original_time_complexity,
            reply.complexity.optimized_time_complexity
        );
        Ok(Proposal {
            candidate: reply.code,
            rationale: reply.thought,
            aux: reply.complexity,
        })
    }
}
