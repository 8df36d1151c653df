// Developer agent - proposes bug fixes

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use super::{feedback_or_none, ModelClient};
use crate::ports::{Proposal, ProposalRequest, Producer};

const SYSTEM_PROMPT: &str = "You are an expert software developer. Your task is to fix bugs in Python code. \
Analyze the bug, explain your fix, and then provide the code.\n\
Respond with a single JSON object with exactly these keys:\n\
  \"thought\": your reasoning for the fix, explaining the bug and your solution,\n\
  \"code\": the full fixed file content.";

#[derive(Debug, Deserialize)]
struct DeveloperReply {
    #[serde(default, deserialize_with = "super::null_as_default")]
    thought: String,
    code: String,
}

pub struct DeveloperAgent {
    client: ModelClient,
}

impl DeveloperAgent {
    pub fn new(client: ModelClient) -> Self {
        Self { client }
    }

    fn user_prompt(request: &ProposalRequest<'_>) -> String {
        format!(
            "Bug Description: {}\n\nFile Path: {}\n\nCurrent Code:\n{}\n\nFeedback (if any): {}\n\nFix the bug:",
            request.task.description,
            request.task.file_path.as_deref().unwrap_or("unknown"),
            request.artifact.content,
            feedback_or_none(request.feedback),
        )
    }
}

#[async_trait]
impl Producer<()> for DeveloperAgent {
    async fn propose(&self, request: ProposalRequest<'_>) -> Result<Proposal<()>> {
        let reply: DeveloperReply = self
            .client
            .ask_json(SYSTEM_PROMPT, Self::user_prompt(&request))
            .await?;
        tracing::info!("Developer thought: {}", reply.thought);
        Ok(Proposal {
            candidate: reply.code,
            rationale: reply.thought,
            aux: (),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{client, ScriptedProvider};
    use crate::candidate::{Artifact, LanguageTag};
    use crate::ports::TaskContext;

    #[tokio::test]
    async fn test_propose_parses_fix() {
        let provider = ScriptedProvider::new(&[
            r#"{"thought": "use +", "code": "def add(a, b):\n    return a + b\n"}"#,
        ]);
        let agent = DeveloperAgent::new(client(provider.clone()));
        let original = Artifact::new("def add(a, b):\n    return a - b\n", LanguageTag::default());
        let task = TaskContext::new("add subtracts", original.clone()).with_file_path("calculator.py");

        let proposal = agent
            .propose(ProposalRequest {
                task: &task,
                artifact: &original,
                feedback: "Critique: wrong operator\n",
            })
            .await
            .unwrap();
        assert_eq!(proposal.rationale, "use +");
        assert!(proposal.candidate.contains("a + b"));

        let prompt = &provider.last_request().messages[0].content;
        assert!(prompt.contains("File Path: calculator.py"));
        assert!(prompt.contains("Critique: wrong operator"));
        assert_eq!(provider.last_request().temperature, Some(0.0));
    }

    #[tokio::test]
    async fn test_null_thought_is_empty() {
        let provider = ScriptedProvider::new(&[r#"{"thought": null, "code": "y = 1"}"#]);
        let agent = DeveloperAgent::new(client(provider));
        let original = Artifact::new("x", LanguageTag::default());
        let task = TaskContext::new("d", original.clone());
        let proposal = agent
            .propose(ProposalRequest {
                task: &task,
                artifact: &original,
                feedback: "",
            })
            .await
            .unwrap();
        assert_eq!(proposal.candidate, "y = 1");
        assert_eq!(proposal.rationale, "");
    }

    #[tokio::test]
    async fn test_missing_code_is_an_error() {
        let provider = ScriptedProvider::new(&[r#"{"thought": "hmm"}"#]);
        let agent = DeveloperAgent::new(client(provider));
        let original = Artifact::new("x", LanguageTag::default());
        let task = TaskContext::new("d", original.clone());
        let result = agent
            .propose(ProposalRequest {
                task: &task,
                artifact: &original,
                feedback: "",
            })
            .await;
        assert!(result.is_err());
    }
}
