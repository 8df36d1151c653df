// Security agent - audits SQL and proposes a hardened query

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{feedback_or_none, ModelClient};
use crate::ports::{Proposal, ProposalRequest, Producer};

const SYSTEM_PROMPT: &str = "You are an expert Database Security Engineer. Your task is to analyze SQL queries for vulnerabilities and performance issues. \
Strictly focus on SQL code. If the code provided is not SQL (e.g. Python, Java), respond by stating that you only analyze SQL. \
Identify issues like SQL Injection risks, inefficient joins, missing indexes, or dangerous commands (DROP/TRUNCATE). \
Provide a list of vulnerabilities/issues found, explain your hardening strategy, and provide the fully secured and optimized SQL query.\n\
Respond with a single JSON object with exactly these keys:\n\
\"vulnerabilities\": a list of objects with \"severity\" (High, Medium, or Low), \"type\" (e.g. SQL Injection) and \"description\",\n\
\"thought\": reasoning for the security patches,\n\
\"code\": the secured code content.";

/// One finding reported by the auditor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub severity: String,
    #[serde(rename = "type", default, deserialize_with = "super::null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub description: String,
}

/// Auxiliary payload of the security pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityFindings {
    pub vulnerabilities: Vec<Vulnerability>,
}

#[derive(Debug, Deserialize)]
struct SecurityReply {
    #[serde(default, deserialize_with = "super::null_as_default")]
    vulnerabilities: Vec<Vulnerability>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    thought: String,
    code: String,
}

pub struct SecurityAgent {
    client: ModelClient,
}

impl SecurityAgent {
    pub fn new(client: ModelClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Producer<SecurityFindings> for SecurityAgent {
    async fn propose(&self, request: ProposalRequest<'_>) -> Result<Proposal<SecurityFindings>> {
        let user = format!(
            "SQL Query to Audit:\n{}\n\nFeedback (from checks): {}\n\nSecure this SQL:",
            request.artifact.content,
            feedback_or_none(request.feedback),
        );
        let reply: SecurityReply = self.client.ask_json(SYSTEM_PROMPT, user).await?;
        tracing::info!(
            "Security thought: {} ({} vulnerabilities found)",
            reply.thought,
            reply.vulnerabilities.len()
        );
        Ok(Proposal {
            candidate: reply.code,
            rationale: reply.thought,
            aux: SecurityFindings {
                vulnerabilities: reply.vulnerabilities,
            },
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
    async fn test_findings_keep_wire_names() {
        let provider = ScriptedProvider::new(&[r#"{
            "vulnerabilities": [{"severity": "High", "type": "SQL Injection", "description": "string concat"}],
            "thought": "parameterize",
            "code": "SELECT * FROM users WHERE id = ?"
        }"#]);
        let agent = SecurityAgent::new(client(provider));
        let original = Artifact::new("SELECT * FROM users WHERE id = ' + id", LanguageTag::new("sql"));
        let task = TaskContext::new("SQL Security Audit", original.clone());

        let proposal = agent
            .propose(ProposalRequest {
                task: &task,
                artifact: &original,
                feedback: "",
            })
            .await
            .unwrap();
        assert_eq!(proposal.aux.vulnerabilities.len(), 1);
        assert_eq!(proposal.aux.vulnerabilities[0].kind, "SQL Injection");

        let json = serde_json::to_value(&proposal.aux).unwrap();
        assert_eq!(json["vulnerabilities"][0]["type"], "SQL Injection");
        assert_eq!(json["vulnerabilities"][0]["severity"], "High");
    }

    #[tokio::test]
    async fn test_no_findings_defaults_to_empty() {
        let provider = ScriptedProvider::new(&[r#"{"thought": "fine", "code": "SELECT 1"}"#]);
        let agent = SecurityAgent::new(client(provider));
        let original = Artifact::new("SELECT 1", LanguageTag::new("sql"));
        let task = TaskContext::new("audit", original.clone());
        let proposal = agent
            .propose(ProposalRequest {
                task: &task,
                artifact: &original,
                feedback: "",
            })
            .await
            .unwrap();
        assert!(proposal.aux.vulnerabilities.is_empty());
    }

    #[tokio::test]
    async fn test_null_fields_read_as_empty() {
        let provider = ScriptedProvider::new(&[r#"{
            "vulnerabilities": [{"severity": "Low", "type": null, "description": null}],
            "thought": null,
            "code": "SELECT 1"
        }"#, r#"{"vulnerabilities": null, "code": "SELECT 2"}"#]);
        let agent = SecurityAgent::new(client(provider));
        let original = Artifact::new("SELECT 1", LanguageTag::new("sql"));
        let task = TaskContext::new("audit", original.clone());

        let first = agent
            .propose(ProposalRequest {
                task: &task,
                artifact: &original,
                feedback: "",
            })
            .await
            .unwrap();
        assert_eq!(first.rationale, "");
        assert_eq!(first.aux.vulnerabilities[0].severity, "Low");
        assert_eq!(first.aux.vulnerabilities[0].kind, "");

        let second = agent
            .propose(ProposalRequest {
                task: &task,
                artifact: &original,
                feedback: "",
            })
            .await
            .unwrap();
        assert_eq!(second.candidate, "SELECT 2");
        assert!(second.aux.vulnerabilities.is_empty());
    }
}
