// Agents - the LLM-backed and tool-backed stage adapters
//
// LLM agents share `ModelClient`: one system prompt, one user prompt, one JSON
// object back. Tool agents wrap the dataset checkout and the execution
// comparator.

mod benchmarker;
mod critic;
mod developer;
mod optimizer;
mod security;
mod tester;

pub use benchmarker::BenchmarkerAgent;
pub use critic::{CriticAgent, OptimizationCriticAgent};
pub use developer::DeveloperAgent;
pub use optimizer::{ComplexityReport, OptimizerAgent};
pub use security::{SecurityAgent, SecurityFindings, Vulnerability};
pub use tester::TesterAgent;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::providers::{LlmProvider, Message, ProviderRequest};

/// A provider plus the request settings one agent uses
#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ModelClient {
    /// Deterministic (temperature 0) client per provider configuration
    pub fn new(provider: Arc<dyn LlmProvider>, config: &ProviderConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Send one exchange and decode the reply as `T`
    pub async fn ask_json<T: DeserializeOwned>(&self, system: &str, user: String) -> Result<T> {
        let request = ProviderRequest::new(vec![Message::user(user)])
            .with_model(self.model.clone())
            .with_max_tokens(self.max_tokens)
            .with_system(system)
            .with_temperature(self.temperature)
            .with_json_output();

        let response = self
            .provider
            .send_message(&request)
            .await
            .with_context(|| format!("{} request failed", self.provider.name()))?;

        parse_json_response(&response.text)
    }
}

/// Decode a model reply that should hold a single JSON object.
///
/// Markdown fences are stripped; failing a direct parse, the outermost
/// `{...}` span is tried.
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T> {
    let stripped = strip_markdown_fences(text);

    let direct = match serde_json::from_str::<T>(stripped) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let (Some(start), Some(end)) = (stripped.find('{'), stripped.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<T>(&stripped[start..=end]) {
                return Ok(value);
            }
        }
    }

    tracing::debug!("Unparseable model output: {}", text);
    Err(direct).context("Model reply was not the expected JSON object")
}

/// Strip leading/trailing markdown code fences (```json ... ``` or ``` ... ```)
fn strip_markdown_fences(s: &str) -> &str {
    let s = s.trim();
    let s = if let Some(rest) = s.strip_prefix("```json") {
        rest
    } else if let Some(rest) = s.strip_prefix("```") {
        rest
    } else {
        s
    };
    if let Some(rest) = s.strip_suffix("```") {
        rest.trim()
    } else {
        s.trim()
    }
}

/// Read a JSON `null` as the field's default; models emit it for "nothing to say"
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Feedback line as shown in prompts; the first iteration has none
fn feedback_or_none(feedback: &str) -> &str {
    if feedback.trim().is_empty() {
        "None"
    } else {
        feedback
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::providers::ProviderResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider replaying canned replies and recording every request
    #[derive(Default)]
    pub struct ScriptedProvider {
        replies: Mutex<VecDeque<String>>,
        pub requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedProvider {
        pub fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn last_request(&self) -> ProviderRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let text = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .context("script exhausted")?;
            Ok(ProviderResponse {
                model: request.model.clone(),
                text,
                stop_reason: Some("STOP".into()),
                provider: "scripted".into(),
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted-model"
        }
    }

    pub fn client(provider: Arc<ScriptedProvider>) -> ModelClient {
        ModelClient::new(provider, &ProviderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        approved: bool,
    }

    #[test]
    fn test_parse_plain_json() {
        let reply: Reply = parse_json_response(r#"{"approved": true}"#).unwrap();
        assert!(reply.approved);
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply: Reply = parse_json_response("```json\n{\"approved\": false}\n```").unwrap();
        assert!(!reply.approved);
    }

    #[test]
    fn test_parse_json_with_surrounding_prose() {
        let reply: Reply =
            parse_json_response("Here is my review:\n{\"approved\": true}\nThanks").unwrap();
        assert!(reply.approved);
    }

    #[test]
    fn test_parse_garbage_is_an_error() {
        assert!(parse_json_response::<Reply>("I refuse").is_err());
        assert!(parse_json_response::<Reply>("{\"other\": 1}").is_err());
    }

    #[test]
    fn test_null_optional_field_reads_as_default() {
        #[derive(Debug, Deserialize)]
        struct Noted {
            #[serde(default, deserialize_with = "null_as_default")]
            note: String,
        }
        let reply: Noted = parse_json_response(r#"{"note": null}"#).unwrap();
        assert_eq!(reply.note, "");
        let reply: Noted = parse_json_response("{}").unwrap();
        assert_eq!(reply.note, "");
    }

    #[test]
    fn test_feedback_placeholder() {
        assert_eq!(feedback_or_none("  "), "None");
        assert_eq!(feedback_or_none("Critique: no\n"), "Critique: no\n");
    }

    #[tokio::test]
    async fn test_ask_json_sends_json_request() {
        let provider = testing::ScriptedProvider::new(&[r#"{"approved": true}"#]);
        let client = testing::client(provider.clone()).with_temperature(0.2);
        let reply: Reply = client.ask_json("system", "user".into()).await.unwrap();
        assert!(reply.approved);

        let request = provider.last_request();
        assert!(request.json_output);
        assert_eq!(request.system.as_deref(), Some("system"));
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.model, "gemini-2.5-flash");
    }
}
