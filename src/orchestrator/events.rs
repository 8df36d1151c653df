// Stage events and the per-pipeline state layout used to render them

use serde::Serialize;
use serde_json::{Map, Value};

use crate::candidate::StateDelta;

/// Field and stage names a pipeline exposes to event subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateLayout {
    pub producer_stage: &'static str,
    pub reviewer_stage: &'static str,
    pub verifier_stage: &'static str,
    pub candidate_field: &'static str,
    pub rationale_field: &'static str,
    pub critique_field: &'static str,
    pub verification_field: &'static str,
    /// Label the verifier report gets when fed back to the Producer
    pub verification_label: &'static str,
}

impl StateLayout {
    /// Render a stage delta as the JSON object streamed to subscribers.
    ///
    /// Auxiliary payloads that serialize to an object are flattened into the
    /// delta; anything else lands under `aux`.
    pub fn render<X: Serialize>(&self, delta: &StateDelta<X>) -> Value {
        let mut out = Map::new();
        if let Some(current) = &delta.current {
            out.insert(self.candidate_field.into(), Value::String(current.content.clone()));
        }
        if let Some(rationale) = &delta.rationale {
            out.insert(self.rationale_field.into(), Value::String(rationale.clone()));
        }
        if let Some(iteration) = delta.iteration {
            out.insert("iterations".into(), Value::from(iteration));
        }
        if let Some(aux) = &delta.aux {
            match serde_json::to_value(aux) {
                Ok(Value::Object(fields)) => out.extend(fields),
                Ok(Value::Null) => {}
                Ok(other) => {
                    out.insert("aux".into(), other);
                }
                Err(e) => tracing::warn!("Failed to serialize auxiliary payload: {}", e),
            }
        }
        if let Some(critique) = &delta.critique {
            out.insert(self.critique_field.into(), Value::String(critique.clone()));
        }
        if let Some(report) = &delta.verification {
            out.insert(self.verification_field.into(), Value::String(report.clone()));
        }
        if let Some(status) = delta.status {
            out.insert("status".into(), Value::String(status.as_str().into()));
        }
        Value::Object(out)
    }
}

/// One completed stage, as seen by a subscriber
#[derive(Debug, Clone, PartialEq)]
pub struct StageEvent {
    pub stage: &'static str,
    /// Iteration counter after the stage ran
    pub iteration: u32,
    pub delta: Value,
}

impl StageEvent {
    /// `{"<stage>": <delta>}`
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.stage.to_string(), self.delta.clone());
        Value::Object(map)
    }

    /// One NDJSON line, newline included
    pub fn to_json_line(&self) -> String {
        format!("{}\n", self.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{Artifact, LanguageTag};
    use serde_json::json;

    const LAYOUT: StateLayout = StateLayout {
        producer_stage: "developer",
        reviewer_stage: "critic",
        verifier_stage: "tester",
        candidate_field: "current_patch",
        rationale_field: "developer_thought",
        critique_field: "critique_feedback",
        verification_field: "test_feedback",
        verification_label: "Test Output",
    };

    #[derive(Serialize, Clone)]
    struct Findings {
        count: u32,
    }

    #[test]
    fn test_render_produced_delta_flattens_aux() {
        let artifact = Artifact::new("def add(a, b): return a + b", LanguageTag::default());
        let delta = StateDelta::produced(artifact, "fixed sign".into(), Findings { count: 2 }, 1);
        assert_eq!(
            LAYOUT.render(&delta),
            json!({
                "current_patch": "def add(a, b): return a + b",
                "developer_thought": "fixed sign",
                "iterations": 1,
                "count": 2
            })
        );
    }

    #[test]
    fn test_render_unit_aux_adds_nothing() {
        let artifact = Artifact::new("x", LanguageTag::default());
        let delta = StateDelta::produced(artifact, String::new(), (), 3);
        let value = LAYOUT.render(&delta);
        assert!(value.get("aux").is_none());
        assert_eq!(value["iterations"], 3);
    }

    #[test]
    fn test_render_review_delta() {
        let delta: StateDelta<()> = StateDelta::reviewed(false, "missing edge case".into());
        assert_eq!(
            LAYOUT.render(&delta),
            json!({"critique_feedback": "missing edge case", "status": "rejected"})
        );
    }

    #[test]
    fn test_event_json_line_shape() {
        let event = StageEvent {
            stage: "tester",
            iteration: 2,
            delta: json!({"status": "passed"}),
        };
        assert_eq!(event.to_json_line(), "{\"tester\":{\"status\":\"passed\"}}\n");
    }
}
