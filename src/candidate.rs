// Artifact candidate - the state record threaded through a refinement run
//
// Stages never mutate the record in place: each returns a `StateDelta` and the
// orchestrator merges it into a fresh `ArtifactCandidate` value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language tag used when none is supplied by the caller.
pub const DEFAULT_LANGUAGE: &str = "python";

/// Declared language of an artifact (normalised to lowercase)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageTag(String);

impl LanguageTag {
    pub fn new(tag: impl AsRef<str>) -> Self {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            return Self::default();
        }
        Self(tag.to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageTag {
    fn default() -> Self {
        Self(DEFAULT_LANGUAGE.to_string())
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A piece of code (or query text) plus its declared language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub content: String,
    pub language: LanguageTag,
}

impl Artifact {
    pub fn new(content: impl Into<String>, language: LanguageTag) -> Self {
        Self {
            content: content.into(),
            language,
        }
    }

    /// Same language, new content. Producers replace candidates wholesale.
    pub fn replaced_with(&self, content: impl Into<String>) -> Self {
        Self::new(content, self.language.clone())
    }
}

/// Status written by the reviewer and verifier stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Start,
    Approved,
    Rejected,
    Passed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Start => "start",
            RunStatus::Approved => "approved",
            RunStatus::Rejected => "rejected",
            RunStatus::Passed => "passed",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who recorded a feedback message; also the order messages are rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSource {
    Reviewer,
    Verifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub source: FeedbackSource,
    pub message: String,
}

/// Reviewer and verifier messages handed back to the next Producer call.
///
/// Holds at most one entry per source. Recording a new message for a source
/// replaces the previous one; the critique always comes before the
/// verification report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackLog {
    entries: Vec<FeedbackEntry>,
}

impl FeedbackLog {
    pub fn record(&mut self, source: FeedbackSource, message: impl Into<String>) {
        self.entries.retain(|e| e.source != source);
        self.entries.push(FeedbackEntry {
            source,
            message: message.into(),
        });
        self.entries.sort_by_key(|e| e.source);
    }

    pub fn latest(&self, source: FeedbackSource) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.source == source)
            .map(|e| e.message.as_str())
    }

    pub fn entries(&self) -> &[FeedbackEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as Producer input, e.g. `Critique: ...\nTest Output: ...\n`.
    ///
    /// Empty messages are skipped.
    pub fn render(&self, verify_label: &str) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            if entry.message.is_empty() {
                continue;
            }
            let label = match entry.source {
                FeedbackSource::Reviewer => "Critique",
                FeedbackSource::Verifier => verify_label,
            };
            out.push_str(&format!("{}: {}\n", label, entry.message));
        }
        out
    }
}

/// The mutable unit of work of one run
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactCandidate<X> {
    pub original: Artifact,
    pub current: Option<Artifact>,
    pub rationale: String,
    pub feedback: FeedbackLog,
    pub iteration: u32,
    pub status: RunStatus,
    pub aux: X,
}

impl<X: Default> ArtifactCandidate<X> {
    pub fn new(original: Artifact) -> Self {
        Self {
            original,
            current: None,
            rationale: String::new(),
            feedback: FeedbackLog::default(),
            iteration: 0,
            status: RunStatus::Start,
            aux: X::default(),
        }
    }
}

impl<X: Clone> ArtifactCandidate<X> {
    /// Artifact handed to the Producer: the latest candidate, or the baseline
    /// before the first proposal.
    pub fn working_artifact(&self) -> &Artifact {
        self.current.as_ref().unwrap_or(&self.original)
    }

    /// Build the next state value from this one plus a stage delta.
    pub fn merge(&self, delta: &StateDelta<X>) -> Self {
        let mut next = self.clone();
        if let Some(current) = &delta.current {
            next.current = Some(current.clone());
        }
        if let Some(rationale) = &delta.rationale {
            next.rationale = rationale.clone();
        }
        if let Some(aux) = &delta.aux {
            next.aux = aux.clone();
        }
        if let Some(critique) = &delta.critique {
            next.feedback.record(FeedbackSource::Reviewer, critique.clone());
        }
        if let Some(report) = &delta.verification {
            next.feedback.record(FeedbackSource::Verifier, report.clone());
        }
        if let Some(iteration) = delta.iteration {
            next.iteration = iteration;
        }
        if let Some(status) = delta.status {
            next.status = status;
        }
        next
    }
}

/// Partial update returned by one stage
#[derive(Debug, Clone, PartialEq)]
pub struct StateDelta<X> {
    pub current: Option<Artifact>,
    pub rationale: Option<String>,
    pub aux: Option<X>,
    pub critique: Option<String>,
    pub verification: Option<String>,
    pub iteration: Option<u32>,
    pub status: Option<RunStatus>,
}

impl<X> Default for StateDelta<X> {
    fn default() -> Self {
        Self {
            current: None,
            rationale: None,
            aux: None,
            critique: None,
            verification: None,
            iteration: None,
            status: None,
        }
    }
}

impl<X> StateDelta<X> {
    pub fn produced(current: Artifact, rationale: String, aux: X, iteration: u32) -> Self {
        Self {
            current: Some(current),
            rationale: Some(rationale),
            aux: Some(aux),
            iteration: Some(iteration),
            ..Self::default()
        }
    }

    pub fn reviewed(approved: bool, critique: String) -> Self {
        Self {
            critique: Some(critique),
            status: Some(if approved {
                RunStatus::Approved
            } else {
                RunStatus::Rejected
            }),
            ..Self::default()
        }
    }

    pub fn verified(passed: bool, report: String) -> Self {
        Self {
            verification: Some(report),
            status: Some(if passed {
                RunStatus::Passed
            } else {
                RunStatus::Failed
            }),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> Artifact {
        Artifact::new("print(5)", LanguageTag::default())
    }

    #[test]
    fn test_language_tag_normalises() {
        assert_eq!(LanguageTag::new("  Python ").as_str(), "python");
        assert_eq!(LanguageTag::new("").as_str(), DEFAULT_LANGUAGE);
        assert_eq!(LanguageTag::new("SQL").to_string(), "sql");
    }

    #[test]
    fn test_new_candidate_starts_clean() {
        let state: ArtifactCandidate<()> = ArtifactCandidate::new(baseline());
        assert_eq!(state.iteration, 0);
        assert_eq!(state.status, RunStatus::Start);
        assert!(state.current.is_none());
        assert_eq!(state.working_artifact().content, "print(5)");
    }

    #[test]
    fn test_merge_leaves_previous_state_untouched() {
        let state: ArtifactCandidate<()> = ArtifactCandidate::new(baseline());
        let delta = StateDelta::produced(baseline().replaced_with("print(6)"), "why".into(), (), 1);
        let next = state.merge(&delta);

        assert_eq!(next.iteration, 1);
        assert_eq!(next.working_artifact().content, "print(6)");
        assert_eq!(state.iteration, 0);
        assert!(state.current.is_none());
    }

    #[test]
    fn test_merge_status_from_review_and_verify() {
        let state: ArtifactCandidate<()> = ArtifactCandidate::new(baseline());
        let rejected = state.merge(&StateDelta::reviewed(false, "no".into()));
        assert_eq!(rejected.status, RunStatus::Rejected);
        let passed = rejected.merge(&StateDelta::verified(true, "ok".into()));
        assert_eq!(passed.status, RunStatus::Passed);
        assert_eq!(passed.feedback.latest(FeedbackSource::Reviewer), Some("no"));
        assert_eq!(passed.feedback.latest(FeedbackSource::Verifier), Some("ok"));
    }

    #[test]
    fn test_feedback_log_keeps_latest_per_source_critique_first() {
        let mut log = FeedbackLog::default();
        log.record(FeedbackSource::Reviewer, "first critique");
        log.record(FeedbackSource::Verifier, "tests failed");
        log.record(FeedbackSource::Reviewer, "second critique");

        assert_eq!(log.entries().len(), 2);
        assert_eq!(
            log.render("Test Output"),
            "Critique: second critique\nTest Output: tests failed\n"
        );
    }

    #[test]
    fn test_feedback_render_skips_empty_messages() {
        let mut log = FeedbackLog::default();
        log.record(FeedbackSource::Reviewer, "");
        log.record(FeedbackSource::Verifier, "mismatch");
        assert_eq!(log.render("Benchmark Output"), "Benchmark Output: mismatch\n");
    }
}
