// Execution comparator - dual-execution equivalence and speedup benchmark
//
// Runs a baseline and a candidate artifact against the same input, checks that
// the candidate ran cleanly and printed exactly what the baseline printed, and
// quantifies the speedup.

pub mod runner;

pub use runner::{acquire_execution_slot, Execution, ProgramRunner, PythonRunner};

use std::sync::Arc;
use std::time::Duration;

use crate::candidate::LanguageTag;
use crate::config::BenchmarkConfig;

/// Verdict of one comparison
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub passed: bool,
    /// Human-readable report (what the Producer sees as feedback)
    pub report: String,
    /// Candidate error, if any
    pub error: Option<String>,
    /// True when execution was skipped for an unsupported language
    pub skipped: bool,
    pub baseline: Option<Execution>,
    pub candidate: Option<Execution>,
    /// Percentage speedup, present only when the candidate was strictly faster
    pub speedup_pct: Option<f64>,
    /// Baseline error; surfaced as a warning, never fails the comparison
    pub baseline_error: Option<String>,
}

impl ComparisonResult {
    fn skipped(language: &LanguageTag, environment: &str) -> Self {
        Self {
            passed: true,
            report: format!(
                "Benchmarking skipped for language: {}. Only {} is currently supported for execution. \
                 The candidate was not executed; its structure and logic were not verified at runtime.",
                language, environment
            ),
            error: None,
            skipped: true,
            baseline: None,
            candidate: None,
            speedup_pct: None,
            baseline_error: None,
        }
    }

    /// Report followed by the candidate error, as handed back to the Producer
    pub fn feedback(&self) -> String {
        format!("{}\n{}", self.report, self.error.as_deref().unwrap_or(""))
    }
}

/// Runs two artifacts and decides whether the second may replace the first
#[derive(Clone)]
pub struct ExecutionComparator {
    runner: Arc<dyn ProgramRunner>,
}

impl ExecutionComparator {
    pub fn new(runner: Arc<dyn ProgramRunner>) -> Self {
        Self { runner }
    }

    /// Comparator backed by a Python interpreter, per configuration
    pub fn python(config: &BenchmarkConfig) -> Self {
        Self::new(Arc::new(PythonRunner::new(
            config.interpreter.clone(),
            Duration::from_secs(config.timeout_secs),
        )))
    }

    pub fn supports(&self, language: &LanguageTag) -> bool {
        self.runner.supports(language)
    }

    pub async fn compare(
        &self,
        baseline: &str,
        candidate: &str,
        input: Option<&str>,
        language: &LanguageTag,
    ) -> ComparisonResult {
        if !self.runner.supports(language) {
            tracing::warn!(
                "Skipping benchmark for unsupported language '{}' (runner: {})",
                language,
                self.runner.environment()
            );
            return ComparisonResult::skipped(language, self.runner.environment());
        }

        let input = input.filter(|i| !i.is_empty());

        tracing::info!("Benchmarking original");
        let baseline_run = self.runner.execute(baseline, input).await;
        tracing::info!("Benchmarking candidate");
        let candidate_run = self.runner.execute(candidate, input).await;

        judge(baseline_run, candidate_run)
    }
}

/// Verdict over two finished executions.
///
/// Order matters: a candidate error beats an output mismatch, which beats timing.
pub fn judge(baseline: Execution, candidate: Execution) -> ComparisonResult {
    let mut report = String::new();
    let mut passed = true;
    let mut speedup_pct = None;

    if let Some(err) = &candidate.error {
        passed = false;
        report.push_str(&format!("Optimized code failed with error: {}\n", err));
    } else if baseline.stdout != candidate.stdout {
        passed = false;
        report.push_str(&format!(
            "Output mismatch!\nOriginal: {}\nOptimized: {}\n",
            baseline.stdout, candidate.stdout
        ));
    } else {
        let base = baseline.elapsed.as_secs_f64();
        let cand = candidate.elapsed.as_secs_f64();
        report.push_str(&format!("Original Time: {:.6}s\n", base));
        report.push_str(&format!("Optimized Time: {:.6}s\n", cand));
        if cand < base {
            let pct = (base - cand) / base * 100.0;
            speedup_pct = Some(pct);
            report.push_str(&format!("Speedup: {:.2}%\n", pct));
        } else {
            report.push_str(
                "No speedup detected (optimized code may be slower or too fast to measure a difference).\n",
            );
        }
        if let Some(err) = &baseline.error {
            tracing::warn!("Original code errored during benchmark; comparison still passed");
            report.push_str(&format!("Warning: original code failed with error: {}\n", err));
        }
    }

    ComparisonResult {
        passed,
        report,
        error: candidate.error.clone(),
        skipped: false,
        baseline_error: baseline.error.clone(),
        baseline: Some(baseline),
        candidate: Some(candidate),
        speedup_pct,
    }
}
