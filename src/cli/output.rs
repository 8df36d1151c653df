// Terminal rendering of stage events and run outcomes

use crossterm::style::Stylize;
use serde_json::Value;

use crate::orchestrator::{RunOutcome, StageEvent, TerminalStatus};

const PREVIEW_CHARS: usize = 240;

/// Single-line preview of a possibly long value
pub fn preview(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > PREVIEW_CHARS {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", cut)
    } else {
        flat
    }
}

pub fn print_event(event: &StageEvent) {
    println!(
        "\n{} {} (iteration {})",
        "▸".cyan().bold(),
        event.stage.bold(),
        event.iteration
    );
    if let Value::Object(fields) = &event.delta {
        for (key, value) in fields {
            if key == "iterations" {
                continue;
            }
            let rendered = preview(value);
            let rendered = match (key.as_str(), rendered.as_str()) {
                ("status", "approved" | "passed") => rendered.green().to_string(),
                ("status", "rejected" | "failed") => rendered.red().to_string(),
                _ => rendered,
            };
            println!("  {} {}", format!("{}:", key).dark_grey(), rendered);
        }
    }
}

pub fn status_label(status: TerminalStatus) -> String {
    match status {
        TerminalStatus::Passed => "✓ passed".green().bold().to_string(),
        TerminalStatus::ApprovedButUnverified => {
            "⚠ approved but unverified".yellow().bold().to_string()
        }
        TerminalStatus::Failed => "✗ failed".red().bold().to_string(),
    }
}

pub fn print_outcome<X>(outcome: &RunOutcome<X>) {
    println!("\n{}", "─".repeat(60).dark_grey());
    println!(
        "Result: {} after {} iteration(s) in {:.1}s",
        status_label(outcome.terminal),
        outcome.iterations(),
        (outcome.finished_at - outcome.started_at).num_milliseconds() as f64 / 1000.0
    );
    if outcome.forced_approval {
        println!("  {} critic ceiling forced approval", "⚠".yellow());
    }
    if outcome.forced_pass {
        println!("  {} verify ceiling ended the run", "⚠".yellow());
    }

    if !outcome.trail.is_empty() {
        println!("\n{}", "Trail:".bold());
        for record in &outcome.trail {
            let review = match record.approved {
                Some(true) => "approved".green().to_string(),
                Some(false) => "rejected".red().to_string(),
                None => "-".to_string(),
            };
            let verify = match record.passed {
                Some(true) => "passed".green().to_string(),
                Some(false) => "failed".red().to_string(),
                None => "-".to_string(),
            };
            println!(
                "  #{} review: {} verify: {}  {}",
                record.iteration,
                review,
                verify,
                preview(&Value::String(record.rationale.clone())).dark_grey()
            );
        }
    }

    if let Some(artifact) = outcome.final_artifact() {
        println!("\n{} ({})", "Final candidate:".bold(), artifact.language);
        println!("{}", artifact.content);
    }
}
