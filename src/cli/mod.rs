// Command-line interface
//
// Each pipeline command runs one refinement loop in the foreground, printing
// stages as they complete.

pub mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::agents::ModelClient;
use crate::benchmark::ExecutionComparator;
use crate::config::Config;
use crate::dataset::{BugInfo, MockDataset, ProjectCheckout, DEMO_PROJECT};
use crate::orchestrator::{RefinementOrchestrator, RunOutcome};
use crate::pipelines::{self, PipelineKind};
use crate::ports::TaskContext;
use crate::providers::{GeminiProvider, LlmProvider};
use crate::server::StudioServer;

#[derive(Debug, Parser)]
#[command(
    name = "studio",
    about = "Refine code with producer, reviewer and verifier agents",
    version
)]
pub struct Cli {
    /// Config file (default: ~/.studio/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Repair a bug from the mock dataset until its tests pass
    Fix {
        #[arg(long, default_value = DEMO_PROJECT)]
        project: String,
        #[arg(long = "bug-id", default_value = "1")]
        bug_id: String,
    },
    /// Audit and harden a SQL file
    Security {
        #[arg(long)]
        file: PathBuf,
    },
    /// Optimize a program without changing its output
    Optimize {
        #[arg(long)]
        file: PathBuf,
        /// Text fed to the program's stdin
        #[arg(long, conflicts_with = "input_file")]
        input: Option<String>,
        #[arg(long = "input-file")]
        input_file: Option<PathBuf>,
        #[arg(long, default_value = crate::candidate::DEFAULT_LANGUAGE)]
        language: String,
    },
    /// Serve the streaming HTTP API
    Serve {
        /// Overrides [server] bind_address
        #[arg(long)]
        bind: Option<String>,
    },
}

/// Execute a parsed command; returns the process exit code
pub async fn run(command: Command, mut config: Config) -> Result<i32> {
    match command {
        Command::Fix { project, bug_id } => {
            let client = model_client(&config)?;
            let dataset = MockDataset::new(&config.dataset);
            let bug = dataset.get_bug_info(&project, &bug_id).await?;
            dataset.checkout(&project, &bug_id).await?;
            println!("Bug {}/{}: {}", project, bug_id, bug.description);

            let orchestrator = pipelines::repair_pipeline(
                client,
                Arc::new(dataset),
                config.ceilings(PipelineKind::Repair),
            );
            finish(run_with_progress(orchestrator, pipelines::repair_task(&bug)).await?)
        }
        Command::Security { file } => {
            let client = model_client(&config)?;
            let code = read_file(&file).await?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "query.sql".to_string());
            let bug = BugInfo {
                project: "security_project".to_string(),
                id: "security_audit_1".to_string(),
                description: "SQL Security Audit".to_string(),
                file_path: file_name,
                code,
                test_file: "test_sql.py".to_string(),
                test_code: "def test_placeholder(): pass\n".to_string(),
            };
            let mut dataset = MockDataset::new(&config.dataset);
            dataset.insert_bug(bug.clone());
            dataset.checkout(&bug.project, &bug.id).await?;

            let orchestrator = pipelines::security_pipeline(
                client,
                Arc::new(dataset),
                config.ceilings(PipelineKind::Security),
            );
            finish(run_with_progress(orchestrator, pipelines::security_task(&bug)).await?)
        }
        Command::Optimize {
            file,
            input,
            input_file,
            language,
        } => {
            let client = model_client(&config)?;
            let code = read_file(&file).await?;
            let input = match (input, input_file) {
                (Some(text), _) => text,
                (None, Some(path)) => read_file(&path).await?,
                (None, None) => String::new(),
            };

            let orchestrator = pipelines::optimization_pipeline(
                client,
                ExecutionComparator::python(&config.benchmark),
                config.ceilings(PipelineKind::Optimization),
            );
            let task = pipelines::optimization_task(code, input, &language);
            finish(run_with_progress(orchestrator, task).await?)
        }
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            let provider = match config.require_api_key() {
                Ok(_) => Some(gemini_provider(&config)?),
                Err(e) => {
                    tracing::warn!("{}; analysis endpoints will answer 503", e);
                    None
                }
            };
            StudioServer::new(config, provider).serve().await?;
            Ok(0)
        }
    }
}

fn gemini_provider(config: &Config) -> Result<Arc<dyn LlmProvider>> {
    let key = config.require_api_key()?;
    let provider = GeminiProvider::new(key.to_string())?.with_model(config.provider.model.clone());
    Ok(Arc::new(provider))
}

fn model_client(config: &Config) -> Result<ModelClient> {
    Ok(ModelClient::new(gemini_provider(config)?, &config.provider))
}

async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Drive a run while printing each stage as it completes
pub async fn run_with_progress<X>(
    orchestrator: RefinementOrchestrator<X>,
    task: TaskContext,
) -> Result<RunOutcome<X>>
where
    X: Clone + Default + Serialize + Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::channel(16);
    let printer = async move {
        while let Some(event) = rx.recv().await {
            output::print_event(&event);
        }
    };
    let (result, ()) = tokio::join!(orchestrator.run_streaming(task, tx), printer);
    Ok(result?)
}

fn finish<X>(outcome: RunOutcome<X>) -> Result<i32> {
    output::print_outcome(&outcome);
    Ok(if outcome.terminal.is_success() { 0 } else { 1 })
}
