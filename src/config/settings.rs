// Configuration structs

use anyhow::{bail, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use super::constants::*;
use crate::orchestrator::CeilingPolicy;
use crate::pipelines::PipelineKind;

/// LLM provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Gemini API key (also read from GOOGLE_API_KEY)
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// HTTP service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8000")
    pub bind_address: String,
    /// CORS origins allowed to call the API
    pub allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_HTTP_ADDR.to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Execution comparator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub interpreter: String,
    /// Deadline per execution
    pub timeout_secs: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            timeout_secs: DEFAULT_EXECUTION_TIMEOUT_SECS,
        }
    }
}

/// Mock project checkout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub work_dir: PathBuf,
    /// Program + leading args; the test file is appended
    pub test_command: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            test_command: vec!["pytest".to_string()],
            timeout_secs: DEFAULT_EXECUTION_TIMEOUT_SECS,
        }
    }
}

/// Ceilings per pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelinesConfig {
    #[serde(deserialize_with = "repair_ceilings")]
    pub repair: CeilingPolicy,
    #[serde(deserialize_with = "security_ceilings")]
    pub security: CeilingPolicy,
    #[serde(deserialize_with = "optimization_ceilings")]
    pub optimization: CeilingPolicy,
}

/// A `[pipelines.<kind>]` table; missing keys keep that pipeline's default
#[derive(Deserialize)]
struct CeilingTable {
    critic: Option<u32>,
    verify: Option<u32>,
}

impl CeilingTable {
    fn resolve(self, kind: PipelineKind) -> CeilingPolicy {
        let defaults = kind.default_ceilings();
        CeilingPolicy::new(
            self.critic.unwrap_or(defaults.critic),
            self.verify.unwrap_or(defaults.verify),
        )
    }
}

fn repair_ceilings<'de, D: Deserializer<'de>>(d: D) -> Result<CeilingPolicy, D::Error> {
    CeilingTable::deserialize(d).map(|t| t.resolve(PipelineKind::Repair))
}

fn security_ceilings<'de, D: Deserializer<'de>>(d: D) -> Result<CeilingPolicy, D::Error> {
    CeilingTable::deserialize(d).map(|t| t.resolve(PipelineKind::Security))
}

fn optimization_ceilings<'de, D: Deserializer<'de>>(d: D) -> Result<CeilingPolicy, D::Error> {
    CeilingTable::deserialize(d).map(|t| t.resolve(PipelineKind::Optimization))
}

impl Default for PipelinesConfig {
    fn default() -> Self {
        Self {
            repair: PipelineKind::Repair.default_ceilings(),
            security: PipelineKind::Security.default_ceilings(),
            optimization: PipelineKind::Optimization.default_ceilings(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub server: ServerConfig,
    pub benchmark: BenchmarkConfig,
    pub dataset: DatasetConfig,
    pub pipelines: PipelinesConfig,
}

impl Config {
    pub fn ceilings(&self, kind: PipelineKind) -> CeilingPolicy {
        match kind {
            PipelineKind::Repair => self.pipelines.repair,
            PipelineKind::Security => self.pipelines.security,
            PipelineKind::Optimization => self.pipelines.optimization,
        }
    }

    /// The API key, or an error telling the user where to put one
    pub fn require_api_key(&self) -> Result<&str> {
        match self.provider.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => bail!(
                "No API key configured. Set {} (or add it to a .env file), \
                 or put `api_key` under [provider] in the config file.",
                API_KEY_ENV
            ),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.benchmark.interpreter.trim().is_empty() {
            bail!("benchmark.interpreter must not be empty");
        }
        if self.benchmark.timeout_secs == 0 {
            bail!("benchmark.timeout_secs must be greater than zero");
        }
        if self.dataset.test_command.is_empty() {
            bail!("dataset.test_command must name a program");
        }
        if self.dataset.timeout_secs == 0 {
            bail!("dataset.timeout_secs must be greater than zero");
        }
        if self.provider.model.trim().is_empty() {
            bail!("provider.model must not be empty");
        }
        for kind in PipelineKind::ALL {
            let policy = self.ceilings(kind);
            if !policy.is_consistent() {
                tracing::warn!(
                    "{} pipeline: verify ceiling {} is below critic ceiling {}",
                    kind,
                    policy.verify,
                    policy.critic
                );
            }
        }
        Ok(())
    }
}
