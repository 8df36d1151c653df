// Configuration loader
// Reads ~/.studio/config.toml (or an explicit path), then applies .env and
// environment overrides.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::{API_KEY_ENV, BIND_ADDR_ENV};
use super::settings::Config;

/// Default config location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".studio").join("config.toml"))
}

/// Load configuration.
///
/// An explicit `path` must exist; the default location is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!("Ignoring unreadable .env file: {}", e);
        }
    }

    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_config_file(&path)?,
            _ => Config::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    config
        .validate()
        .context("Configuration validation failed")?;

    if config.provider.api_key.is_none() {
        tracing::warn!(
            "{} not found in environment or config; LLM pipelines will not start",
            API_KEY_ENV
        );
    }

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        bail!("Configuration file not found: {}", path.display());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
    parse_config(&contents)
        .with_context(|| format!("Failed to parse configuration file {}", path.display()))
}

/// Parse TOML; every section and key is optional
pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents)?;
    Ok(config)
}

/// Apply environment overrides through `lookup` (std::env::var in production)
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.is_empty()) {
        config.provider.api_key = Some(key);
    }
    if let Some(addr) = lookup(BIND_ADDR_ENV).filter(|a| !a.is_empty()) {
        config.server.bind_address = addr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::CeilingPolicy;
    use crate::pipelines::PipelineKind;
    use std::io::Write;

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let config = parse_config(
            r#"
            [benchmark]
            timeout_secs = 3

            [pipelines.optimization]
            critic = 2
            verify = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.benchmark.timeout_secs, 3);
        assert_eq!(config.benchmark.interpreter, "python3");
        assert_eq!(config.ceilings(PipelineKind::Optimization), CeilingPolicy::new(2, 4));
        assert_eq!(config.ceilings(PipelineKind::Repair), CeilingPolicy::new(5, 10));
    }

    #[test]
    fn test_partial_ceiling_table_uses_pipeline_defaults() {
        let config = parse_config(
            r#"
            [pipelines.repair]
            critic = 3

            [pipelines.security]
            verify = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.ceilings(PipelineKind::Repair), CeilingPolicy::new(3, 10));
        assert_eq!(config.ceilings(PipelineKind::Security), CeilingPolicy::new(5, 7));
        assert_eq!(config.ceilings(PipelineKind::Optimization), CeilingPolicy::new(5, 8));
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        assert!(parse_config("[server]\nbind_address = 5").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| match key {
            "GOOGLE_API_KEY" => Some("from-env".to_string()),
            "STUDIO_BIND_ADDR" => Some("0.0.0.0:9000".to_string()),
            _ => None,
        });
        assert_eq!(config.provider.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config::default();
        config.provider.api_key = Some("from-file".into());
        apply_env_overrides(&mut config, |_| Some(String::new()));
        assert_eq!(config.provider.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[provider]\nmodel = \"gemini-pro\"").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.provider.model, "gemini-pro");
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
