use crate::catalog::{ApiFlavor, ModelCatalog};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_API: &str = "BEDROCK_MCP_API";
pub const ENV_DEFAULT_MODEL: &str = "BEDROCK_MCP_DEFAULT_MODEL";
pub const ENV_INFERENCE_PROFILE: &str = "BEDROCK_MCP_INFERENCE_PROFILE";
pub const ENV_LOG_FILE: &str = "BEDROCK_MCP_LOG_FILE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockConfig {
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub api: ApiFlavor,

    /// Overrides the catalog's default model
    #[serde(default)]
    pub default_model: Option<String>,

    /// Named AWS credentials profile
    #[serde(default)]
    pub profile: Option<String>,

    /// Cross-region inference profile prefix, e.g. "us"
    #[serde(default)]
    pub inference_profile: Option<String>,

    /// Append logs to this file in addition to stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            api: ApiFlavor::default(),
            default_model: None,
            profile: None,
            inference_profile: None,
            log_file: None,
        }
    }
}

impl BedrockConfig {
    /// Load from a TOML file, falling back to defaults when it does not exist
    pub fn load(config_path: &Path) -> Result<Self> {
        match Self::load_file(config_path)? {
            Some(config) => Ok(config),
            None => {
                tracing::info!(
                    path = %config_path.display(),
                    "Configuration file not found, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    /// Load from a TOML file; `None` when the file does not exist
    pub fn load_file(config_path: &Path) -> Result<Option<Self>> {
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read configuration file {}", config_path.display()))?;
        Self::from_toml(&content)
            .map(Some)
            .with_context(|| format!("Failed to parse configuration file {}", config_path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(region) = var(ENV_REGION) {
            self.region = region;
        }
        if let Some(api) = var(ENV_API) {
            self.api = api
                .parse()
                .map_err(|e: String| anyhow::anyhow!("Invalid {}: {}", ENV_API, e))?;
        }
        if let Some(model) = var(ENV_DEFAULT_MODEL) {
            self.default_model = Some(model);
        }
        if let Some(profile) = var(ENV_INFERENCE_PROFILE) {
            self.inference_profile = Some(profile);
        }
        if let Some(path) = var(ENV_LOG_FILE) {
            self.log_file = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Model catalog for the configured API, with the configured default applied
    pub fn catalog(&self) -> Result<ModelCatalog> {
        let catalog = ModelCatalog::for_api(self.api);
        match &self.default_model {
            Some(id) => catalog
                .with_default(id)
                .context("Invalid default_model in configuration"),
            None => Ok(catalog),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = BedrockConfig::load(&temp_dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.api, ApiFlavor::Converse);
        assert!(config.default_model.is_none());
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_load_file_reports_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");
        assert!(BedrockConfig::load_file(&path).unwrap().is_none());

        std::fs::write(&path, "region = \"ap-south-1\"").unwrap();
        let config = BedrockConfig::load_file(&path).unwrap().unwrap();
        assert_eq!(config.region, "ap-south-1");
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bedrock-mcp.toml");
        std::fs::write(
            &path,
            r#"
region = "eu-west-1"
api = "invoke_model"
default_model = "anthropic.claude-v2:1"
inference_profile = "eu"
log_file = "/tmp/mcp-bedrock.log"
"#,
        )
        .unwrap();

        let config = BedrockConfig::load(&path).unwrap();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.api, ApiFlavor::InvokeModel);
        assert_eq!(config.inference_profile.as_deref(), Some("eu"));
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/mcp-bedrock.log")));

        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.default_model().name, "Claude 2.1");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "api = \"streaming\"").unwrap();

        assert!(BedrockConfig::load(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_REGION, "us-west-2"),
            (ENV_API, "invoke-model"),
            (ENV_DEFAULT_MODEL, "anthropic.claude-3-haiku-20240307-v1:0"),
            (ENV_LOG_FILE, ""),
        ]
        .into_iter()
        .collect();

        let mut config = BedrockConfig::default();
        config
            .apply_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.api, ApiFlavor::InvokeModel);
        assert_eq!(
            config.default_model.as_deref(),
            Some("anthropic.claude-3-haiku-20240307-v1:0")
        );
        // blank values are ignored
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_invalid_env_api() {
        let mut config = BedrockConfig::default();
        let result = config.apply_vars(|key| (key == ENV_API).then(|| "grpc".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_default_model_must_match_api() {
        let config = BedrockConfig {
            default_model: Some("anthropic.claude-instant-v1".to_string()),
            ..Default::default()
        };
        assert!(config.catalog().is_err());
    }
}
