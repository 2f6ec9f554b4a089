use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout_secs: u64,
}

/// Tunables the pipeline stages read. These were embedded constants in
/// earlier iterations of the system; they are explicit configuration so the
/// core stays testable in isolation.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub budget_ceiling: Decimal,
    pub default_item_price: Decimal,
    pub max_attempts: u32,
    pub reference_dir: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub budget_ceiling: Option<Decimal>,
    pub default_item_price: Option<Decimal>,
    pub max_attempts: Option<u32>,
    pub reference_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                model: "llama3.1".to_string(),
                timeout_secs: 30,
            },
            pipeline: PipelineConfig {
                budget_ceiling: Decimal::new(100, 0),
                default_item_price: Decimal::new(5, 0),
                max_attempts: 3,
                reference_dir: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("pantry.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = Some(api_key_value.into());
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(budget_ceiling) = pipeline.budget_ceiling {
                self.pipeline.budget_ceiling = budget_ceiling;
            }
            if let Some(default_item_price) = pipeline.default_item_price {
                self.pipeline.default_item_price = default_item_price;
            }
            if let Some(max_attempts) = pipeline.max_attempts {
                self.pipeline.max_attempts = max_attempts;
            }
            if let Some(reference_dir) = pipeline.reference_dir {
                self.pipeline.reference_dir = Some(PathBuf::from(reference_dir));
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PANTRY_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("PANTRY_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("PANTRY_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("PANTRY_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("PANTRY_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PANTRY_BUDGET_CEILING") {
            self.pipeline.budget_ceiling = parse_decimal("PANTRY_BUDGET_CEILING", &value)?;
        }
        if let Some(value) = read_env("PANTRY_DEFAULT_ITEM_PRICE") {
            self.pipeline.default_item_price =
                parse_decimal("PANTRY_DEFAULT_ITEM_PRICE", &value)?;
        }
        if let Some(value) = read_env("PANTRY_MAX_ATTEMPTS") {
            self.pipeline.max_attempts = parse_u32("PANTRY_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("PANTRY_REFERENCE_DIR") {
            self.pipeline.reference_dir = Some(PathBuf::from(value));
        }

        let log_level = read_env("PANTRY_LOGGING_LEVEL").or_else(|| read_env("PANTRY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PANTRY_LOGGING_FORMAT").or_else(|| read_env("PANTRY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(budget_ceiling) = overrides.budget_ceiling {
            self.pipeline.budget_ceiling = budget_ceiling;
        }
        if let Some(default_item_price) = overrides.default_item_price {
            self.pipeline.default_item_price = default_item_price;
        }
        if let Some(max_attempts) = overrides.max_attempts {
            self.pipeline.max_attempts = max_attempts;
        }
        if let Some(reference_dir) = overrides.reference_dir {
            self.pipeline.reference_dir = Some(reference_dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "llm.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.pipeline.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "pipeline.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.pipeline.budget_ceiling <= Decimal::ZERO {
            return Err(ConfigError::Validation(
                "pipeline.budget_ceiling must be positive".to_string(),
            ));
        }
        if self.pipeline.default_item_price < Decimal::ZERO {
            return Err(ConfigError::Validation(
                "pipeline.default_item_price must not be negative".to_string(),
            ));
        }
        match self.logging.level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ConfigError::Validation(format!(
                "unsupported logging.level `{other}` (expected trace|debug|info|warn|error)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    pipeline: Option<PipelinePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelinePatch {
    budget_ceiling: Option<Decimal>,
    default_item_price: Option<Decimal>,
    max_attempts: Option<u32>,
    reference_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("pantry.toml"), PathBuf::from("config/pantry.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rust_decimal::Decimal;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().expect("defaults must validate");
        assert_eq!(config.pipeline.budget_ceiling, Decimal::new(100, 0));
        assert_eq!(config.pipeline.default_item_price, Decimal::new(5, 0));
        assert_eq!(config.pipeline.max_attempts, 3);
    }

    #[test]
    fn file_patch_overrides_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pantry.toml");
        fs::write(
            &path,
            "[pipeline]\nbudget_ceiling = 25.5\nmax_attempts = 2\n\n[logging]\nlevel = \"debug\"\n",
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("load");

        assert_eq!(config.pipeline.budget_ceiling, Decimal::new(255, 1));
        assert_eq!(config.pipeline.max_attempts, 2);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn programmatic_overrides_win_over_file_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pantry.toml");
        fs::write(&path, "[pipeline]\nmax_attempts = 2\n").expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            overrides: ConfigOverrides {
                max_attempts: Some(5),
                budget_ceiling: Some(Decimal::new(40, 0)),
                ..ConfigOverrides::default()
            },
        })
        .expect("load");

        assert_eq!(config.pipeline.max_attempts, 5);
        assert_eq!(config.pipeline.budget_ceiling, Decimal::new(40, 0));
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn zero_max_attempts_fails_validation() {
        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides { max_attempts: Some(0), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn negative_default_price_fails_validation() {
        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                default_item_price: Some(Decimal::new(-1, 0)),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
