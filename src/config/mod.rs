//! Configuration system (layered: code > env > config file).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, TooltraceError};

pub const ENDPOINT_VAR: &str = "AZURE_INFERENCE_SDK_ENDPOINT";
pub const API_KEY_VAR: &str = "AZURE_INFERENCE_SDK_KEY";
pub const MODEL_VAR: &str = "AZURE_INFERENCE_SDK_MODEL";
pub const API_VERSION_VAR: &str = "AZURE_INFERENCE_API_VERSION";
pub const CONNECTION_STRING_VAR: &str = "APPLICATIONINSIGHTS_CONNECTION_STRING";
pub const RECORD_CONTENT_VAR: &str = "AZURE_TRACING_GEN_AI_CONTENT_RECORDING_ENABLED";
pub const MAX_ROUNDS_VAR: &str = "TOOLTRACE_MAX_ROUNDS";

pub const DEFAULT_API_VERSION: &str = "2024-05-01-preview";
pub const DEFAULT_MAX_ROUNDS: u32 = 10;
const CONFIG_FILE_NAME: &str = "config.toml";

/// Layered settings for the client, the tracer and the dispatch loop.
///
/// Every field is optional so layers can be merged; accessors apply
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TooltraceConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub api_version: Option<String>,
    pub connection_string: Option<String>,
    pub record_content: Option<bool>,
    pub max_rounds: Option<u32>,
}

/// Resolved endpoint and key for the inference service.
#[derive(Clone, PartialEq)]
pub struct InferenceCredentials {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub model: Option<String>,
}

impl std::fmt::Debug for InferenceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceCredentials")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("model", &self.model)
            .finish()
    }
}

impl TooltraceConfig {
    /// Load the file layer (explicit `path`, else the default location if it
    /// exists), then overlay environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        Ok(file.merge(Self::from_env()?))
    }

    /// Read settings from environment variables, loading `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let record_content = env_var(RECORD_CONTENT_VAR).map(|v| parse_bool(&v));
        let max_rounds = env_var(MAX_ROUNDS_VAR)
            .map(|v| {
                v.trim().parse::<u32>().map_err(|_| {
                    TooltraceError::Configuration(format!(
                        "{MAX_ROUNDS_VAR} must be a positive integer, got '{v}'"
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            endpoint: env_var(ENDPOINT_VAR),
            api_key: env_var(API_KEY_VAR),
            model: env_var(MODEL_VAR),
            api_version: env_var(API_VERSION_VAR),
            connection_string: env_var(CONNECTION_STRING_VAR),
            record_content,
            max_rounds,
        })
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TooltraceError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|e| {
            TooltraceError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })
    }

    /// `config.toml` in the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tooltrace")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Overlay `other` on `self`; values set in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            endpoint: other.endpoint.or(self.endpoint),
            api_key: other.api_key.or(self.api_key),
            model: other.model.or(self.model),
            api_version: other.api_version.or(self.api_version),
            connection_string: other.connection_string.or(self.connection_string),
            record_content: other.record_content.or(self.record_content),
            max_rounds: other.max_rounds.or(self.max_rounds),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    pub fn with_record_content(mut self, enabled: bool) -> Self {
        self.record_content = Some(enabled);
        self
    }

    /// Endpoint and key, or a `Configuration` error naming what is missing.
    pub fn credentials(&self) -> Result<InferenceCredentials> {
        let endpoint = required(self.endpoint.as_deref(), ENDPOINT_VAR)?;
        let api_key = required(self.api_key.as_deref(), API_KEY_VAR)?;
        Ok(InferenceCredentials {
            endpoint,
            api_key,
            api_version: self.api_version().to_string(),
            model: self.model.clone().filter(|m| !m.trim().is_empty()),
        })
    }

    pub fn api_version(&self) -> &str {
        self.api_version
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_API_VERSION)
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds.unwrap_or(DEFAULT_MAX_ROUNDS)
    }

    pub fn record_content(&self) -> bool {
        self.record_content.unwrap_or(false)
    }

    /// Telemetry connection string, if one is set and non-blank.
    pub fn connection_string(&self) -> Option<&str> {
        self.connection_string
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Set and non-blank; a blank variable leaves lower layers in effect.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(value: Option<&str>, name: &str) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        Some(_) => Err(TooltraceError::Configuration(format!("{name} is set but blank"))),
        None => Err(TooltraceError::Configuration(format!("{name} is not set"))),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blank_endpoint_is_configuration_error() {
        let config = TooltraceConfig::default()
            .with_endpoint("   ")
            .with_api_key("k");
        let err = config.credentials().unwrap_err();
        assert!(matches!(err, TooltraceError::Configuration(ref m) if m.contains(ENDPOINT_VAR)));
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let config = TooltraceConfig::default().with_endpoint("https://x");
        let err = config.credentials().unwrap_err();
        assert!(err.to_string().contains(API_KEY_VAR));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = TooltraceConfig::default();
        assert_eq!(config.api_version(), DEFAULT_API_VERSION);
        assert_eq!(config.max_rounds(), 10);
        assert!(!config.record_content());
        assert_eq!(config.connection_string(), None);
    }

    #[test]
    fn later_layer_wins_on_merge() {
        let file = TooltraceConfig {
            endpoint: Some("https://file".into()),
            model: Some("file-model".into()),
            ..Default::default()
        };
        let env = TooltraceConfig {
            endpoint: Some("https://env".into()),
            ..Default::default()
        };

        let merged = file.merge(env);

        assert_eq!(merged.endpoint.as_deref(), Some("https://env"));
        assert_eq!(merged.model.as_deref(), Some("file-model"));
    }

    #[test]
    fn parses_truthy_values() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool(" 1 "));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn credentials_debug_hides_key() {
        let creds = TooltraceConfig::default()
            .with_endpoint("https://x")
            .with_api_key("super-secret")
            .credentials()
            .unwrap();
        assert!(!format!("{creds:?}").contains("super-secret"));
    }
}
