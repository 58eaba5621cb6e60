//! Configuration loading
//!
//! Validation options come from an optional JSON file, then environment
//! variables, then CLI flags (applied by the caller), each layer overriding
//! the one before.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::ValidationOptions;
use crate::design::EarthingSystem;

pub const ENV_VOLTAGE: &str = "CIRCUITGUARD_VOLTAGE";
pub const ENV_EARTHING: &str = "CIRCUITGUARD_EARTHING";
pub const ENV_EMBEDDING_KEY: &str = "CIRCUITGUARD_EMBEDDING_KEY";
pub const ENV_OPENAI_KEY: &str = "OPENAI_API_KEY";
pub const ENV_EMBEDDING_URL: &str = "CIRCUITGUARD_EMBEDDING_URL";
pub const ENV_EMBEDDING_MODEL: &str = "CIRCUITGUARD_EMBEDDING_MODEL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

/// Load options from a JSON file and apply environment overrides.
pub fn load_options(path: &Path) -> Result<ValidationOptions, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut options: ValidationOptions =
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    apply_env_overrides(&mut options)?;
    tracing::debug!("Loaded validation options from {:?}", path);
    Ok(options)
}

/// Default options with environment overrides applied.
pub fn options_from_env() -> Result<ValidationOptions, ConfigError> {
    let mut options = ValidationOptions::default();
    apply_env_overrides(&mut options)?;
    Ok(options)
}

pub fn apply_env_overrides(options: &mut ValidationOptions) -> Result<(), ConfigError> {
    apply_overrides_from(options, |name| std::env::var(name).ok())
}

/// Apply overrides from any variable source.
pub fn apply_overrides_from<F>(options: &mut ValidationOptions, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ENV_VOLTAGE).filter(|v| !v.trim().is_empty()) {
        let voltage: f64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: ENV_VOLTAGE.to_string(),
            value: raw.clone(),
            reason: "expected a number of volts".to_string(),
        })?;
        if !(voltage > 0.0) {
            return Err(ConfigError::InvalidValue {
                name: ENV_VOLTAGE.to_string(),
                value: raw,
                reason: "must be greater than zero".to_string(),
            });
        }
        options.voltage = Some(voltage);
    }

    if let Some(raw) = lookup(ENV_EARTHING).filter(|v| !v.trim().is_empty()) {
        let earthing: EarthingSystem =
            raw.parse().map_err(|reason| ConfigError::InvalidValue {
                name: ENV_EARTHING.to_string(),
                value: raw.clone(),
                reason,
            })?;
        options.earthing = Some(earthing);
    }

    Ok(())
}

/// Settings for the OpenAI-compatible embeddings endpoint.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl EmbeddingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();
        if let Some(url) = non_empty(ENV_EMBEDDING_URL) {
            config.endpoint = url;
        }
        if let Some(model) = non_empty(ENV_EMBEDDING_MODEL) {
            config.model = model;
        }
        config.api_key = non_empty(ENV_EMBEDDING_KEY).or_else(|| non_empty(ENV_OPENAI_KEY));
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_overrides() {
        let env = vars(&[(ENV_VOLTAGE, "240"), (ENV_EARTHING, "pme")]);
        let mut options = ValidationOptions::default();
        apply_overrides_from(&mut options, |k| env.get(k).cloned()).unwrap();
        assert_eq!(options.voltage, Some(240.0));
        assert_eq!(options.earthing, Some(EarthingSystem::TnCS));
    }

    #[test]
    fn test_invalid_env_values_rejected() {
        let env = vars(&[(ENV_VOLTAGE, "lots")]);
        let mut options = ValidationOptions::default();
        let err = apply_overrides_from(&mut options, |k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let env = vars(&[(ENV_VOLTAGE, "-5")]);
        assert!(apply_overrides_from(&mut options, |k| env.get(k).cloned()).is_err());

        let env = vars(&[(ENV_EARTHING, "IT")]);
        assert!(apply_overrides_from(&mut options, |k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn test_load_options_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circuitguard.json");
        std::fs::write(&path, r#"{"strictMode": true, "maxVoltageDropOther": 4.0}"#).unwrap();
        let mut options: ValidationOptions =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        apply_overrides_from(&mut options, |_| None).unwrap();
        assert!(options.strict_mode);
        assert_eq!(options.max_voltage_drop_other, 4.0);
        assert_eq!(options.max_voltage_drop_lighting, 3.0);

        assert!(matches!(
            load_options(&dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(load_options(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_embedding_config_key_precedence() {
        let env = vars(&[(ENV_OPENAI_KEY, "sk-openai"), (ENV_EMBEDDING_KEY, "sk-own")]);
        let config = EmbeddingConfig::from_lookup(|k| env.get(k).cloned());
        assert_eq!(config.api_key.as_deref(), Some("sk-own"));
        assert_eq!(config.model, "text-embedding-3-small");

        let env = vars(&[(ENV_OPENAI_KEY, "sk-openai")]);
        let config = EmbeddingConfig::from_lookup(|k| env.get(k).cloned());
        assert_eq!(config.api_key.as_deref(), Some("sk-openai"));

        assert!(EmbeddingConfig::from_lookup(|_| None).api_key.is_none());
    }
}
