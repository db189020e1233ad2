use std::env;
use std::path::PathBuf;

use iris_api::pipeline::{BatchPolicy, DEFAULT_MAX_BATCH_SIZE};

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub model_path: PathBuf,
    /// Write a freshly fitted fallback model to `model_path`
    pub persist_fallback_model: bool,
    pub batch_policy: BatchPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Config {
            port: lookup("PORT")
                .unwrap_or_else(|| "5000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
            model_path: lookup("MODEL_PATH")
                .unwrap_or_else(|| "deploy/iris-model.json".to_string())
                .into(),
            persist_fallback_model: flag(&lookup, "PERSIST_FALLBACK_MODEL", true)?,
            batch_policy: BatchPolicy {
                isolate_failures: flag(&lookup, "BATCH_ISOLATE_FAILURES", false)?,
                range_check: flag(&lookup, "BATCH_RANGE_CHECK", false)?,
                max_batch_size: match lookup("MAX_BATCH_SIZE") {
                    Some(raw) => raw
                        .parse::<usize>()
                        .ok()
                        .filter(|size| *size > 0)
                        .ok_or_else(|| ConfigError::InvalidValue("MAX_BATCH_SIZE".to_string()))?,
                    None => DEFAULT_MAX_BATCH_SIZE,
                },
            },
        })
    }
}

fn flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(key).as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(_) => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(var) => write!(f, "Invalid value for: {}", var),
        }
    }
}

impl std::error::Error for ConfigError {}
