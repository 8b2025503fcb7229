//! Two-file YAML configuration.
//!
//! Public settings live in `config.yml`; credentials live in `secrets.yaml`
//! next to the user data. Reads overlay the secrets onto the public file,
//! writes partition the tree back into the two files.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::AppSettings;
use super::validation::validate_config;
use crate::core::errors::ApiError;

/// Shown in place of secret values by `GET /api/config`.
pub const MASK: &str = "****";

const CONFIG_PATH_ENV: &str = "SCHOLAR_CONFIG_PATH";

/// Key suffixes that mark a value as a credential.
const SECRET_SUFFIXES: [&str; 5] = ["api_key", "secret", "password", "token", "credentials"];

/// Whether a config key holds a credential. Counters such as `max_tokens`
/// do not match because only the exact suffix counts.
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SECRET_SUFFIXES.iter().any(|suffix| key.ends_with(suffix))
}

/// A config tree split into what may be shown and what must not.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayers {
    pub public: Value,
    pub secrets: Value,
}

impl ConfigLayers {
    /// Moves every non-null secret leaf into `secrets`, keeping the nesting.
    pub fn partition(config: &Value) -> Self {
        let Value::Object(map) = config else {
            return Self {
                public: config.clone(),
                secrets: empty(),
            };
        };

        let mut public = Map::new();
        let mut secrets = Map::new();
        for (key, value) in map {
            if value.is_object() {
                let nested = Self::partition(value);
                if !is_empty(&nested.public) {
                    public.insert(key.clone(), nested.public);
                }
                if !is_empty(&nested.secrets) {
                    secrets.insert(key.clone(), nested.secrets);
                }
            } else if is_secret_key(key) && !value.is_null() {
                secrets.insert(key.clone(), value.clone());
            } else {
                public.insert(key.clone(), value.clone());
            }
        }

        Self {
            public: Value::Object(public),
            secrets: Value::Object(secrets),
        }
    }

    pub fn combined(&self) -> Value {
        overlay(&self.public, &self.secrets)
    }
}

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Where the public config is read from: the env override, then the
    /// user data directory, then the bundled defaults.
    pub fn config_path(&self) -> PathBuf {
        if let Some(path) = env_override() {
            return path;
        }
        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            user_config
        } else {
            self.paths.project_root.join("config.yml")
        }
    }

    /// Saves never touch the bundled defaults.
    pub fn config_write_path(&self) -> PathBuf {
        env_override().unwrap_or_else(|| self.paths.user_data_dir.join("config.yml"))
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    fn read_layers(&self) -> ConfigLayers {
        ConfigLayers {
            public: read_yaml(&self.config_path()),
            secrets: read_yaml(&self.secrets_path()),
        }
    }

    /// The merged config with secrets in place.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        Ok(self.read_layers().combined())
    }

    /// The merged config with every secret replaced by [`MASK`].
    pub fn load_masked(&self) -> Result<Value, ApiError> {
        Ok(mask(&self.load_config()?))
    }

    /// Loads, validates and resolves the merged config into typed settings.
    pub fn load_settings(&self) -> Result<AppSettings, ApiError> {
        let config = self.load_config()?;
        validate_config(&config)?;
        Ok(AppSettings::from_config(&config))
    }

    /// Validates and saves `incoming`, either replacing the stored config or
    /// overlaying onto it. Masked values sent back by a client keep the
    /// stored secret. Returns the settings the next start will use.
    pub fn update_config(&self, incoming: Value, merge: bool) -> Result<AppSettings, ApiError> {
        let current = self.load_config()?;
        let incoming = unmask(&incoming, &current);
        let next = if merge {
            overlay(&current, &incoming)
        } else {
            incoming
        };

        validate_config(&next)?;
        self.write_layers(&ConfigLayers::partition(&next))?;
        tracing::info!(
            "Saved config to {} (secrets in {})",
            self.config_write_path().display(),
            self.secrets_path().display()
        );
        Ok(AppSettings::from_config(&next))
    }

    fn write_layers(&self, layers: &ConfigLayers) -> Result<(), ApiError> {
        write_yaml(&self.config_write_path(), &layers.public)?;
        write_yaml(&self.secrets_path(), &layers.secrets)
    }
}

fn env_override() -> Option<PathBuf> {
    env::var_os(CONFIG_PATH_ENV).map(PathBuf::from)
}

fn empty() -> Value {
    Value::Object(Map::new())
}

fn is_empty(value: &Value) -> bool {
    value.as_object().is_some_and(Map::is_empty)
}

/// A missing, unreadable or non-mapping file reads as an empty mapping.
fn read_yaml(path: &Path) -> Value {
    if !path.exists() {
        return empty();
    }
    let parsed = fs::read_to_string(path)
        .map_err(|err| err.to_string())
        .and_then(|text| serde_yaml::from_str::<Value>(&text).map_err(|err| err.to_string()));
    match parsed {
        Ok(value) if value.is_object() => value,
        Ok(_) => {
            tracing::warn!("Config {} is not a mapping; ignoring it", path.display());
            empty()
        }
        Err(err) => {
            tracing::warn!("Ignoring unreadable config {}: {}", path.display(), err);
            empty()
        }
    }
}

fn write_yaml(path: &Path, value: &Value) -> Result<(), ApiError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(ApiError::internal)?;
    }
    let text = serde_yaml::to_string(value).map_err(ApiError::internal)?;
    fs::write(path, text).map_err(ApiError::internal)
}

/// Mappings merge key by key; anything else in `top` replaces `base`.
fn overlay(base: &Value, top: &Value) -> Value {
    let (Value::Object(base_map), Value::Object(top_map)) = (base, top) else {
        return top.clone();
    };
    let mut merged = base_map.clone();
    for (key, value) in top_map {
        let next = match merged.get(key) {
            Some(existing) => overlay(existing, value),
            None => value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    Value::Object(merged)
}

fn mask(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| {
                    let shown = if is_secret_key(key) && !val.is_null() {
                        Value::String(MASK.to_string())
                    } else {
                        mask(val)
                    };
                    (key.clone(), shown)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(mask).collect()),
        other => other.clone(),
    }
}

/// Puts stored values back wherever the client echoed [`MASK`]. A masked
/// key with nothing stored behind it is dropped.
fn unmask(incoming: &Value, stored: &Value) -> Value {
    match incoming {
        Value::Object(map) => {
            let mut restored = Map::new();
            for (key, value) in map {
                let previous = stored.get(key);
                if value.as_str() == Some(MASK) {
                    if let Some(previous) = previous {
                        restored.insert(key.clone(), previous.clone());
                    }
                } else {
                    restored.insert(key.clone(), unmask(value, previous.unwrap_or(&Value::Null)));
                }
            }
            Value::Object(restored)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .filter_map(|(idx, item)| {
                    let previous = stored.get(idx);
                    if item.as_str() == Some(MASK) {
                        previous.cloned()
                    } else {
                        Some(unmask(item, previous.unwrap_or(&Value::Null)))
                    }
                })
                .collect(),
        ),
        other => other.clone(),
    }
}
