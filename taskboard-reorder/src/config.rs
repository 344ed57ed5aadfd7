//! Engine configuration.
//!
//! Sources are merged in precedence order, later ones winning:
//! 1. Built-in defaults
//! 2. An optional config file (`.toml`, `.yaml`/`.yml` or `.json`)
//! 3. Environment variables prefixed `TASKBOARD_REORDER_`

use crate::error::{ReorderError, Result};
use crate::geometry::Axis;
use crate::types::{OrderKeySpace, DEFAULT_MAX_KEY_LEN, MIN_MAX_KEY_LEN};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "TASKBOARD_REORDER_";

/// Tunables for the reordering engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderConfig {
    /// Longest order key generated before the list is renumbered
    pub max_key_len: usize,
    /// Direction items flow within a list
    pub axis: Axis,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            max_key_len: DEFAULT_MAX_KEY_LEN,
            axis: Axis::default(),
        }
    }
}

impl ReorderConfig {
    /// Defaults overlaid with environment variables
    pub fn load() -> Result<Self> {
        Self::extract(Self::figment())
    }

    /// Defaults, then `path`, then environment variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Figment::from(Toml::file(path)),
            Some("yaml" | "yml") => Figment::from(Yaml::file(path)),
            Some("json") => Figment::from(Json::file(path)),
            _ => {
                return Err(ReorderError::invalid_config(
                    "path",
                    format!("unsupported config format: {}", path.display()),
                ))
            }
        };
        debug!(path = %path.display(), "loading reorder config file");

        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(file)
            .merge(Self::env());
        Self::extract(figment)
    }

    /// Defaults and environment, for callers that layer their own sources
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Self::env())
    }

    /// Key space sized by `max_key_len`
    pub fn key_space(&self) -> OrderKeySpace {
        OrderKeySpace::new(self.max_key_len)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_key_len < MIN_MAX_KEY_LEN {
            return Err(ReorderError::invalid_config(
                "max_key_len",
                format!("must be at least {MIN_MAX_KEY_LEN}, got {}", self.max_key_len),
            ));
        }
        Ok(())
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into())
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        debug!(max_key_len = config.max_key_len, axis = ?config.axis, "reorder config loaded");
        Ok(config)
    }
}
