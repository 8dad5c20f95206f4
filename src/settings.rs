//! Where base URLs come from.
//!
//! Lookups use `"{prefix}:{service}"` keys, e.g. `Endpoints:Weather`, and are
//! case-insensitive.

use config::{Config, ConfigError, Environment, File};
use std::{collections::HashMap, path::Path};

pub trait Configuration: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl Configuration for Config {
    fn get(&self, key: &str) -> Option<String> {
        let path = key.replace(':', ".");
        self.get_string(&path)
            .or_else(|_| self.get_string(&path.to_lowercase()))
            .ok()
    }
}

/// In-memory configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    values: HashMap<String, String>,
}

impl StaticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_lowercase(), value.into());
        self
    }
}

impl Configuration for StaticConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(&key.to_lowercase()).cloned()
    }
}

/// Layers an optional TOML file under `ENVOKE__*` environment variables.
///
/// `ENVOKE__ENDPOINTS__WEATHER=https://...` sets `Endpoints:Weather`.
pub fn load_settings(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(false));
    }
    builder
        .add_source(Environment::with_prefix("ENVOKE").separator("__"))
        .build()
}
