use crate::naming::NamingConvention;
use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};

pub const DEFAULT_URL_PREFIX: &str = "Endpoints";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(100);

/// Immutable serialization settings, built once and passed to every call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SerializerOptions {
    pub naming: NamingConvention,
}

impl SerializerOptions {
    /// The on-the-wire key for a parameter.
    pub fn wire_name(&self, parameter: &str) -> String {
        self.naming.apply(parameter).into_owned()
    }
}

/// Per-call dispatch configuration.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub url_prefix: String,
    pub timeout: Duration,
    pub headers: BTreeMap<String, String>,
    pub serializer: SerializerOptions,
    pub raise_on_error: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            url_prefix: DEFAULT_URL_PREFIX.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            headers: BTreeMap::new(),
            serializer: SerializerOptions::default(),
            raise_on_error: true,
        }
    }
}

impl DispatchOptions {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn raise_on_error(mut self, raise: bool) -> Self {
        self.raise_on_error = raise;
        self
    }

    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    /// Reads the optional `[envoke]` section. A missing section yields the defaults.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        match config.get::<OptionsSection>("envoke") {
            Ok(section) => Ok(section.into()),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OptionsSection {
    url_prefix: String,
    timeout_secs: u64,
    raise_on_error: bool,
    naming: NamingConvention,
    headers: BTreeMap<String, String>,
}

impl Default for OptionsSection {
    fn default() -> Self {
        Self {
            url_prefix: DEFAULT_URL_PREFIX.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            raise_on_error: true,
            naming: NamingConvention::default(),
            headers: BTreeMap::new(),
        }
    }
}

impl From<OptionsSection> for DispatchOptions {
    fn from(section: OptionsSection) -> Self {
        Self {
            url_prefix: section.url_prefix,
            timeout: Duration::from_secs(section.timeout_secs),
            headers: section.headers,
            serializer: SerializerOptions {
                naming: section.naming,
            },
            raise_on_error: section.raise_on_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    #[test]
    fn defaults() {
        let options = DispatchOptions::default();
        assert_eq!(options.url_prefix, "Endpoints");
        assert_eq!(options.timeout, Duration::from_secs(100));
        assert!(options.headers.is_empty());
        assert_eq!(options.serializer.naming, NamingConvention::CamelCase);
        assert!(options.raise_on_error);
    }

    #[test]
    fn missing_section_is_default() {
        let config = Config::builder().build().unwrap();
        let options = DispatchOptions::from_config(&config).unwrap();
        assert_eq!(options.timeout, DEFAULT_TIMEOUT);
        assert!(options.raise_on_error);
    }

    #[test]
    fn section_overrides() {
        let toml = r#"
            [envoke]
            timeout_secs = 5
            raise_on_error = false
            naming = "snake_case"
        "#;
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap();
        let options = DispatchOptions::from_config(&config).unwrap();
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert!(!options.raise_on_error);
        assert_eq!(options.serializer.naming, NamingConvention::SnakeCase);
        assert_eq!(options.url_prefix, DEFAULT_URL_PREFIX);
    }
}
