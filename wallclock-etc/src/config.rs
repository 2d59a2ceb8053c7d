use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable holding the connection-target template.
pub const ENV_TEMPLATE: &str = "WALLCLOCK_DB";

pub const DEFAULT_PLACEHOLDER: &str = "$database$";
pub const DEFAULT_STATEMENT: &str = "select clock.new_tsn()";
pub const DEFAULT_PROBE: &str = "select 1";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("no connection template configured (set '{}' or 'template')", ENV_TEMPLATE)]
    MissingTemplate,

    #[error("connection template does not contain placeholder '{0}'")]
    MissingPlaceholder(String),

    #[error("invalid configuration '{0}'")]
    Invalid(String),

    #[error("duration '{0}' must be a whole number of milliseconds")]
    SubMillisecond(/* property */ String),

    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_yaml::Error),
}

/// Settings shared by every clock of a registry.
///
/// The `template` is turned into a concrete connection target per clock by
/// substituting the clock name for the first `placeholder`, eg:
/// `host=localhost user=clock dbname=$database$`.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ClockConfig {
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default = "default_statement")]
    pub statement: String,
    #[serde(default = "default_probe")]
    pub probe: String,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default, with = "option_duration")]
    pub connect_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct PoolConfig {
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(default, with = "option_duration")]
    pub wait_timeout: Option<Duration>,
    #[serde(default, with = "option_duration")]
    pub create_timeout: Option<Duration>,
    #[serde(default, with = "option_duration")]
    pub recycle_timeout: Option<Duration>,
}

impl PoolConfig {
    pub const MAX_SIZE: usize = 16;
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: PoolConfig::MAX_SIZE,
            wait_timeout: None,
            create_timeout: None,
            recycle_timeout: None,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            template: None,
            placeholder: default_placeholder(),
            statement: default_statement(),
            probe: default_probe(),
            pool: Default::default(),
            connect_timeout: None,
        }
    }
}

impl ClockConfig {
    pub fn with_template<S>(template: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            template: Some(template.into()),
            ..Default::default()
        }
    }

    /// Builds a configuration whose template comes from `WALLCLOCK_DB`.
    pub fn from_env() -> Self {
        Self::default().or_template(std::env::var(ENV_TEMPLATE).ok())
    }

    /// Parses YAML; a missing `template` falls back to `WALLCLOCK_DB`.
    pub fn from_yaml(b: &[u8]) -> Result<Self, ConfigError> {
        let c = serde_yaml::from_slice::<ClockConfig>(b)?;
        Ok(c.or_template(std::env::var(ENV_TEMPLATE).ok()))
    }

    pub fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let b = std::fs::read(path)?;
        debug!("load clock configuration from {}", path.display());
        Self::from_yaml(&b[..])
    }

    /// Fills the template only when none is configured yet.
    pub fn or_template(mut self, template: Option<String>) -> Self {
        if self.template.is_none() {
            self.template = template.filter(|it| !it.trim().is_empty());
        }
        self
    }

    pub fn template(&self) -> Result<&str, ConfigError> {
        self.template.as_deref().ok_or(ConfigError::MissingTemplate)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.placeholder.is_empty() {
            return Err(ConfigError::Invalid("placeholder".into()));
        }
        if self.statement.trim().is_empty() {
            return Err(ConfigError::Invalid("statement".into()));
        }
        if self.pool.max_size == 0 {
            return Err(ConfigError::Invalid("pool.max_size".into()));
        }

        for (k, v) in [
            ("connect_timeout", self.connect_timeout),
            ("pool.wait_timeout", self.pool.wait_timeout),
            ("pool.create_timeout", self.pool.create_timeout),
            ("pool.recycle_timeout", self.pool.recycle_timeout),
        ] {
            if v.is_some_and(|d| d.subsec_nanos() % 1_000_000 != 0) {
                return Err(ConfigError::SubMillisecond(k.into()));
            }
        }

        let template = self.template()?;
        if !template.contains(&self.placeholder) {
            return Err(ConfigError::MissingPlaceholder(Clone::clone(
                &self.placeholder,
            )));
        }

        Ok(())
    }
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

fn default_statement() -> String {
    DEFAULT_STATEMENT.to_string()
}

fn default_probe() -> String {
    DEFAULT_PROBE.to_string()
}

fn default_max_size() -> usize {
    PoolConfig::MAX_SIZE
}

/// Durations are written as strings like `500ms` or `3s`, with millisecond
/// precision which `ClockConfig::validate` enforces.
mod option_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match d {
            Some(d) => s.serialize_str(&format!("{}ms", d.as_millis())),
            None => s.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D>(d: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(s) => duration_str::parse_std(&s)
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("invalid duration '{}': {}", s, e))),
        }
    }
}
