use std::borrow::Borrow;
use std::fmt::{Display, Formatter};

use wallclock_etc::{ClockConfig, ConfigError};

use crate::{Result, TsnError};

/// Name of a wall clock, also used as the database name of its authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockName(String);

impl ClockName {
    /// Longest accepted name, matching the PostgreSQL identifier limit.
    pub const MAX_LEN: usize = 63;

    pub fn parse<S>(name: S) -> Result<Self>
    where
        S: Into<String>,
    {
        let name = name.into();

        if name.is_empty() {
            return Err(TsnError::InvalidName(name, "empty".into()));
        }
        if name.len() > Self::MAX_LEN {
            return Err(TsnError::InvalidName(
                name,
                format!("longer than {} bytes", Self::MAX_LEN).into(),
            ));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TsnError::InvalidName(
                name,
                "contains whitespace or control characters".into(),
            ));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ClockName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClockName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ClockName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Connection-target template, eg: `postgres://clock@localhost/$database$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    placeholder: String,
}

impl Template {
    pub fn new<A, B>(raw: A, placeholder: B) -> Result<Self>
    where
        A: Into<String>,
        B: Into<String>,
    {
        let raw = raw.into();
        let placeholder = placeholder.into();

        if placeholder.is_empty() {
            return Err(ConfigError::Invalid("placeholder".into()).into());
        }
        if !raw.contains(&placeholder) {
            return Err(ConfigError::MissingPlaceholder(placeholder).into());
        }

        Ok(Self { raw, placeholder })
    }

    pub fn from_config(c: &ClockConfig) -> Result<Self> {
        Self::new(c.template()?, Clone::clone(&c.placeholder))
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Substitutes `name` for the first occurrence of the placeholder.
    pub fn render(&self, name: &ClockName) -> Result<String> {
        if name.as_str().contains(&self.placeholder) {
            return Err(TsnError::InvalidName(
                name.to_string(),
                "contains the template placeholder".into(),
            ));
        }

        let target = self.raw.replacen(&self.placeholder, name.as_str(), 1);
        debug!("derive connection target of wall clock '{}'", name);

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use wallclock_etc::DEFAULT_PLACEHOLDER;

    use super::*;

    fn init() {
        pretty_env_logger::try_init_timed().ok();
    }

    #[test]
    fn test_clock_name() {
        init();

        assert!(ClockName::parse("rainer").is_ok());
        assert!(ClockName::parse("clock_01-eu").is_ok());
        assert!(ClockName::parse("x".repeat(ClockName::MAX_LEN)).is_ok());

        for bad in [
            String::new(),
            "x".repeat(ClockName::MAX_LEN + 1),
            "two words".into(),
            "tab\tname".into(),
            "nul\0".into(),
        ] {
            assert!(
                matches!(ClockName::parse(Clone::clone(&bad)), Err(TsnError::InvalidName(..))),
                "'{}' should be rejected",
                bad.escape_debug()
            );
        }
    }

    #[test]
    fn test_render() -> anyhow::Result<()> {
        init();

        let t = Template::new("host=db user=clock dbname=$database$", DEFAULT_PLACEHOLDER)?;
        let name = ClockName::parse("rainer")?;
        assert_eq!("host=db user=clock dbname=rainer", t.render(&name)?);

        // only the first occurrence is replaced
        let t = Template::new("dbname=$database$ application_name=$database$", "$database$")?;
        assert_eq!(
            "dbname=rainer application_name=$database$",
            t.render(&name)?
        );

        let sneaky = ClockName::parse("a$database$")?;
        assert!(matches!(t.render(&sneaky), Err(TsnError::InvalidName(..))));

        Ok(())
    }

    #[test]
    fn test_template_errors() {
        init();

        assert!(matches!(
            Template::new("dbname=clocks", DEFAULT_PLACEHOLDER),
            Err(TsnError::ConfigurationError(ConfigError::MissingPlaceholder(_)))
        ));
        assert!(matches!(
            Template::new("dbname=clocks", ""),
            Err(TsnError::ConfigurationError(ConfigError::Invalid(_)))
        ));
        assert!(matches!(
            Template::from_config(&ClockConfig::default()),
            Err(TsnError::ConfigurationError(ConfigError::MissingTemplate))
        ));
    }
}
