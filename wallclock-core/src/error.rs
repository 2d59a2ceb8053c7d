use std::borrow::Cow;

use wallclock_etc::ConfigError;

#[derive(thiserror::Error, Debug)]
pub enum TsnError {
    #[error("invalid clock name '{0}': {1}")]
    InvalidName(/* name */ String, /* reason */ Cow<'static, str>),

    #[error("invalid configuration: {0}")]
    ConfigurationError(#[from] ConfigError),

    #[error("wall clock '{0}' is unavailable: {1}")]
    ResourceUnavailable(/* name */ String, anyhow::Error),

    #[error("cannot issue tsn from wall clock '{0}': {1}")]
    IssueFailed(/* name */ String, anyhow::Error),

    #[error("cannot create wall clock '{0}'")]
    ClockUnavailable(/* name */ String),

    #[error("error while reading tsn from wall clock '{0}'")]
    TsnUnavailable(/* name */ String),
}

impl TsnError {
    /// Clock name the error refers to, if any.
    pub fn clock(&self) -> Option<&str> {
        match self {
            TsnError::InvalidName(name, _)
            | TsnError::ResourceUnavailable(name, _)
            | TsnError::IssueFailed(name, _)
            | TsnError::ClockUnavailable(name)
            | TsnError::TsnUnavailable(name) => Some(name),
            TsnError::ConfigurationError(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = TsnError::ResourceUnavailable("rainer".into(), anyhow!("connection refused"));
        assert_eq!(
            "wall clock 'rainer' is unavailable: connection refused",
            e.to_string()
        );
        assert_eq!(Some("rainer"), e.clock());

        let e = TsnError::from(ConfigError::MissingTemplate);
        assert!(matches!(e, TsnError::ConfigurationError(_)));
        assert!(e.clock().is_none());
    }
}
