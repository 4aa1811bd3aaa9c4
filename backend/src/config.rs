use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Where the persistent store lives.
///
/// | Env Var           | Default                    |
/// |-------------------|----------------------------|
/// | `REDIS_URL`       | `redis://127.0.0.1:6379`   |
/// | `TODO_KEY_PREFIX` | `todo`                     |
///
/// The prefix ends up in `KEYS` patterns, so it must be non-empty and free
/// of glob metacharacters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub redis_url: String,
    pub key_prefix: String,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let key_prefix = lookup("TODO_KEY_PREFIX").unwrap_or_else(|| "todo".into());
        if key_prefix.is_empty() || key_prefix.contains(['*', '?', '[', ']', '\\']) {
            return Err(ConfigError::Invalid {
                name: "TODO_KEY_PREFIX",
                expected: "a non-empty prefix without glob characters",
                value: key_prefix,
            });
        }
        Ok(Self {
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".into()),
            key_prefix,
        })
    }
}

/// Widget refresh schedule. `WIDGET_REFRESH_SECS` defaults to one hour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub refresh_interval: Duration,
}

impl WidgetConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secs = match lookup("WIDGET_REFRESH_SECS") {
            None => 3600,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "WIDGET_REFRESH_SECS",
                        expected: "a positive number of seconds",
                        value: raw,
                    })
                }
            },
        };
        Ok(Self {
            refresh_interval: Duration::from_secs(secs),
        })
    }
}
