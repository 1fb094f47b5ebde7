// Runtime settings for the event store, read from the environment.
//
// Responsibilities
// - Provide defaults that match the store's expected behavior.
// - Reject values that would make recovery loop or skip records.

use thiserror::Error;

pub const RECOVERY_PAGE_SIZE_VAR: &str = "EVENT_STORE_RECOVERY_PAGE_SIZE";
pub const DEFAULT_RECOVERY_PAGE_SIZE: usize = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidPageSize { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventStoreConfig {
    pub recovery_page_size: usize,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            recovery_page_size: DEFAULT_RECOVERY_PAGE_SIZE,
        }
    }
}

impl EventStoreConfig {
    /// Rejects settings that would make recovery skip the log.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recovery_page_size == 0 {
            return Err(ConfigError::InvalidPageSize {
                name: RECOVERY_PAGE_SIZE_VAR,
                value: self.recovery_page_size.to_string(),
            });
        }
        Ok(())
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(RECOVERY_PAGE_SIZE_VAR) {
            config.recovery_page_size = match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(ConfigError::InvalidPageSize {
                        name: RECOVERY_PAGE_SIZE_VAR,
                        value: raw,
                    });
                }
            };
        }
        Ok(config)
    }
}
