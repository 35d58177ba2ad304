use std::collections::HashMap;
use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_path: String,
    pub view_payload_max_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "VITAE_API_BIND_ADDR", "127.0.0.1:8080");
        let database_path = value_or_default(&lookup, "VITAE_DATABASE_PATH", "vitae.db");

        let view_payload_max_bytes = value_or_default(&lookup, "VIEW_PAYLOAD_MAX_BYTES", "16384")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "VIEW_PAYLOAD_MAX_BYTES must be an integer in [256, 1048576]".to_string(),
                )
            })?;
        if !(256..=1_048_576).contains(&view_payload_max_bytes) {
            return Err(ConfigError::Invalid(
                "VIEW_PAYLOAD_MAX_BYTES must be in [256, 1048576]".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            database_path,
            view_payload_max_bytes,
        })
    }

    pub fn uses_in_memory_database(&self) -> bool {
        self.database_path == ":memory:"
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
