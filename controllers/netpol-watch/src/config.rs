//! Controller configuration.
//!
//! Read once from environment variables at start-up.

use crate::error::ControllerError;
use std::env;

/// Default capacity of each relay's event channel
const DEFAULT_BUFFER_SIZE: usize = 64;

/// The API server rejects watch timeouts of 295 seconds or more
const MAX_WATCH_TIMEOUT_SECS: u32 = 294;

/// Runtime configuration for the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Namespace for the policy and pod relays (`None` = all namespaces)
    pub namespace: Option<String>,
    /// Node whose pods the pod relay observes
    pub node_name: String,
    /// Capacity of each event channel
    pub buffer_size: usize,
    /// Server-side timeout applied to every watch subscription
    pub watch_timeout_secs: Option<u32>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// | Variable | Required | Default |
    /// |---|---|---|
    /// | `NODE_NAME` | yes | |
    /// | `WATCH_NAMESPACE` | no | all namespaces |
    /// | `RELAY_BUFFER_SIZE` | no | 64 |
    /// | `WATCH_TIMEOUT_SECONDS` | no | server default |
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let node_name = lookup("NODE_NAME")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                ControllerError::InvalidConfig(
                    "NODE_NAME environment variable is required".to_string(),
                )
            })?;

        let namespace = lookup("WATCH_NAMESPACE").filter(|v| !v.trim().is_empty());

        let buffer_size = match lookup("RELAY_BUFFER_SIZE") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) | Err(_) => {
                    return Err(ControllerError::InvalidConfig(format!(
                        "RELAY_BUFFER_SIZE must be a positive integer, got '{raw}'"
                    )));
                }
                Ok(size) => size,
            },
            None => DEFAULT_BUFFER_SIZE,
        };

        let watch_timeout_secs = match lookup("WATCH_TIMEOUT_SECONDS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(secs) if (1..=MAX_WATCH_TIMEOUT_SECS).contains(&secs) => Some(secs),
                _ => {
                    return Err(ControllerError::InvalidConfig(format!(
                        "WATCH_TIMEOUT_SECONDS must be between 1 and {MAX_WATCH_TIMEOUT_SECS}, got '{raw}'"
                    )));
                }
            },
            None => None,
        };

        Ok(Self {
            namespace,
            node_name,
            buffer_size,
            watch_timeout_secs,
        })
    }
}
