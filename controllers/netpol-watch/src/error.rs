//! Controller-specific error types.
//!
//! This module defines error types specific to the NetworkPolicy watch
//! controller that are not covered by upstream library errors.

use kube::Error as KubeError;
use thiserror::Error;
use watch_relay::RelayError;

/// Errors that can occur in the NetworkPolicy watch controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// A relay stopped with a fatal error
    #[error("Watch relay error: {0}")]
    Relay(#[from] RelayError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
