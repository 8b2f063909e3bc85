//! Build workflow error types

use reefbuild_client::{ApplicationStatus, ClientError};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors, fatal before any network call.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Invalid {field}: cannot parse duration '{value}'")]
    InvalidDuration { field: &'static str, value: String },

    #[error("Invalid label version format '{0}': expected an integer")]
    InvalidVersion(String),
}

/// Errors produced by the build workflow.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ClientError),

    /// A step needed something an earlier step should have stored.
    #[error("{0} not available in build state")]
    StateMissing(&'static str),

    #[error("{what} timeout reached after {after:?}")]
    Timeout { what: &'static str, after: Duration },

    #[error("{what} retry limit exceeded ({attempts} attempts)")]
    RetriesExceeded { what: &'static str, attempts: u32 },

    #[error("No labels found with name '{0}'")]
    LabelNotFound(String),

    #[error("Label '{name}' version {version} not found")]
    LabelVersionNotFound { name: String, version: i64 },

    #[error("Label '{0}' has no definitions")]
    LabelHasNoDefinitions(String),

    #[error("Application failed with status {status}: {description}")]
    AllocationFailed {
        status: ApplicationStatus,
        description: String,
    },

    #[error("Image capture task failed: {0}")]
    ImageTaskFailed(String),

    #[error("Provisioning hook failed: {0}")]
    Hook(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BuildError>;
