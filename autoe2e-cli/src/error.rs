//! CLI-specific error types and exit code mapping

use autoe2e_core::error::{AutoE2eError, ConfigError};
use autoe2e_environment::EnvironmentError;
use autoe2e_readiness::ReadinessError;

/// CLI-specific error type.
///
/// Run outcomes (test failures, environment failures) are not errors; they
/// travel as exit codes. `CliError` covers everything that prevents a
/// command from producing an outcome at all.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Spec file loading or validation failure, or an invalid flag value.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Environment backend failure (docker unreachable, command not spawnable).
    #[error("environment error: {0}")]
    Environment(#[from] EnvironmentError),

    /// Health probe construction failure.
    #[error("readiness error: {0}")]
    Readiness(#[from] ReadinessError),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, artifacts directory, ...).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                     |
    /// |------|-----------------------------|
    /// | 1    | General / command error     |
    /// | 2    | Configuration error         |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Command(_)
            | Self::Environment(_)
            | Self::Readiness(_)
            | Self::JsonSerialize(_)
            | Self::Io(_) => 1,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<AutoE2eError> for CliError {
    fn from(e: AutoE2eError) -> Self {
        match e {
            AutoE2eError::Config(inner) => Self::Config(inner.to_string()),
            AutoE2eError::Io(inner) => Self::Io(inner),
            other => Self::Command(other.to_string()),
        }
    }
}
