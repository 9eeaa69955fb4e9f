//! Error types for the command line front end.
//!
//! Wraps [`crate::bundler::Error`] with CLI and manifest failures and maps
//! each to a process exit code.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Exit code for a run the operator aborted at a prompt or interrupted.
pub const EXIT_ABORTED: i32 = 2;

/// Exit code for an installer the notary service rejected.
pub const EXIT_REJECTED: i32 = 3;

/// Main error type for all CLI operations
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// Packaging errors
    #[error("Bundler error: {0}")]
    Bundler(#[from] crate::bundler::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl BundlerError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Bundler(crate::bundler::Error::Aborted(_) | crate::bundler::Error::Cancelled) => {
                EXIT_ABORTED
            }
            _ => 1,
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        use crate::bundler::Error as E;
        match self {
            Self::Bundler(E::CommandSpawn { .. }) => vec![
                "Install the Xcode command line tools: xcode-select --install".to_string(),
                "Install PyInstaller in the active Python environment: pip install pyinstaller".to_string(),
            ],
            Self::Bundler(E::VersionLengthMismatch { .. }) => vec![
                "Use the same number of version components as the last build, or remove the version lock file".to_string(),
            ],
            Self::Bundler(E::NotarizationTimeout { request_id, .. }) => vec![format!(
                "Check the submission later with: xcrun notarytool info {}",
                request_id
            )],
            Self::Cli(CliError::MissingArgument { argument }) => {
                vec![format!("Pass --{} or set it in macapp.toml", argument)]
            }
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
