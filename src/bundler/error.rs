//! Error types for packaging operations.
//!
//! Every lifecycle step returns [`Result`] so a failed build or signing step
//! cannot be chained past silently.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for packaging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring, building, signing or notarizing.
#[derive(Error, Debug)]
pub enum Error {
    /// Free-form failure.
    #[error("{0}")]
    GenericError(String),

    /// Plain IO failure.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// IO failure with the operation and path that caused it.
    #[error("{context} ({}): {source}", path.display())]
    Fs {
        /// What was being attempted.
        context: String,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Missing or invalid required file, directory or parameter.
    #[error("configuration error: {0}")]
    Config(String),

    /// An operation was called before its lifecycle precondition held.
    #[error("invalid state: {operation} requires {required}, current state is {current}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the operation needs.
        required: &'static str,
        /// State the object is in.
        current: String,
    },

    /// The external tool could not be started at all.
    #[error("failed to execute `{command}`: {source}")]
    CommandSpawn {
        /// Audit line of the command.
        command: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The external tool ran and exited unsuccessfully.
    #[error("`{command}` exited with {}: {stderr}", status.map(|c| c.to_string()).unwrap_or_else(|| "signal".into()))]
    CommandFailed {
        /// Audit line of the command.
        command: String,
        /// Exit code, `None` when killed by a signal.
        status: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },

    /// The spec generator ran but never confirmed writing a spec file.
    #[error("pyi-makespec did not report a written spec file: {0}")]
    SpecNotWritten(String),

    /// A version string is not a dot-separated list of non-negative integers.
    #[error("invalid version `{0}`")]
    VersionParse(String),

    /// Two versions with a different number of components were compared.
    #[error("version length mismatch: {current} has {current_len} components, last-built {last} has {last_len}")]
    VersionLengthMismatch {
        /// Version being locked.
        current: String,
        /// Components in the current version.
        current_len: usize,
        /// Stored version.
        last: String,
        /// Components in the stored version.
        last_len: usize,
    },

    /// The operator declined an interactive confirmation.
    #[error("aborted by user: {0}")]
    Aborted(String),

    /// The notary service did not reach a terminal status in time.
    #[error("notarization request {request_id} still pending after {attempts} status checks")]
    NotarizationTimeout {
        /// Submission id.
        request_id: String,
        /// Number of status checks performed.
        attempts: u32,
    },

    /// Polling was cancelled by the caller.
    #[error("notarization polling cancelled")]
    Cancelled,

    /// Property list read/write failure.
    #[error("plist error: {0}")]
    Plist(#[from] plist::Error),

    /// Validation pattern failed to compile.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    /// TOML decode failure.
    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML encode failure.
    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Template rendering failure.
    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// Directory walk failure.
    #[error("walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

/// Attaches filesystem context to IO results.
pub trait ErrorExt<T> {
    /// Wraps an IO error with the attempted operation and path.
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| Error::Fs {
            context: context.to_string(),
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

/// Adds context to failed results and missing options.
pub trait Context<T> {
    /// Prefixes the error message with `context`.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display;

    /// Prefixes the error message with `f()`.
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display,
        F: FnOnce() -> C;
}

impl<T, E> Context<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display,
    {
        self.with_context(|| context)
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::GenericError(format!("{}: {}", f(), e.into())))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Returns early with a [`Error::GenericError`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_context_keeps_path_and_operation() {
        let err = std::fs::read("/definitely/not/here")
            .fs_context("reading fixture", "/definitely/not/here")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("reading fixture (/definitely/not/here)"));
    }

    #[test]
    fn command_failed_shows_signal_when_no_code() {
        let err = Error::CommandFailed {
            command: "codesign".into(),
            status: None,
            stderr: "killed".into(),
        };
        assert_eq!(err.to_string(), "`codesign` exited with signal: killed");
    }

    #[test]
    fn with_context_prefixes_message() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("boom"));
        let err = res.with_context(|| "copying script").unwrap_err();
        assert_eq!(err.to_string(), "copying script: IO error: boom");
    }

    #[test]
    fn context_on_missing_option() {
        let missing: Option<u8> = None;
        let err = missing.context("entry is required").unwrap_err();
        assert!(matches!(err, Error::GenericError(ref m) if m == "entry is required"));
    }
}
