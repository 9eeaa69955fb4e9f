//! Notary service commands and output parsing.
//!
//! Submissions go through `xcrun notarytool`; status output from the legacy
//! `altool` (`Status Message: Package Approved`) is still recognised so older
//! logs and wrappers keep working.

use crate::bundler::{
    command::ToolCommand,
    error::{Error, Result},
};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// Apple developer account used for notarization.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Apple ID email.
    pub apple_id: String,
    /// App-specific password.
    pub password: String,
    /// Developer team id.
    pub team_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("apple_id", &self.apple_id)
            .field("password", &"******")
            .field("team_id", &self.team_id)
            .finish()
    }
}

impl Credentials {
    fn auth_args(&self, cmd: ToolCommand) -> ToolCommand {
        cmd.arg("--apple-id")
            .arg(self.apple_id.as_str())
            .arg("--password")
            .secret_arg(self.password.as_str())
            .arg("--team-id")
            .arg(self.team_id.as_str())
    }
}

/// Where a submission stands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
pub enum NotarizationStatus {
    /// Uploaded, no verdict yet.
    Submitted,
    /// Rejected; the notary log explains why.
    Invalid,
    /// Accepted; ready to staple.
    Approved,
}

impl NotarizationStatus {
    /// Reads the verdict from status-check output, `Submitted` if none yet.
    pub fn from_output(output: &str) -> Self {
        for line in output.lines() {
            let line = line.trim();
            if line.contains("Package Invalid")
                || line.contains("status: Invalid")
                || line.contains("status: Rejected")
            {
                return Self::Invalid;
            }
            if line.contains("Package Approved") || line.contains("status: Accepted") {
                return Self::Approved;
            }
        }
        Self::Submitted
    }

    /// Whether polling can stop.
    pub fn is_terminal(self) -> bool {
        self != Self::Submitted
    }
}

/// An upload to the notary service.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct NotarizationRequest {
    /// Submission id reported by the service.
    pub id: Uuid,
    /// Latest known status.
    pub status: NotarizationStatus,
}

/// How [`Package::wait`](super::Package::wait) polls.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    /// Delay between status checks.
    pub interval: Duration,
    /// Status checks before giving up.
    pub max_attempts: u32,
    /// Delay before fetching the log of a rejected submission.
    pub grace_delay: Duration,
}

/// Consecutive failed status checks tolerated before the poll gives up.
pub const MAX_CONSECUTIVE_CHECK_FAILURES: u32 = 3;

impl PollPolicy {
    /// Rejects policies that would never check or would spin without pausing.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Config("notary max_attempts must be at least 1".into()));
        }
        if self.interval.is_zero() {
            return Err(Error::Config("notary poll interval must be at least 1 second".into()));
        }
        Ok(())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(20),
            max_attempts: 180,
            grace_delay: Duration::from_secs(10),
        }
    }
}

/// Final result of a polled submission.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum NotarizationOutcome {
    /// Accepted and stapled.
    Approved,
    /// Rejected, with the full notary log.
    Invalid {
        /// `notarytool log` output.
        log: String,
    },
}

/// Extracts the submission id from `notarytool submit` (`  id: <uuid>`) or
/// `altool --notarize-app` (`RequestUUID = <uuid>`) output.
pub fn parse_submission_id(output: &str) -> Option<Uuid> {
    output.lines().find_map(|line| {
        let line = line.trim();
        let value = line
            .strip_prefix("id:")
            .or_else(|| line.strip_prefix("RequestUUID").and_then(|r| r.trim().strip_prefix('=')))?;
        Uuid::parse_str(value.trim()).ok()
    })
}

/// `xcrun notarytool submit`.
pub fn submit_command(credentials: &Credentials, package: &Path) -> ToolCommand {
    credentials
        .auth_args(ToolCommand::new("xcrun").args(["notarytool", "submit"]))
        .path_arg(package)
}

/// `xcrun notarytool info <id>`.
pub fn info_command(credentials: &Credentials, id: &Uuid) -> ToolCommand {
    credentials.auth_args(
        ToolCommand::new("xcrun")
            .args(["notarytool", "info"])
            .arg(id.to_string()),
    )
}

/// `xcrun notarytool log <id>`.
pub fn log_command(credentials: &Credentials, id: &Uuid) -> ToolCommand {
    credentials.auth_args(
        ToolCommand::new("xcrun")
            .args(["notarytool", "log"])
            .arg(id.to_string()),
    )
}

/// `xcrun stapler staple <package>`.
pub fn staple_command(package: &Path) -> ToolCommand {
    ToolCommand::new("xcrun")
        .args(["stapler", "staple"])
        .path_arg(package)
}
