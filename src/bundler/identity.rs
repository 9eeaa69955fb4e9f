//! Signing identity discovery from the local keychain.
//!
//! Runs `security find-identity -p basic -v` and picks the hash of the first
//! line that carries the role's label. Later identities of the same role are
//! ignored.

use crate::bundler::{
    command::{CommandRunner, ToolCommand},
    error::Result,
};
use std::fmt;

/// Which Developer ID certificate a hash belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize)]
pub enum SigningRole {
    /// Signs `.app` bundles (`codesign`).
    Application,
    /// Signs installer packages (`productsign`).
    Installer,
}

impl SigningRole {
    /// Label searched for in the identity listing.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Application => "Developer ID Application",
            Self::Installer => "Developer ID Installer",
        }
    }
}

impl fmt::Display for SigningRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// A keychain credential used for signing.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct SigningIdentity {
    /// Role of the certificate.
    pub role: SigningRole,
    /// SHA-1 hash `codesign`/`productsign` accept as `--sign`.
    pub hash: String,
}

impl SigningIdentity {
    /// Identity from an explicitly supplied hash.
    pub fn new(role: SigningRole, hash: impl Into<String>) -> Self {
        Self {
            role,
            hash: hash.into(),
        }
    }
}

/// Command that enumerates valid signing identities.
pub fn find_identity_command() -> ToolCommand {
    ToolCommand::new("security").args(["find-identity", "-p", "basic", "-v"])
}

/// Extracts the first identity of `role` from a `find-identity` listing.
///
/// The hash is the second whitespace-delimited token of the matching line,
/// e.g. `  1) ABCD1234... "Developer ID Application: Jane (TEAMID)"`.
pub fn parse_identity(listing: &str, role: SigningRole) -> Option<SigningIdentity> {
    listing
        .lines()
        .find(|line| line.contains(role.marker()))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(|hash| SigningIdentity::new(role, hash))
}

/// Resolves the first identity of `role` installed on this machine.
///
/// Returns `Ok(None)` when the listing has no such identity or the
/// enumeration itself reported an error.
pub async fn resolve_identity<R: CommandRunner>(
    runner: &R,
    role: SigningRole,
) -> Result<Option<SigningIdentity>> {
    let output = runner.run(&find_identity_command()).await?;
    if !output.success() || !output.stderr.trim().is_empty() {
        log::debug!("an error occurred: {}", output.stderr.trim());
        return Ok(None);
    }

    let identity = parse_identity(&output.stdout, role);
    match &identity {
        Some(id) => log::debug!("found {} identity {}", role, id.hash),
        None => log::warn!("no '{}' identity found in the keychain", role),
    }
    Ok(identity)
}

/// Resolves both roles from a single enumeration.
pub async fn resolve_all<R: CommandRunner>(
    runner: &R,
) -> Result<(Option<SigningIdentity>, Option<SigningIdentity>)> {
    let output = runner.run(&find_identity_command()).await?.check()?;
    Ok((
        parse_identity(&output.stdout, SigningRole::Application),
        parse_identity(&output.stdout, SigningRole::Installer),
    ))
}
