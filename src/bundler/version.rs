//! Monotonic version guard.
//!
//! The last locked version is stored in a small TOML record next to the
//! project. Locking an equal or lower version asks the operator first.
//!
//! # Examples
//!
//! ```no_run
//! use kodegen_bundler_macapp::bundler::{StdinConfirm, Version, VersionLock};
//!
//! # fn example() -> kodegen_bundler_macapp::bundler::Result<()> {
//! let version: Version = "1.4.0".parse()?;
//! VersionLock::new("version.lock.toml").lock(&version, &StdinConfirm)?;
//! # Ok(())
//! # }
//! ```

use crate::bundler::{
    confirm::{self, Confirm},
    error::{Error, ErrorExt, Result},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default record file name.
pub const DEFAULT_LOCK_FILE: &str = "version.lock.toml";

/// Dot-separated non-negative integers, e.g. `1.4.0`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Version(Vec<u64>);

impl Version {
    /// Components in order.
    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::VersionParse(s.to_string()));
        }
        s.split('.')
            .map(|part| part.parse::<u64>().map_err(|_| Error::VersionParse(s.to_string())))
            .collect::<Result<Vec<_>>>()
            .map(Version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// Lexicographic comparison of two versions with the same number of components.
///
/// # Errors
///
/// [`Error::VersionLengthMismatch`] when the lengths differ.
pub fn compare(current: &Version, last: &Version) -> Result<Ordering> {
    if current.0.len() != last.0.len() {
        return Err(Error::VersionLengthMismatch {
            current: current.to_string(),
            current_len: current.0.len(),
            last: last.to_string(),
            last_len: last.0.len(),
        });
    }
    Ok(current.0.cmp(&last.0))
}

/// How a [`VersionLock::lock`] call was resolved.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum LockOutcome {
    /// No previous record.
    Created,
    /// Strictly newer than the record.
    Advanced,
    /// Same as the record; the operator agreed to rebuild.
    ConfirmedRebuild,
    /// Older than the record; the operator agreed to go back.
    ConfirmedRegression,
}

#[derive(Debug, Serialize, Deserialize)]
struct LockRecord {
    version: String,
    locked_at: DateTime<Utc>,
}

/// Persistent record of the last built version.
#[derive(Clone, Debug)]
pub struct VersionLock {
    path: PathBuf,
}

impl VersionLock {
    /// Lock backed by the record at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Record path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last locked version, if any.
    pub fn current(&self) -> Result<Option<Version>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&self.path).fs_context("reading version lock", &self.path)?;
        parse_record(&contents)?
            .map(|record| record.version.parse())
            .transpose()
    }

    /// Checks `version` against the record and stores it if accepted.
    ///
    /// Holds an exclusive advisory lock on the record for the whole
    /// check-and-write, so this blocks while the operator is prompted.
    ///
    /// # Errors
    ///
    /// [`Error::Aborted`] if the operator declines a rebuild or regression;
    /// [`Error::VersionLengthMismatch`] if the stored version has a different
    /// number of components.
    pub fn lock(&self, version: &Version, confirm: &dyn Confirm) -> Result<LockOutcome> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).fs_context("creating version lock directory", parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .fs_context("opening version lock", &self.path)?;
        let mut guard = lock_exclusive(file, &self.path)?;
        let file: &mut File = &mut guard;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .fs_context("reading version lock", &self.path)?;

        let outcome = match parse_record(&contents)? {
            None => LockOutcome::Created,
            Some(record) => {
                let last: Version = record.version.parse()?;
                match compare(version, &last)? {
                    Ordering::Greater => LockOutcome::Advanced,
                    Ordering::Equal => {
                        log::warn!("version {} was already built", version);
                        confirm::require(confirm, &format!("Rebuild version {}?", version))?;
                        LockOutcome::ConfirmedRebuild
                    }
                    Ordering::Less => {
                        log::warn!(
                            "version {} is lower than the last built version {}",
                            version,
                            last
                        );
                        confirm::require(
                            confirm,
                            &format!("Build {} after {}?", version, last),
                        )?;
                        LockOutcome::ConfirmedRegression
                    }
                }
            }
        };

        let record = LockRecord {
            version: version.to_string(),
            locked_at: Utc::now(),
        };
        let text = toml::to_string(&record)?;
        file.set_len(0)
            .and_then(|_| file.seek(SeekFrom::Start(0)))
            .and_then(|_| file.write_all(text.as_bytes()))
            .and_then(|_| file.sync_all())
            .fs_context("writing version lock", &self.path)?;

        log::info!("✓ Locked version {} ({:?})", version, outcome);
        Ok(outcome)
    }
}

fn parse_record(contents: &str) -> Result<Option<LockRecord>> {
    if contents.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(toml::from_str(contents)?))
}

#[cfg(unix)]
fn lock_exclusive(file: File, path: &Path) -> Result<nix::fcntl::Flock<File>> {
    nix::fcntl::Flock::lock(file, nix::fcntl::FlockArg::LockExclusive).map_err(|(_, errno)| {
        Error::Fs {
            context: "locking version lock".into(),
            path: path.to_path_buf(),
            source: std::io::Error::from(errno),
        }
    })
}

#[cfg(not(unix))]
fn lock_exclusive(file: File, _path: &Path) -> Result<File> {
    Ok(file)
}
