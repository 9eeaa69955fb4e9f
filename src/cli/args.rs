//! Command line argument parsing and validation.
//!
//! This module provides CLI argument parsing using clap, with validation and
//! the runtime configuration derived from it.

use crate::bundler::version::DEFAULT_LOCK_FILE;
use crate::metadata::MANIFEST_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// macOS packaging for PyInstaller applications
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_macapp",
    version,
    about = "Build, sign, package and notarize PyInstaller apps for macOS",
    long_about = "Turns a Python entry script into a signed, notarized and stapled macOS installer.

Usage:
  kodegen_bundler_macapp init my-app --name \"My First App\"
  kodegen_bundler_macapp release --manifest my-app/macapp.toml
  kodegen_bundler_macapp release --skip-notarize --verify

Exit codes: 0 success, 1 failure, 2 aborted at a prompt, 3 notarization rejected."
)]
pub struct Args {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Debug-level logging and extra output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors and machine-readable output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scaffold a new project with an entry script, scripts and macapp.toml
    Init {
        /// Project directory (created if missing)
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Application name
        #[arg(long, default_value = "My New App")]
        name: String,

        /// Bundle identifier
        #[arg(long, default_value = "com.example.mynewapp")]
        identifier: String,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Show the first Developer ID Application and Installer identities
    Identities {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check a version against the last locked one and record it
    Lock {
        /// Version to lock, e.g. 1.2.0
        version: String,

        /// Version lock record
        #[arg(long, default_value = DEFAULT_LOCK_FILE)]
        file: PathBuf,

        /// Answer yes to rebuild/regression prompts
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Search this machine's registered UTIs
    Utis {
        /// Substring to look for, e.g. json
        search: String,
    },

    /// Build, sign, package and (optionally) notarize from a manifest
    Release {
        /// Project manifest
        #[arg(short, long, default_value = MANIFEST_FILE)]
        manifest: PathBuf,

        /// Stop after signing the installer
        #[arg(long)]
        skip_notarize: bool,

        /// Run codesign verification on the signed app
        #[arg(long)]
        verify: bool,

        /// Answer yes to every prompt
        #[arg(short = 'y', long)]
        yes: bool,

        /// Override [notary] max_attempts
        #[arg(long, value_name = "N")]
        max_attempts: Option<u32>,

        /// Override [notary] apple_id
        #[arg(long, env = "APPLE_ID")]
        apple_id: Option<String>,

        /// Override [notary] team_id
        #[arg(long, env = "APPLE_TEAM_ID")]
        team_id: Option<String>,

        /// App-specific password
        #[arg(long, env = "APPLE_APP_SPECIFIC_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Print the release report as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default `env_logger` filter for these arguments.
    pub fn log_filter(&self) -> &'static str {
        match (self.verbose, self.quiet) {
            (true, _) => "debug",
            (_, true) => "error",
            _ => "info",
        }
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Lock { version, .. } => version
                .parse::<crate::bundler::Version>()
                .map(|_| ())
                .map_err(|e| e.to_string()),
            Command::Release {
                max_attempts: Some(0),
                ..
            } => Err("--max-attempts must be at least 1".to_string()),
            Command::Utis { search } if search.trim().is_empty() => {
                Err("search must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for terminal output
    output: super::OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print verbose message if in verbose mode
    pub fn verbose_println(&self, message: &str) -> std::io::Result<()> {
        self.output.verbose(message)
    }

    /// Print success message if not in quiet mode
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.output.success(message)
    }

    /// Print warning message if not in quiet mode
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.output.warn(message)
    }

    /// Print progress message
    pub fn progress(&self, message: &str) -> std::io::Result<()> {
        self.output.progress(message)
    }

    /// Print section header
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        self.output.section(title)
    }

    /// Print indented text
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.output.indent(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn release_defaults() {
        let args = Args::try_parse_from(["kodegen_bundler_macapp", "release"]).unwrap();
        match args.command {
            Command::Release {
                manifest,
                skip_notarize,
                max_attempts,
                ..
            } => {
                assert_eq!(manifest, PathBuf::from("macapp.toml"));
                assert!(!skip_notarize);
                assert!(max_attempts.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            Args::try_parse_from(["x", "-v", "utis", "json"]).unwrap().log_filter(),
            "debug"
        );
    }

    #[test]
    fn validation_rejects_bad_input() {
        let lock = Args::try_parse_from(["x", "lock", "1.a"]).unwrap();
        assert!(lock.validate().is_err());
        let release = Args::try_parse_from(["x", "release", "--max-attempts", "0"]).unwrap();
        assert!(release.validate().is_err());
        let ok = Args::try_parse_from(["x", "lock", "1.2.0", "-y"]).unwrap();
        assert!(ok.validate().is_ok());
    }
}
