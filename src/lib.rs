//! macOS packaging pipeline for PyInstaller applications
//!
//! This library drives the whole release of a Python desktop app:
//! - `.app` bundles built with PyInstaller and signed with `codesign`
//! - installer packages built with `pkgbuild` and signed with `productsign`
//! - notarization through `notarytool`, with stapling once approved
//! - a version lock that refuses accidental rebuilds and regressions
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;
pub mod metadata;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
