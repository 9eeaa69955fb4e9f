//! Configuration structures for packaging operations.
//!
//! Mirrors the sections of `macapp.toml` and resolves them into the inputs
//! the app and package lifecycles take.

mod arch;
mod builder;
mod core;
mod macos;
mod package;

pub use arch::{BundlerLogLevel, TargetArch};
pub use builder::SettingsBuilder;
pub use core::Settings;
pub use macos::{AppSettings, NotarySettings};
pub use package::{PackageSettings, PathSettings};
