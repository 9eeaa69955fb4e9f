//! macOS packaging for PyInstaller applications.
//!
//! Turns a Python entry script into a signed, notarized and stapled
//! installer package by driving Apple's and PyInstaller's command line tools.
//!
//! # Overview
//!
//! - [`App`] builds and signs the `.app` bundle.
//! - [`Package`] wraps a built app into a `.pkg`, signs it, and handles
//!   notarization.
//! - [`VersionLock`] refuses to silently rebuild or downgrade a version.
//! - [`Releaser`] runs the whole chain from [`Settings`].
//!
//! All external tools go through a [`CommandRunner`]; [`ShellRunner`] is the
//! real one.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_macapp::bundler::{
//!     App, AppConfig, BuildPaths, InstallScripts, Package, ShellRunner, SigningRole,
//!     resolve_identity,
//! };
//!
//! # async fn example() -> kodegen_bundler_macapp::bundler::Result<()> {
//! let paths = BuildPaths::in_dir(std::path::Path::new("."));
//! let mut app = App::new(ShellRunner::default_in(".")?, "My First App", Some("com.example.first".into()), None);
//! app.configure(AppConfig::new("app/app.py", "build")).await?;
//! app.build(&paths).await?;
//!
//! let mut pkg = Package::new(&app, "1.0.0", Some("com.example.first.pkg".into()))?;
//! pkg.build(&InstallScripts::default(), &paths).await?;
//! if let Some(id) = resolve_identity(app.runner(), SigningRole::Installer).await? {
//!     pkg.sign(&id).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod app;
mod builder;
pub mod command;
pub mod confirm;
pub mod error;
pub mod identity;
pub mod package;
pub mod settings;
pub mod spec;
pub mod version;

pub use app::{App, AppConfig, AppState, BuildPaths, VerifyReport};
pub use app::document_types::{BundleTypeRole, DocumentType, HandlerRank, find_local_utis};
pub use builder::{
    ArtifactKind, ReleaseArtifact, ReleaseOptions, ReleaseReport, Releaser, preflight,
};
pub use command::{CommandOutput, CommandRunner, ShellRunner, ToolCommand};
pub use confirm::{AutoConfirm, Confirm, StdinConfirm};
pub use error::{Error, Result};
pub use identity::{SigningIdentity, SigningRole, resolve_all, resolve_identity};
pub use package::notarization::{
    Credentials, NotarizationOutcome, NotarizationRequest, NotarizationStatus, PollPolicy,
};
pub use package::scripts::InstallScripts;
pub use package::{Package, PackageState};
pub use settings::{
    AppSettings, BundlerLogLevel, NotarySettings, PackageSettings, PathSettings, Settings,
    SettingsBuilder, TargetArch,
};
pub use spec::DataBundle;
pub use version::{LockOutcome, Version, VersionLock};
