//! Core Settings struct and implementations.

use super::{AppSettings, NotarySettings, PackageSettings, PathSettings};
use crate::bundler::{
    app::{AppConfig, BuildPaths},
    package::{notarization::PollPolicy, scripts::InstallScripts},
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved project configuration, constructed via [`SettingsBuilder`](super::SettingsBuilder).
///
/// Every path accessor returns an absolute path under [`Settings::root`]
/// unless the manifest already gave an absolute one.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_macapp::bundler::{AppSettings, PackageSettings, SettingsBuilder};
///
/// # fn example() -> kodegen_bundler_macapp::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .root("/Users/me/first-app")
///     .app_settings(AppSettings {
///         name: "My First App".into(),
///         entry: "app/app.py".into(),
///         ..Default::default()
///     })
///     .package_settings(PackageSettings {
///         version: "1.0.0".into(),
///         ..Default::default()
///     })
///     .build()?;
/// assert!(settings.build_paths().dist.ends_with("dist"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Settings {
    root: PathBuf,
    app: AppSettings,
    package: PackageSettings,
    paths: PathSettings,
    notary: NotarySettings,
}

impl Settings {
    /// Directory relative paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `[app]` section as written.
    pub fn app(&self) -> &AppSettings {
        &self.app
    }

    /// `[package]` section as written.
    pub fn package(&self) -> &PackageSettings {
        &self.package
    }

    /// `[notary]` section as written.
    pub fn notary(&self) -> &NotarySettings {
        &self.notary
    }

    /// Mutable `[notary]` section, for command line overrides.
    pub fn notary_mut(&mut self) -> &mut NotarySettings {
        &mut self.notary
    }

    /// Application name.
    pub fn product_name(&self) -> &str {
        &self.app.name
    }

    /// Installer version string.
    pub fn version_string(&self) -> &str {
        &self.package.version
    }

    /// Installer identifier, falling back to the app identifier.
    pub fn package_identifier(&self) -> Option<&str> {
        self.package
            .identifier
            .as_deref()
            .or(self.app.identifier.as_deref())
    }

    /// Joins `path` onto the root unless it is already absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// App icon, resolved.
    pub fn icon(&self) -> Option<PathBuf> {
        self.app.icon.as_deref().map(|p| self.resolve(p))
    }

    /// `dist` and `build`, resolved.
    pub fn build_paths(&self) -> BuildPaths {
        BuildPaths {
            dist: self.resolve(&self.paths.dist),
            build: self.resolve(&self.paths.build),
        }
    }

    /// Spec directory, defaulting to the build directory.
    pub fn spec_dir(&self) -> PathBuf {
        self.resolve(self.paths.spec.as_deref().unwrap_or(&self.paths.build))
    }

    /// Version lock record, resolved.
    pub fn version_lock_path(&self) -> PathBuf {
        self.resolve(&self.paths.version_lock)
    }

    /// Input for [`App::configure`](crate::bundler::App::configure).
    pub fn app_config(&self) -> AppConfig {
        let mut config = AppConfig::new(self.resolve(&self.app.entry), self.spec_dir());
        config.arch = self.app.architecture;
        config.log_level = self.app.log_level;
        config.entitlements = self.app.entitlements.as_deref().map(|p| self.resolve(p));
        config.hidden_imports = self.app.hidden_imports.clone();
        config.collect_submodules = self.app.collect_submodules.clone();
        config.data = self
            .app
            .data
            .iter()
            .map(|d| crate::bundler::spec::DataBundle::new(self.resolve(&d.src), d.dest.clone()))
            .collect();
        config.url_scheme = self.app.url_scheme.clone();
        config.document_types = self.app.document_types.clone();
        config.custom_spec = self.app.custom_spec.as_deref().map(|p| self.resolve(p));
        config.brute = self.app.brute;
        config
    }

    /// Install scripts, resolved.
    pub fn install_scripts(&self) -> InstallScripts {
        InstallScripts {
            preinstall: self.package.preinstall.as_deref().map(|p| self.resolve(p)),
            postinstall: self.package.postinstall.as_deref().map(|p| self.resolve(p)),
        }
    }

    /// Notarization polling from the `[notary]` section.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.notary.poll_interval_secs),
            max_attempts: self.notary.max_attempts,
            grace_delay: Duration::from_secs(self.notary.grace_delay_secs),
        }
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    pub(super) fn new(
        root: PathBuf,
        app: AppSettings,
        package: PackageSettings,
        paths: PathSettings,
        notary: NotarySettings,
    ) -> Self {
        Self {
            root,
            app,
            package,
            paths,
            notary,
        }
    }
}
