//! Builder for constructing Settings.

use super::{AppSettings, NotarySettings, PackageSettings, PathSettings, Settings};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Builder for constructing [`Settings`].
///
/// # See Also
///
/// - [`Settings`] - The built settings struct
/// - [`crate::metadata::load_manifest`] - Fills the builder from `macapp.toml`
#[derive(Default)]
pub struct SettingsBuilder {
    root: Option<PathBuf>,
    app: Option<AppSettings>,
    package: Option<PackageSettings>,
    paths: PathSettings,
    notary: NotarySettings,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the directory relative paths are resolved against.
    ///
    /// Default: current directory
    pub fn root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the `[app]` section.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn app_settings(mut self, settings: AppSettings) -> Self {
        self.app = Some(settings);
        self
    }

    /// Sets the `[package]` section.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn package_settings(mut self, settings: PackageSettings) -> Self {
        self.package = Some(settings);
        self
    }

    /// Sets the `[paths]` section.
    ///
    /// Default: `dist/`, `build/`, `version.lock.toml`
    pub fn path_settings(mut self, settings: PathSettings) -> Self {
        self.paths = settings;
        self
    }

    /// Sets the `[notary]` section.
    pub fn notary_settings(mut self, settings: NotarySettings) -> Self {
        self.notary = settings;
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `app_settings` or `package_settings` is missing,
    /// the app name or entry is empty, the version is empty, or `[notary]`
    /// asks for zero status checks or a zero poll interval.
    pub fn build(self) -> crate::bundler::Result<Settings> {
        use crate::bundler::error::{Context, Error};

        let app = self.app.context("app_settings is required")?;
        let package = self.package.context("package_settings is required")?;

        if app.name.trim().is_empty() {
            return Err(Error::Config("[app] name must not be empty".into()));
        }
        if app.entry.as_os_str().is_empty() {
            return Err(Error::Config("[app] entry must not be empty".into()));
        }
        if package.version.trim().is_empty() {
            return Err(Error::Config("[package] version must not be empty".into()));
        }

        let root = match self.root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        let root = root
            .absolutize()
            .map(|p| p.into_owned())
            .with_context(|| format!("resolving {}", root.display()))?;

        let settings = Settings::new(root, app, package, self.paths, self.notary);
        settings.poll_policy().validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn app() -> AppSettings {
        AppSettings {
            name: "Demo".into(),
            identifier: Some("com.example.demo".into()),
            entry: "app/app.py".into(),
            ..Default::default()
        }
    }

    fn package() -> PackageSettings {
        PackageSettings {
            version: "1.0.0".into(),
            ..Default::default()
        }
    }

    #[test]
    fn requires_app_and_package() {
        assert!(SettingsBuilder::new().package_settings(package()).build().is_err());
        assert!(SettingsBuilder::new().app_settings(app()).build().is_err());
    }

    #[test]
    fn rejects_empty_version() {
        let err = SettingsBuilder::new()
            .app_settings(app())
            .package_settings(PackageSettings::default())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn rejects_notary_policy_that_never_polls() {
        for notary in [
            NotarySettings {
                max_attempts: 0,
                ..Default::default()
            },
            NotarySettings {
                poll_interval_secs: 0,
                ..Default::default()
            },
        ] {
            let err = SettingsBuilder::new()
                .app_settings(app())
                .package_settings(package())
                .notary_settings(notary)
                .build()
                .unwrap_err();
            assert!(matches!(err, crate::bundler::Error::Config(_)));
        }
    }

    #[test]
    fn resolves_relative_paths_against_root() {
        let settings = SettingsBuilder::new()
            .root("/projects/demo")
            .app_settings(app())
            .package_settings(package())
            .build()
            .unwrap();

        assert_eq!(settings.build_paths().dist, PathBuf::from("/projects/demo/dist"));
        assert_eq!(settings.spec_dir(), PathBuf::from("/projects/demo/build"));
        assert_eq!(
            settings.app_config().entry,
            PathBuf::from("/projects/demo/app/app.py")
        );
        assert_eq!(settings.package_identifier(), Some("com.example.demo"));
        assert_eq!(settings.poll_policy().interval, Duration::from_secs(20));
    }
}
