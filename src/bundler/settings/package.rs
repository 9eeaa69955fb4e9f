//! `[package]` and `[paths]` manifest sections.

use std::path::PathBuf;

/// Installer package configuration.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_macapp::bundler::PackageSettings;
///
/// let settings = PackageSettings {
///     version: "1.0.0".into(),
///     identifier: Some("com.example.first.pkg".into()),
///     postinstall: Some("scripts/postinstall".into()),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSettings {
    /// Installer version; also checked by the version lock.
    pub version: String,

    /// Installer identifier. Falls back to the app identifier.
    #[serde(default)]
    pub identifier: Option<String>,

    /// Script named exactly `preinstall`.
    #[serde(default)]
    pub preinstall: Option<PathBuf>,

    /// Script named exactly `postinstall`.
    #[serde(default)]
    pub postinstall: Option<PathBuf>,

    /// Where the app is installed.
    ///
    /// Default: `/Applications/<name>.app`
    #[serde(default)]
    pub install_location: Option<PathBuf>,
}

/// Output and intermediate directories.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathSettings {
    /// Final artifacts.
    #[serde(default = "default_dist")]
    pub dist: PathBuf,

    /// Intermediates.
    #[serde(default = "default_build")]
    pub build: PathBuf,

    /// Generated `.spec` and default entitlements. Defaults to `build`.
    #[serde(default)]
    pub spec: Option<PathBuf>,

    /// Version lock record.
    #[serde(default = "default_lock")]
    pub version_lock: PathBuf,
}

fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

fn default_build() -> PathBuf {
    PathBuf::from("build")
}

fn default_lock() -> PathBuf {
    PathBuf::from(crate::bundler::version::DEFAULT_LOCK_FILE)
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            dist: default_dist(),
            build: default_build(),
            spec: None,
            version_lock: default_lock(),
        }
    }
}
