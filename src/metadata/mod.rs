//! Project manifest (`macapp.toml`) loading.

use crate::bundler::{
    AppSettings, NotarySettings, PackageSettings, PathSettings, Settings, SettingsBuilder,
};
use crate::error::{BundlerError, CliError, Result};
use std::path::Path;

/// Default manifest file name.
pub const MANIFEST_FILE: &str = "macapp.toml";

/// Raw `macapp.toml` contents.
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// `[app]`
    pub app: AppSettings,
    /// `[package]`
    pub package: PackageSettings,
    /// `[paths]`
    #[serde(default)]
    pub paths: PathSettings,
    /// `[notary]`
    #[serde(default)]
    pub notary: NotarySettings,
}

/// Parses manifest text without resolving any paths.
pub fn parse_manifest(contents: &str) -> Result<Manifest> {
    Ok(toml::from_str(contents)?)
}

/// Reads `macapp.toml` and resolves it against the manifest's directory.
pub fn load_manifest(manifest_path: &Path) -> Result<Settings> {
    let contents = std::fs::read_to_string(manifest_path).map_err(|e| {
        BundlerError::Cli(CliError::ExecutionFailed {
            command: "read_manifest".to_string(),
            reason: format!("Failed to read {}: {}", manifest_path.display(), e),
        })
    })?;

    let manifest = parse_manifest(&contents).map_err(|e| {
        BundlerError::Cli(CliError::InvalidArguments {
            reason: format!("Failed to parse {}: {}", manifest_path.display(), e),
        })
    })?;

    let root = match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };

    let settings = SettingsBuilder::new()
        .root(root)
        .app_settings(manifest.app)
        .package_settings(manifest.package)
        .path_settings(manifest.paths)
        .notary_settings(manifest.notary)
        .build()?;

    log::debug!(
        "loaded {} {} from {}",
        settings.product_name(),
        settings.version_string(),
        manifest_path.display()
    );
    Ok(settings)
}
