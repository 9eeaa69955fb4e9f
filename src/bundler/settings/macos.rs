//! `[app]` and `[notary]` manifest sections.

use super::{BundlerLogLevel, TargetArch};
use crate::bundler::{app::document_types::DocumentType, spec::DataBundle};
use std::path::PathBuf;

/// Application bundle configuration.
///
/// # Configuration
///
/// Add to `macapp.toml`:
///
/// ```toml
/// [app]
/// name = "My First App"
/// identifier = "com.example.first"
/// entry = "app/app.py"
/// icon = "assets/icon.icns"
/// architecture = "universal2"
/// url_scheme = "myfirstapp"
///
/// [[app.document_types]]
/// uti = "public.json"
/// rank = "Default"
/// role = "Editor"
/// ```
///
/// Relative paths are resolved against the manifest's directory.
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppSettings {
    /// Application name; a trailing `.app` is stripped.
    pub name: String,

    /// Bundle identifier (`CFBundleIdentifier`).
    #[serde(default)]
    pub identifier: Option<String>,

    /// Entry `.py` script.
    pub entry: PathBuf,

    /// `.icns` icon. Ignored when missing.
    #[serde(default)]
    pub icon: Option<PathBuf>,

    /// Target architecture.
    ///
    /// Default: `universal2`
    #[serde(default)]
    pub architecture: TargetArch,

    /// PyInstaller log level.
    ///
    /// Default: `WARN`
    #[serde(default)]
    pub log_level: BundlerLogLevel,

    /// Entitlements `.plist`. The minimum default is written when absent.
    #[serde(default)]
    pub entitlements: Option<PathBuf>,

    /// Custom URL scheme.
    #[serde(default)]
    pub url_scheme: Option<String>,

    /// Document types registered in Info.plist.
    #[serde(default)]
    pub document_types: Vec<DocumentType>,

    /// Modules PyInstaller cannot discover statically.
    #[serde(default)]
    pub hidden_imports: Vec<String>,

    /// Packages whose submodules are all collected.
    #[serde(default)]
    pub collect_submodules: Vec<String>,

    /// Extra data (`{ src = "...", dest = "..." }`).
    #[serde(default)]
    pub data: Vec<DataBundle>,

    /// Hand-written `.spec` used instead of generating one.
    #[serde(default)]
    pub custom_spec: Option<PathBuf>,

    /// Log spec validation failures instead of failing.
    #[serde(default)]
    pub brute: bool,
}

/// Notary service account and polling.
///
/// The app-specific password is never read from the manifest; it comes from
/// `APPLE_APP_SPECIFIC_PASSWORD` or an interactive prompt.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotarySettings {
    /// Apple ID email.
    #[serde(default)]
    pub apple_id: Option<String>,

    /// Developer team id.
    #[serde(default)]
    pub team_id: Option<String>,

    /// Seconds between status checks.
    #[serde(default = "default_interval")]
    pub poll_interval_secs: u64,

    /// Status checks before giving up.
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,

    /// Seconds to wait before fetching the log of a rejected submission.
    #[serde(default = "default_grace")]
    pub grace_delay_secs: u64,
}

fn default_interval() -> u64 {
    20
}

fn default_attempts() -> u32 {
    180
}

fn default_grace() -> u64 {
    10
}

impl Default for NotarySettings {
    fn default() -> Self {
        Self {
            apple_id: None,
            team_id: None,
            poll_interval_secs: default_interval(),
            max_attempts: default_attempts(),
            grace_delay_secs: default_grace(),
        }
    }
}
