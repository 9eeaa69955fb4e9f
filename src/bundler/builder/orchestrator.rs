//! Release pipeline orchestration.
//!
//! Runs the whole chain from a resolved [`Settings`]: version lock, app
//! configure/build/sign, optional verification, installer build/sign, and
//! optionally notarization with stapling. Each step's failure stops the chain.

use super::{
    checksum::{artifact_size, calculate_sha256},
    tool_detection,
};
use crate::bundler::{
    App, Error, Package, Result, Settings,
    app::VerifyReport,
    command::CommandRunner,
    confirm::{self, Confirm},
    identity,
    package::{
        UNSIGNED_APP_PROMPT,
        notarization::{Credentials, NotarizationOutcome, NotarizationRequest},
    },
    version::{LockOutcome, Version, VersionLock},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What a release run should do beyond building and signing.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReleaseOptions {
    /// Submit the installer for notarization and wait for a verdict.
    pub notarize: bool,
    /// Run `codesign --verify` on the signed app.
    pub verify: bool,
}

/// Kind of file produced by a release.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// The `.app` bundle.
    App,
    /// The `.pkg` installer.
    Installer,
}

/// A produced file with its digest.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ReleaseArtifact {
    /// What this is.
    pub kind: ArtifactKind,
    /// Where it is.
    pub path: PathBuf,
    /// Size in bytes (summed over the tree for the app).
    pub size: u64,
    /// Hex-encoded SHA-256.
    pub checksum: String,
    /// Whether a signing identity was applied.
    pub signed: bool,
}

/// Summary of a release run.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ReleaseReport {
    /// App name.
    pub name: String,
    /// Installer version.
    pub version: String,
    /// How the version lock resolved.
    pub lock: LockOutcome,
    /// App and installer.
    pub artifacts: Vec<ReleaseArtifact>,
    /// Signature verification, when requested.
    pub verification: Option<VerifyReport>,
    /// Notary submission, when notarizing.
    pub notarization_request: Option<NotarizationRequest>,
    /// Notary verdict, when notarizing.
    pub notarization: Option<NotarizationOutcome>,
}

impl ReleaseReport {
    /// Whether the notary service rejected the installer.
    pub fn rejected(&self) -> bool {
        matches!(self.notarization, Some(NotarizationOutcome::Invalid { .. }))
    }
}

/// Fails with the list of tools missing from `PATH`.
pub fn preflight(options: &ReleaseOptions) -> Result<()> {
    let missing = tool_detection::missing_tools(options.notarize);
    if missing.is_empty() {
        log::debug!("all required tools found");
        return Ok(());
    }
    Err(Error::Config(format!(
        "required tools not found in PATH: {}",
        missing.join(", ")
    )))
}

/// Main release orchestrator.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_macapp::bundler::{AutoConfirm, Releaser, ReleaseOptions, ShellRunner};
/// use kodegen_bundler_macapp::metadata::load_manifest;
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = load_manifest(std::path::Path::new("macapp.toml"))?;
/// let runner = ShellRunner::default_in(settings.root())?;
/// let report = Releaser::new(settings, runner)
///     .release(&ReleaseOptions::default(), Arc::new(AutoConfirm(true)), None, &CancellationToken::new())
///     .await?;
/// println!("{}", serde_json::to_string_pretty(&report)?);
/// # Ok(())
/// # }
/// ```
pub struct Releaser<R: CommandRunner> {
    settings: Settings,
    runner: R,
}

impl<R: CommandRunner> std::fmt::Debug for Releaser<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Releaser")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<R: CommandRunner> Releaser<R> {
    /// Creates a releaser for `settings` that runs tools through `runner`.
    pub fn new(settings: Settings, runner: R) -> Self {
        Self { settings, runner }
    }

    /// Returns a reference to the release settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs the pipeline.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when notarizing without `credentials` (checked before
    /// anything is built); otherwise the first failing step's error.
    pub async fn release(
        self,
        options: &ReleaseOptions,
        confirm: Arc<dyn Confirm>,
        credentials: Option<Credentials>,
        cancel: &CancellationToken,
    ) -> Result<ReleaseReport> {
        let settings = self.settings;
        if options.notarize && credentials.is_none() {
            return Err(Error::Config(
                "notarization requested but no Apple ID credentials were provided".into(),
            ));
        }

        let version: Version = settings.version_string().parse()?;
        let version_lock = VersionLock::new(settings.version_lock_path());
        let (locked, prompt) = (version.clone(), Arc::clone(&confirm));
        let lock = confirm::blocking_until_cancelled(cancel, move || {
            version_lock.lock(&locked, prompt.as_ref())
        })
        .await?;

        let paths = settings.build_paths();
        let mut app = App::new(
            self.runner,
            settings.product_name(),
            settings.app().identifier.clone(),
            settings.icon(),
        );
        app.configure(settings.app_config()).await?;
        checkpoint(cancel)?;
        let bundle = app.build(&paths).await?;
        checkpoint(cancel)?;

        let (app_identity, installer_identity) = identity::resolve_all(app.runner()).await?;
        match &app_identity {
            Some(id) => app.sign(id).await?,
            None => log::warn!("no Developer ID Application identity found; {} stays unsigned", app.name()),
        }

        checkpoint(cancel)?;
        let verification = if options.verify {
            Some(app.verify().await?)
        } else {
            None
        };

        let mut package = Package::new(
            &app,
            version.to_string(),
            settings.package_identifier().map(str::to_string),
        )?;
        if let Some(location) = &settings.package().install_location {
            package = package.with_install_location(location);
        }
        let unsigned = package.build(&settings.install_scripts(), &paths).await?;
        checkpoint(cancel)?;

        let installer = match &installer_identity {
            Some(id) => Some(package.sign(id).await?),
            None => {
                log::warn!("no Developer ID Installer identity found; installer stays unsigned");
                None
            }
        };

        let notarization = match (options.notarize, credentials) {
            (true, Some(credentials)) => {
                if installer.is_none() {
                    return Err(Error::Config(
                        "cannot notarize an unsigned installer; install a Developer ID Installer identity".into(),
                    ));
                }
                checkpoint(cancel)?;
                if !app.is_signed() {
                    log::warn!("{} is not signed; notarization will fail", app.name());
                    confirm::require_cancellable(&confirm, UNSIGNED_APP_PROMPT, cancel).await?;
                }
                package.login(credentials);
                package.submit().await?;
                Some(package.wait(&settings.poll_policy(), cancel).await?)
            }
            _ => None,
        };

        let artifacts = vec![
            describe(ArtifactKind::App, &bundle, app.is_signed()).await?,
            match &installer {
                Some(signed) => describe(ArtifactKind::Installer, signed, true).await?,
                None => describe(ArtifactKind::Installer, &unsigned, false).await?,
            },
        ];

        for artifact in &artifacts {
            log::info!("✓ {} ({} bytes, sha256 {})", artifact.path.display(), artifact.size, artifact.checksum);
        }

        Ok(ReleaseReport {
            name: app.name().to_string(),
            version: version.to_string(),
            lock,
            artifacts,
            verification,
            notarization_request: package.request().cloned(),
            notarization,
        })
    }
}

/// Stops the chain between steps once `cancel` has fired.
fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        log::warn!("release cancelled");
        return Err(Error::Cancelled);
    }
    Ok(())
}

async fn describe(kind: ArtifactKind, path: &Path, signed: bool) -> Result<ReleaseArtifact> {
    Ok(ReleaseArtifact {
        kind,
        path: path.to_path_buf(),
        size: artifact_size(path).await?,
        checksum: calculate_sha256(path).await?,
        signed,
    })
}
