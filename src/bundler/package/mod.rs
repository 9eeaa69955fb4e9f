//! `.pkg` installer lifecycle: build → sign → notarize → wait.
//!
//! # States
//!
//! ```text
//! Constructed --build--> Built --sign--> Signed --notarize--> Submitted
//!                                                                |
//!                                              wait: Approved (stapled) | Invalid
//! ```
//!
//! A [`Package`] borrows the [`App`] it wraps, so the app cannot be rebuilt
//! underneath it. Each package owns a private scratch directory for its
//! install scripts; it is removed when the package is dropped.

pub mod notarization;
pub mod scripts;

use crate::bundler::{
    app::{App, BuildPaths},
    command::{CommandRunner, ToolCommand},
    confirm::{self, Confirm},
    error::{Error, ErrorExt, Result},
    identity::{SigningIdentity, SigningRole},
};
use notarization::{
    Credentials, NotarizationOutcome, NotarizationRequest, NotarizationStatus, PollPolicy,
};
use scripts::InstallScripts;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Question asked before notarizing an installer whose app is unsigned.
pub const UNSIGNED_APP_PROMPT: &str = "Notarize anyway?";

/// Lifecycle position of a [`Package`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, serde::Serialize)]
pub enum PackageState {
    /// Bundle located, nothing built yet.
    Constructed,
    /// Unsigned `.pkg` in the build directory.
    Built,
    /// Signed `.pkg` in the dist directory.
    Signed,
    /// Uploaded to the notary service.
    Submitted,
    /// Notarized and stapled.
    Approved,
    /// Rejected by the notary service.
    Invalid,
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An installer package for a built [`App`].
pub struct Package<'a, R: CommandRunner> {
    app: &'a App<R>,
    bundle: PathBuf,
    version: String,
    identifier: Option<String>,
    install_location: PathBuf,
    scratch: TempDir,
    paths: Option<BuildPaths>,
    credentials: Option<Credentials>,
    request: Option<NotarizationRequest>,
    state: PackageState,
}

impl<R: CommandRunner> fmt::Debug for Package<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("app", &self.app.name())
            .field("version", &self.version)
            .field("identifier", &self.identifier)
            .field("state", &self.state)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl<'a, R: CommandRunner> Package<'a, R> {
    /// Wraps a built app. The scratch directory lives in the system temp dir.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the app has no built bundle on disk.
    pub fn new(app: &'a App<R>, version: impl Into<String>, identifier: Option<String>) -> Result<Self> {
        Self::create(app, version.into(), identifier, None)
    }

    /// Like [`Package::new`], with the scratch directory created under `parent`.
    pub fn new_in(
        app: &'a App<R>,
        version: impl Into<String>,
        identifier: Option<String>,
        parent: &Path,
    ) -> Result<Self> {
        Self::create(app, version.into(), identifier, Some(parent))
    }

    fn create(
        app: &'a App<R>,
        version: String,
        identifier: Option<String>,
        parent: Option<&Path>,
    ) -> Result<Self> {
        let bundle = match app.bundle_path() {
            Some(bundle) if bundle.is_dir() => bundle.to_path_buf(),
            Some(bundle) => {
                return Err(Error::Config(format!(
                    "app bundle '{}' does not exist",
                    bundle.display()
                )));
            }
            None => {
                return Err(Error::Config(format!(
                    "{} has not been built; build the app before packaging it",
                    app.name()
                )));
            }
        };

        let mut builder = tempfile::Builder::new();
        builder.prefix("macapp-scripts-");
        let scratch = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .fs_context("creating scripts scratch directory", parent.unwrap_or(Path::new("")))?;

        let install_location = PathBuf::from("/Applications").join(format!("{}.app", app.name()));
        Ok(Self {
            app,
            bundle,
            version,
            identifier,
            install_location,
            scratch,
            paths: None,
            credentials: None,
            request: None,
            state: PackageState::Constructed,
        })
    }

    /// Overrides the default `/Applications/<Name>.app` install location.
    pub fn with_install_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.install_location = location.into();
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PackageState {
        self.state
    }

    /// Package version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Private scripts directory.
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Active notarization submission.
    pub fn request(&self) -> Option<&NotarizationRequest> {
        self.request.as_ref()
    }

    /// Whether credentials have been stored.
    pub fn is_logged_in(&self) -> bool {
        self.credentials.is_some()
    }

    /// Unsigned package path, once built.
    pub fn unsigned_path(&self) -> Option<PathBuf> {
        self.paths.as_ref().map(|p| p.build.join(self.file_name()))
    }

    /// Signed package path, once built.
    pub fn signed_path(&self) -> Option<PathBuf> {
        self.paths.as_ref().map(|p| p.dist.join(self.file_name()))
    }

    fn file_name(&self) -> String {
        format!("{}.pkg", self.app.name())
    }

    /// Runs `pkgbuild` on the app bundle.
    ///
    /// Valid scripts are staged into the scratch directory first; misnamed
    /// ones are logged and left out.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] without an identifier or if the output directories
    /// cannot be created; tool failures otherwise.
    pub async fn build(&mut self, scripts: &InstallScripts, paths: &BuildPaths) -> Result<PathBuf> {
        let Some(identifier) = self.identifier.clone() else {
            log::error!("package identifier is required to build {}", self.file_name());
            return Err(Error::Config("package identifier is required".into()));
        };

        let start = Instant::now();
        log::info!("(pkg) build initiated");
        paths.ensure().await?;

        let staged = scripts::stage_scripts(scripts, self.scratch.path()).await?;

        let output = paths.build.join(self.file_name());
        let mut command = ToolCommand::new("pkgbuild")
            .arg("--version")
            .arg(self.version.as_str())
            .arg("--identifier")
            .arg(identifier);
        if staged {
            command = command.arg("--scripts").path_arg(self.scratch.path());
        }
        let command = command
            .arg("--root")
            .path_arg(&self.bundle)
            .arg("--install-location")
            .path_arg(&self.install_location)
            .path_arg(&output);
        self.app.runner().run(&command).await?.check()?;

        self.paths = Some(paths.clone());
        self.state = PackageState::Built;
        log::info!(
            "(pkg) build completed in {:.2} second(s)",
            start.elapsed().as_secs_f64()
        );
        Ok(output)
    }

    /// Runs `productsign`, writing the signed package to the dist directory.
    pub async fn sign(&mut self, identity: &SigningIdentity) -> Result<PathBuf> {
        let (Some(unsigned), Some(signed)) = (self.unsigned_path(), self.signed_path()) else {
            log::error!("{} has not been built; call build(...) first", self.file_name());
            return Err(self.invalid_state("sign", "Built"));
        };
        if identity.role != SigningRole::Installer {
            log::warn!(
                "signing {} with a '{}' identity; productsign expects '{}'",
                self.file_name(),
                identity.role,
                SigningRole::Installer
            );
        }

        if signed.exists() {
            log::debug!("removing previous {}", signed.display());
            tokio::fs::remove_file(&signed)
                .await
                .fs_context("removing previous signed package", &signed)?;
        }

        let command = ToolCommand::new("productsign")
            .arg("--sign")
            .arg(identity.hash.as_str())
            .path_arg(&unsigned)
            .path_arg(&signed);
        self.app.runner().run(&command).await?.check()?;

        self.state = PackageState::Signed;
        log::info!("✓ Signed {}", signed.display());
        Ok(signed)
    }

    /// Stores notarization credentials. Later calls are ignored.
    pub fn login(&mut self, credentials: Credentials) {
        if self.credentials.is_some() {
            log::debug!("already logged in; ignoring new credentials");
            return;
        }
        log::debug!("storing notarization credentials for {}", credentials.apple_id);
        self.credentials = Some(credentials);
    }

    /// Uploads the signed package to the notary service.
    ///
    /// Asks for confirmation first if the app itself was never signed, since
    /// the service will reject it.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] before [`Package::sign`]; [`Error::Config`]
    /// without credentials; [`Error::Aborted`] if the operator declines.
    pub async fn notarize(&mut self, confirm: &dyn Confirm) -> Result<NotarizationRequest> {
        if self.state >= PackageState::Signed && !self.app.is_signed() {
            log::warn!("{} is not signed; notarization will fail", self.app.name());
            confirm::require(confirm, UNSIGNED_APP_PROMPT)?;
        }
        self.submit().await
    }

    /// [`Package::notarize`] without the unsigned-app prompt, for callers
    /// that asked already.
    pub async fn submit(&mut self) -> Result<NotarizationRequest> {
        let Some(signed) = self.signed_path().filter(|_| self.state >= PackageState::Signed) else {
            return Err(self.invalid_state("notarize", "Signed"));
        };
        let Some(credentials) = &self.credentials else {
            log::warn!("not logged in; call login(...) before notarizing");
            return Err(Error::Config("notarization credentials are missing".into()));
        };

        log::info!("(pkg) notarization initiated");
        let output = self
            .app
            .runner()
            .run(&notarization::submit_command(credentials, &signed))
            .await?
            .check()?;
        for line in output.lines() {
            log::info!("{}", line);
        }

        let combined = output.combined();
        let id = notarization::parse_submission_id(&combined).ok_or_else(|| {
            Error::GenericError(format!("no submission id in notary output:\n{}", combined))
        })?;

        let request = NotarizationRequest {
            id,
            status: NotarizationStatus::Submitted,
        };
        log::info!("submitted notarization request {}", id);
        self.request = Some(request.clone());
        self.state = PackageState::Submitted;
        Ok(request)
    }

    /// Polls the submission until it is approved or rejected.
    ///
    /// The first check happens immediately, later ones every
    /// `policy.interval`. Approval staples the ticket; rejection waits
    /// `policy.grace_delay` and returns the notary log.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for a policy with no attempts or no interval,
    /// [`Error::NotarizationTimeout`] after `policy.max_attempts` checks,
    /// [`Error::CommandFailed`] after
    /// [`MAX_CONSECUTIVE_CHECK_FAILURES`](notarization::MAX_CONSECUTIVE_CHECK_FAILURES)
    /// failed checks in a row, [`Error::Cancelled`] once `cancel` fires.
    pub async fn wait(
        &mut self,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<NotarizationOutcome> {
        let (Some(request), Some(credentials)) = (self.request.clone(), self.credentials.clone()) else {
            return Err(self.invalid_state("wait", "Submitted"));
        };
        policy.validate()?;
        let check = notarization::info_command(&credentials, &request.id);
        let mut failures = 0;

        for attempt in 1..=policy.max_attempts {
            if attempt > 1 {
                pause(policy.interval, cancel).await?;
            } else if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            log::debug!("status check {}/{} for {}", attempt, policy.max_attempts, request.id);
            let output = self.app.runner().run(&check).await?;
            if !output.success() {
                failures += 1;
                log::warn!(
                    "status check {}/{} failed ({}/{} in a row): {}",
                    attempt,
                    policy.max_attempts,
                    failures,
                    notarization::MAX_CONSECUTIVE_CHECK_FAILURES,
                    output.stderr.trim()
                );
                if failures >= notarization::MAX_CONSECUTIVE_CHECK_FAILURES {
                    output.check()?;
                }
                continue;
            }
            failures = 0;

            let combined = output.combined();
            let status = NotarizationStatus::from_output(&combined);
            if !status.is_terminal() {
                continue;
            }
            self.set_status(status);

            if status == NotarizationStatus::Approved {
                log::info!("✓ notarization approved for {}", request.id);
                self.staple().await?;
                return Ok(NotarizationOutcome::Approved);
            }

            log::error!("notarization rejected for {}", request.id);
            for line in combined.lines() {
                log::error!("{}", line);
            }
            pause(policy.grace_delay, cancel).await?;
            let log = self.fetch_log().await?;
            return Ok(NotarizationOutcome::Invalid { log });
        }

        Err(Error::NotarizationTimeout {
            request_id: request.id.to_string(),
            attempts: policy.max_attempts,
        })
    }

    fn set_status(&mut self, status: NotarizationStatus) {
        if let Some(request) = &mut self.request {
            request.status = status;
        }
        self.state = match status {
            NotarizationStatus::Submitted => PackageState::Submitted,
            NotarizationStatus::Approved => PackageState::Approved,
            NotarizationStatus::Invalid => PackageState::Invalid,
        };
    }

    /// Fetches and logs the notary service's log for the submission.
    pub async fn fetch_log(&self) -> Result<String> {
        let (Some(request), Some(credentials)) = (&self.request, &self.credentials) else {
            return Err(self.invalid_state("fetch_log", "Submitted"));
        };
        let output = self
            .app
            .runner()
            .run(&notarization::log_command(credentials, &request.id))
            .await?
            .check()?;
        let log = output.combined();
        for line in log.lines() {
            log::info!("{}", line);
        }
        Ok(log)
    }

    /// Staples the notarization ticket to the signed package.
    pub async fn staple(&self) -> Result<()> {
        let Some(signed) = self.signed_path().filter(|_| self.state >= PackageState::Signed) else {
            return Err(self.invalid_state("staple", "Signed"));
        };
        self.app
            .runner()
            .run(&notarization::staple_command(&signed))
            .await?
            .check()?;
        log::info!("✓ Stapled {}", signed.display());
        Ok(())
    }

    fn invalid_state(&self, operation: &'static str, required: &'static str) -> Error {
        Error::InvalidState {
            operation,
            required,
            current: self.state.to_string(),
        }
    }
}

async fn pause(duration: std::time::Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::app::tests::{built_app, project};
    use crate::bundler::command::{CommandOutput, testing::ScriptedRunner};
    use crate::bundler::confirm::{AutoConfirm, testing::RecordingConfirm};
    use std::time::Duration;

    const ID: &str = "2efe2717-52ef-43a5-96dc-0797e4ca1041";

    fn creds() -> Credentials {
        Credentials {
            apple_id: "dev@example.com".into(),
            password: "secret-pass".into(),
            team_id: "TEAM123456".into(),
        }
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(20),
            max_attempts: 5,
            grace_delay: Duration::from_secs(10),
        }
    }

    fn submit_output() -> String {
        format!("Submission ID received\n  id: {ID}\n")
    }

    async fn signed_package<'a>(
        app: &'a App<ScriptedRunner>,
        dir: &Path,
    ) -> Package<'a, ScriptedRunner> {
        let mut pkg = Package::new_in(app, "1.0.0", Some("com.example.demo.pkg".into()), dir).unwrap();
        pkg.build(&InstallScripts::default(), &BuildPaths::in_dir(dir))
            .await
            .unwrap();
        pkg.sign(&SigningIdentity::new(SigningRole::Installer, "WXYZ9876"))
            .await
            .unwrap();
        pkg
    }

    #[tokio::test]
    async fn unbuilt_app_fails_before_scratch_is_created() {
        let dir = project();
        let scratch_parent = tempfile::tempdir().unwrap();
        let app = App::new(ScriptedRunner::new(), "Demo", None, None);

        let err = Package::new_in(&app, "1.0", None, scratch_parent.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(std::fs::read_dir(scratch_parent.path()).unwrap().count(), 0);
        drop(dir);
    }

    #[tokio::test]
    async fn scratch_dirs_are_private_and_removed_on_drop() {
        let dir = project();
        let app = built_app(dir.path(), ScriptedRunner::new()).await;

        let a = Package::new_in(&app, "1.0", None, dir.path()).unwrap();
        let b = Package::new_in(&app, "1.0", None, dir.path()).unwrap();
        assert_ne!(a.scratch_dir(), b.scratch_dir());

        let kept = a.scratch_dir().to_path_buf();
        drop(a);
        assert!(!kept.exists());
        assert!(b.scratch_dir().is_dir());
    }

    #[tokio::test]
    async fn build_without_identifier_is_fatal() {
        let dir = project();
        let app = built_app(dir.path(), ScriptedRunner::new()).await;
        let mut pkg = Package::new_in(&app, "1.0", None, dir.path()).unwrap();

        let err = pkg
            .build(&InstallScripts::default(), &BuildPaths::in_dir(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(app.runner().count("pkgbuild"), 0);
        assert_eq!(pkg.state(), PackageState::Constructed);
    }

    #[tokio::test]
    async fn build_stages_scripts_and_runs_pkgbuild() {
        let dir = project();
        let app = built_app(dir.path(), ScriptedRunner::new()).await;
        let scripts_src = dir.path().join("scripts");
        std::fs::create_dir_all(&scripts_src).unwrap();
        std::fs::write(scripts_src.join("postinstall"), "#!/bin/bash\nexit 0\n").unwrap();
        std::fs::write(scripts_src.join("preinstall.sh"), "#!/bin/bash\nexit 0\n").unwrap();

        let mut pkg = Package::new_in(&app, "1.2.3", Some("com.example.demo.pkg".into()), dir.path()).unwrap();
        let scripts = InstallScripts {
            preinstall: Some(scripts_src.join("preinstall.sh")),
            postinstall: Some(scripts_src.join("postinstall")),
        };
        let out = pkg.build(&scripts, &BuildPaths::in_dir(dir.path())).await.unwrap();

        assert_eq!(out, dir.path().join("build/Demo.pkg"));
        assert!(pkg.scratch_dir().join("postinstall").is_file());
        assert!(!pkg.scratch_dir().join("preinstall").exists());

        let call = app.runner().calls().into_iter().find(|c| c.starts_with("pkgbuild")).unwrap();
        assert!(call.starts_with("pkgbuild --version 1.2.3 --identifier com.example.demo.pkg --scripts "));
        assert!(call.contains("--install-location /Applications/Demo.app"));
        assert!(call.ends_with("Demo.pkg"));
    }

    #[tokio::test]
    async fn sign_before_build_is_rejected() {
        let dir = project();
        let app = built_app(dir.path(), ScriptedRunner::new()).await;
        let mut pkg = Package::new_in(&app, "1.0", Some("id".into()), dir.path()).unwrap();
        let err = pkg
            .sign(&SigningIdentity::new(SigningRole::Installer, "WXYZ9876"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { operation: "sign", .. }));
        assert_eq!(app.runner().count("productsign"), 0);
    }

    #[tokio::test]
    async fn login_is_idempotent() {
        let dir = project();
        let app = built_app(dir.path(), ScriptedRunner::new()).await;
        let mut pkg = Package::new_in(&app, "1.0", None, dir.path()).unwrap();
        pkg.login(creds());
        pkg.login(Credentials {
            apple_id: "other@example.com".into(),
            ..creds()
        });
        assert_eq!(pkg.credentials.as_ref().unwrap().apple_id, "dev@example.com");
    }

    #[tokio::test]
    async fn unsigned_app_asks_before_notarizing() {
        let dir = project();
        let runner = ScriptedRunner::new().on("notarytool submit", &submit_output());
        let app = built_app(dir.path(), runner).await;
        let mut pkg = signed_package(&app, dir.path()).await;
        pkg.login(creds());

        let declined = RecordingConfirm::new(false);
        let err = pkg.notarize(&declined).await.unwrap_err();
        assert!(matches!(err, Error::Aborted(_)));
        assert_eq!(declined.prompts().len(), 1);
        assert_eq!(app.runner().count("notarytool submit"), 0);

        let request = pkg.notarize(&AutoConfirm(true)).await.unwrap();
        assert_eq!(request.id.to_string(), ID);
        assert_eq!(pkg.state(), PackageState::Submitted);
    }

    #[tokio::test]
    async fn notarize_without_login_is_a_config_error() {
        let dir = project();
        let app = built_app(dir.path(), ScriptedRunner::new()).await;
        let mut pkg = signed_package(&app, dir.path()).await;
        let err = pkg.notarize(&AutoConfirm(true)).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn approval_after_two_pending_checks_staples_once() {
        let dir = project();
        let runner = ScriptedRunner::new()
            .on("notarytool submit", &submit_output())
            .on_sequence(
                "notarytool info",
                &["  status: In Progress", "  status: In Progress", "Status Message: Package Approved"],
            );
        let app = built_app(dir.path(), runner).await;
        let mut pkg = signed_package(&app, dir.path()).await;
        pkg.login(creds());
        pkg.notarize(&AutoConfirm(true)).await.unwrap();

        let outcome = pkg.wait(&fast_policy(), &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome, NotarizationOutcome::Approved);
        assert_eq!(app.runner().count("notarytool info"), 3);
        assert_eq!(app.runner().count("stapler staple"), 1);
        assert_eq!(app.runner().count("notarytool log"), 0);
        assert_eq!(pkg.state(), PackageState::Approved);
        assert_eq!(pkg.request().unwrap().status, NotarizationStatus::Approved);
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_fetches_log_and_never_staples() {
        let dir = project();
        let runner = ScriptedRunner::new()
            .on("notarytool submit", &submit_output())
            .on_sequence("notarytool info", &["  status: In Progress", "Status Message: Package Invalid"])
            .on("notarytool log", "{\"issues\": [\"unsigned binary\"]}");
        let app = built_app(dir.path(), runner).await;
        let mut pkg = signed_package(&app, dir.path()).await;
        pkg.login(creds());
        pkg.notarize(&AutoConfirm(true)).await.unwrap();

        let outcome = pkg.wait(&fast_policy(), &CancellationToken::new()).await.unwrap();

        match outcome {
            NotarizationOutcome::Invalid { log } => assert!(log.contains("unsigned binary")),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(app.runner().count("stapler staple"), 0);
        assert_eq!(app.runner().count("notarytool log"), 1);
        assert_eq!(pkg.state(), PackageState::Invalid);
    }

    #[tokio::test(start_paused = true)]
    async fn polling_is_bounded() {
        let dir = project();
        let runner = ScriptedRunner::new()
            .on("notarytool submit", &submit_output())
            .on("notarytool info", "  status: In Progress");
        let app = built_app(dir.path(), runner).await;
        let mut pkg = signed_package(&app, dir.path()).await;
        pkg.login(creds());
        pkg.notarize(&AutoConfirm(true)).await.unwrap();

        let err = pkg.wait(&fast_policy(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotarizationTimeout { attempts: 5, .. }));
        assert_eq!(app.runner().count("notarytool info"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_stops_polling() {
        let dir = project();
        let runner = ScriptedRunner::new().on("notarytool submit", &submit_output());
        let app = built_app(dir.path(), runner).await;
        let mut pkg = signed_package(&app, dir.path()).await;
        pkg.login(creds());
        pkg.notarize(&AutoConfirm(true)).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = pkg.wait(&fast_policy(), &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(app.runner().count("notarytool info"), 0);
    }

    fn check_failed(stderr: &str) -> CommandOutput {
        CommandOutput {
            status: Some(69),
            stderr: stderr.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn policy_without_attempts_is_refused_before_checking() {
        let dir = project();
        let runner = ScriptedRunner::new()
            .on("notarytool submit", &submit_output())
            .on("notarytool info", "Status Message: Package Approved");
        let app = built_app(dir.path(), runner).await;
        let mut pkg = signed_package(&app, dir.path()).await;
        pkg.login(creds());
        pkg.notarize(&AutoConfirm(true)).await.unwrap();

        let no_attempts = PollPolicy {
            max_attempts: 0,
            ..fast_policy()
        };
        let err = pkg.wait(&no_attempts, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let no_interval = PollPolicy {
            interval: Duration::ZERO,
            ..fast_policy()
        };
        let err = pkg.wait(&no_interval, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(app.runner().count("notarytool info"), 0);
        assert_eq!(pkg.state(), PackageState::Submitted);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_check_failures_stop_polling() {
        let dir = project();
        let runner = ScriptedRunner::new()
            .on("notarytool submit", &submit_output())
            .on_output("notarytool info", check_failed("Error: HTTP status code: 401"));
        let app = built_app(dir.path(), runner).await;
        let mut pkg = signed_package(&app, dir.path()).await;
        pkg.login(creds());
        pkg.notarize(&AutoConfirm(true)).await.unwrap();

        let err = pkg.wait(&fast_policy(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
        assert_eq!(
            app.runner().count("notarytool info"),
            notarization::MAX_CONSECUTIVE_CHECK_FAILURES as usize
        );
    }

    #[tokio::test(start_paused = true)]
    async fn a_transient_check_failure_is_retried() {
        let dir = project();
        let runner = ScriptedRunner::new()
            .on("notarytool submit", &submit_output())
            .on_output("notarytool info", check_failed("Error: network connection lost"))
            .on_output("notarytool info", check_failed("Error: network connection lost"))
            .on("notarytool info", "  status: Accepted");
        let app = built_app(dir.path(), runner).await;
        let mut pkg = signed_package(&app, dir.path()).await;
        pkg.login(creds());
        pkg.notarize(&AutoConfirm(true)).await.unwrap();

        let outcome = pkg.wait(&fast_policy(), &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, NotarizationOutcome::Approved);
        assert_eq!(app.runner().count("notarytool info"), 3);
        assert_eq!(app.runner().count("stapler staple"), 1);
    }

    #[tokio::test]
    async fn wait_before_notarize_is_rejected() {
        let dir = project();
        let app = built_app(dir.path(), ScriptedRunner::new()).await;
        let mut pkg = signed_package(&app, dir.path()).await;
        let err = pkg
            .wait(&PollPolicy::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { operation: "wait", .. }));
    }
}
