//! `.app` bundle lifecycle: configure → build → sign.
//!
//! # States
//!
//! ```text
//! Unconfigured --configure--> Configured --build--> Built --sign--> Signed
//! ```
//!
//! [`App::verify`] is a read-only diagnostic and does not move the state.
//! Calling an operation before its predecessor fails with
//! [`Error::InvalidState`] without invoking any external tool.

pub mod document_types;
pub mod entitlements;
pub mod info_plist;

use crate::bundler::{
    command::{CommandRunner, ToolCommand},
    error::{Error, ErrorExt, Result},
    identity::{SigningIdentity, SigningRole},
    settings::{BundlerLogLevel, TargetArch},
    spec::{self, DataBundle, SpecParams},
};
use document_types::DocumentType;
use info_plist::InfoPlistPatch;
use path_absolutize::Absolutize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Lifecycle position of an [`App`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, serde::Serialize)]
pub enum AppState {
    /// Created, no spec yet.
    Unconfigured,
    /// Spec generated or supplied.
    Configured,
    /// `.app` produced and Info.plist patched.
    Built,
    /// `codesign` applied.
    Signed,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Where build products and intermediates go.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildPaths {
    /// Final artifacts (`<Name>.app`, signed `<Name>.pkg`).
    pub dist: PathBuf,
    /// Intermediates (PyInstaller work dir, unsigned `<Name>.pkg`).
    pub build: PathBuf,
}

impl BuildPaths {
    /// `dist/` and `build/` under `root`.
    pub fn in_dir(root: &Path) -> Self {
        Self {
            dist: root.join("dist"),
            build: root.join("build"),
        }
    }

    /// Creates both directories if they are missing.
    pub async fn ensure(&self) -> Result<()> {
        for (label, dir) in [("dist_path", &self.dist), ("build_path", &self.build)] {
            if dir.is_dir() {
                continue;
            }
            log::warn!("{} ('{}') does not exist; attempting to create", label, dir.display());
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::Config(format!(
                    "failed to create non-existent {} ('{}'): {}",
                    label,
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

/// Input to [`App::configure`].
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Entry `.py` script.
    pub entry: PathBuf,
    /// Target architecture.
    pub arch: TargetArch,
    /// Entitlements `.plist`; the minimum default is written when absent.
    pub entitlements: Option<PathBuf>,
    /// Directory for the `.spec` and default entitlements.
    pub spec_dir: PathBuf,
    /// PyInstaller verbosity for both spec generation and build.
    pub log_level: BundlerLogLevel,
    /// Modules PyInstaller cannot discover statically.
    pub hidden_imports: Vec<String>,
    /// Packages whose submodules are all collected.
    pub collect_submodules: Vec<String>,
    /// Extra data bundled with the app.
    pub data: Vec<DataBundle>,
    /// Custom URL scheme registered in Info.plist after the build.
    pub url_scheme: Option<String>,
    /// Document types registered in Info.plist after the build.
    pub document_types: Vec<DocumentType>,
    /// Use this `.spec` instead of generating one.
    pub custom_spec: Option<PathBuf>,
    /// Log spec validation failures instead of failing.
    pub brute: bool,
}

impl AppConfig {
    /// Defaults for everything but the entry script and spec directory.
    pub fn new(entry: impl Into<PathBuf>, spec_dir: impl Into<PathBuf>) -> Self {
        Self {
            entry: entry.into(),
            arch: TargetArch::default(),
            entitlements: None,
            spec_dir: spec_dir.into(),
            log_level: BundlerLogLevel::default(),
            hidden_imports: Vec::new(),
            collect_submodules: Vec::new(),
            data: Vec::new(),
            url_scheme: None,
            document_types: Vec::new(),
            custom_spec: None,
            brute: false,
        }
    }
}

/// Output of [`App::verify`].
#[derive(Clone, Debug, serde::Serialize)]
pub struct VerifyReport {
    /// `codesign --verify` exited successfully.
    pub verified: bool,
    /// Combined diagnostic output of both codesign calls.
    pub details: String,
}

/// A PyInstaller-built macOS application.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_macapp::bundler::{App, AppConfig, BuildPaths, ShellRunner, SigningRole, resolve_identity};
///
/// # async fn example() -> kodegen_bundler_macapp::bundler::Result<()> {
/// let runner = ShellRunner::default_in(".")?;
/// let mut app = App::new(runner, "My First App", Some("com.example.first".into()), None);
/// app.configure(AppConfig::new("src/main.py", "build")).await?;
/// app.build(&BuildPaths::in_dir(std::path::Path::new("."))).await?;
/// if let Some(identity) = resolve_identity(app.runner(), SigningRole::Application).await? {
///     app.sign(&identity).await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct App<R: CommandRunner> {
    runner: R,
    name: String,
    identifier: Option<String>,
    icon: Option<PathBuf>,
    spec: Option<PathBuf>,
    spec_dir: Option<PathBuf>,
    entitlements: Option<PathBuf>,
    log_level: BundlerLogLevel,
    plist_patch: InfoPlistPatch,
    bundle: Option<PathBuf>,
    state: AppState,
}

impl<R: CommandRunner> fmt::Debug for App<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("name", &self.name)
            .field("identifier", &self.identifier)
            .field("state", &self.state)
            .field("bundle", &self.bundle)
            .finish_non_exhaustive()
    }
}

impl<R: CommandRunner> App<R> {
    /// Creates an unconfigured app.
    ///
    /// A trailing `.app` on `name` is stripped. A missing icon is ignored.
    pub fn new(runner: R, name: &str, identifier: Option<String>, icon: Option<PathBuf>) -> Self {
        let name = match name.strip_suffix(".app") {
            Some(stripped) => {
                log::info!(
                    "name '{}' should not end in .app; this will be removed automatically ({} -> {})",
                    name,
                    name,
                    stripped
                );
                stripped.to_string()
            }
            None => name.to_string(),
        };

        let icon = icon.and_then(|icon| {
            if icon.is_file() {
                icon.absolutize().ok().map(|p| p.into_owned())
            } else {
                log::info!("{} does not exist or is not a file; it will be ignored", icon.display());
                None
            }
        });

        let app = Self {
            runner,
            name,
            identifier,
            icon,
            spec: None,
            spec_dir: None,
            entitlements: None,
            log_level: BundlerLogLevel::default(),
            plist_patch: InfoPlistPatch::default(),
            bundle: None,
            state: AppState::Unconfigured,
        };
        log::debug!("{:?} created", app);
        app
    }

    /// Application name without `.app`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bundle identifier.
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AppState {
        self.state
    }

    /// Whether [`App::sign`] has completed.
    pub fn is_signed(&self) -> bool {
        self.state == AppState::Signed
    }

    /// `.spec` used for the build, once configured.
    pub fn spec_path(&self) -> Option<&Path> {
        self.spec.as_deref()
    }

    /// Built `.app`, once built.
    pub fn bundle_path(&self) -> Option<&Path> {
        self.bundle.as_deref()
    }

    /// Runner shared with packages created from this app.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Prepares the `.spec` for the build.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the entry script or a custom spec does not exist,
    /// or a spec parameter fails validation.
    pub async fn configure(&mut self, config: AppConfig) -> Result<()> {
        if !config.entry.is_file() {
            return Err(Error::Config(format!(
                "entry script '{}' does not exist",
                config.entry.display()
            )));
        }
        if self.state > AppState::Configured {
            log::warn!("reconfiguring {} discards its {} state", self.name, self.state);
        }

        tokio::fs::create_dir_all(&config.spec_dir)
            .await
            .fs_context("creating spec directory", &config.spec_dir)?;

        let entitlements = match &config.entitlements {
            Some(path) if path.is_file() => path.clone(),
            Some(path) => {
                log::warn!(
                    "entitlements '{}' do not exist; using default entitlements",
                    path.display()
                );
                entitlements::ensure_minimum_entitlements(&config.spec_dir).await?
            }
            None => entitlements::ensure_minimum_entitlements(&config.spec_dir).await?,
        };

        let spec = match &config.custom_spec {
            Some(custom) => {
                if !custom.is_file() {
                    return Err(Error::Config(format!(
                        "custom spec {} does not exist!",
                        custom.display()
                    )));
                }
                custom.clone()
            }
            None => {
                let params = SpecParams {
                    name: self.name.clone(),
                    entry: config.entry.clone(),
                    icon: self.icon.clone(),
                    identifier: self.identifier.clone(),
                    arch: config.arch,
                    entitlements: Some(entitlements.clone()),
                    spec_dir: Some(config.spec_dir.clone()),
                    log_level: config.log_level,
                    hidden_imports: config.hidden_imports.clone(),
                    collect_submodules: config.collect_submodules.clone(),
                    data: config.data.clone(),
                    windowed: true,
                    brute: config.brute,
                };
                spec::generate_spec(&self.runner, &params).await?
            }
        };

        if config.url_scheme.is_some() {
            log::debug!("url scheme is added after the app is built and before it is signed");
        }

        self.spec = Some(spec);
        self.spec_dir = Some(config.spec_dir);
        self.entitlements = Some(entitlements);
        self.log_level = config.log_level;
        self.plist_patch = InfoPlistPatch {
            url_scheme: config.url_scheme,
            url_name: self.identifier.clone(),
            document_types: config.document_types,
        };
        self.bundle = None;
        self.state = AppState::Configured;
        Ok(())
    }

    /// Runs PyInstaller and patches the resulting Info.plist.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] before [`App::configure`]; [`Error::Config`] if
    /// the output directories cannot be created; tool failures otherwise.
    pub async fn build(&mut self, paths: &BuildPaths) -> Result<PathBuf> {
        let spec = match (&self.spec, self.state) {
            (Some(spec), state) if state >= AppState::Configured => spec.clone(),
            _ => {
                log::error!("{} has no spec; call configure(...) first", self.name);
                return Err(self.invalid_state("build", "Configured"));
            }
        };

        let start = Instant::now();
        log::info!("(app) build initiated");
        paths.ensure().await?;

        let command = ToolCommand::new("pyinstaller")
            .arg("--noconfirm")
            .arg("--log-level")
            .arg(self.log_level.as_str())
            .arg("--distpath")
            .path_arg(&paths.dist)
            .arg("--workpath")
            .path_arg(&paths.build)
            .path_arg(&spec);
        self.runner.run(&command).await?.check()?;

        let bundle = paths.dist.join(format!("{}.app", self.name));
        if !bundle.is_dir() {
            return Err(Error::GenericError(format!(
                "pyinstaller finished but {} does not exist",
                bundle.display()
            )));
        }

        if !self.plist_patch.is_empty() {
            log::debug!("registering url scheme / document types in Info.plist");
            info_plist::patch_info_plist(&bundle, &self.plist_patch).await?;
        }

        self.bundle = Some(bundle.clone());
        self.state = AppState::Built;
        log::info!(
            "(app) build completed in {:.2} second(s)",
            start.elapsed().as_secs_f64()
        );
        Ok(bundle)
    }

    /// Signs the bundle with hardened runtime and a secure timestamp.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] before [`App::build`]; tool failures otherwise.
    pub async fn sign(&mut self, identity: &SigningIdentity) -> Result<()> {
        let bundle = match (&self.bundle, self.state) {
            (Some(bundle), state) if state >= AppState::Built => bundle.clone(),
            _ => {
                log::error!(".app for {} does not exist; call build(...) first", self.name);
                return Err(self.invalid_state("sign", "Built"));
            }
        };
        if identity.role != SigningRole::Application {
            log::warn!(
                "signing {} with a '{}' identity; codesign expects '{}'",
                self.name,
                identity.role,
                SigningRole::Application
            );
        }

        let entitlements = match &self.entitlements {
            Some(path) if path.is_file() => path.clone(),
            _ => {
                let dir = self
                    .spec_dir
                    .clone()
                    .unwrap_or_else(|| bundle.parent().unwrap_or(bundle.as_path()).to_path_buf());
                log::info!("using default entitlements");
                entitlements::ensure_minimum_entitlements(&dir).await?
            }
        };

        let command = ToolCommand::new("codesign")
            .args(["--deep", "--force", "--timestamp", "--options", "runtime"])
            .arg("--entitlements")
            .path_arg(&entitlements)
            .arg("--sign")
            .arg(identity.hash.as_str())
            .path_arg(&bundle);
        self.runner.run(&command).await?.check()?;

        self.state = AppState::Signed;
        log::info!("✓ Signed {}", bundle.display());
        Ok(())
    }

    /// Dumps codesign's verification and signature details.
    ///
    /// Diagnostic only; does not change state or gate later steps.
    pub async fn verify(&self) -> Result<VerifyReport> {
        let Some(bundle) = &self.bundle else {
            return Err(self.invalid_state("verify", "Built"));
        };

        log::info!("***** begin signature verification *****");
        let check = self
            .runner
            .run(
                &ToolCommand::new("codesign")
                    .args(["--verify", "--verbose"])
                    .path_arg(bundle),
            )
            .await?;
        let dump = self
            .runner
            .run(&ToolCommand::new("codesign").arg("-dvvv").path_arg(bundle))
            .await?;
        log::info!("***** end signature verification *****");

        Ok(VerifyReport {
            verified: check.success(),
            details: format!("{}\n{}", check.combined(), dump.combined())
                .trim()
                .to_string(),
        })
    }

    fn invalid_state(&self, operation: &'static str, required: &'static str) -> Error {
        Error::InvalidState {
            operation,
            required,
            current: self.state.to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bundler::command::testing::ScriptedRunner;

    /// Project dir with an entry script and a pre-made spec.
    pub(crate) fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.py"), "print('hi')\n").unwrap();
        std::fs::write(dir.path().join("Demo.spec"), "# spec\n").unwrap();
        dir
    }

    /// Simulates what pyinstaller leaves behind in `dist`.
    pub(crate) fn fake_bundle(dist: &Path, name: &str) -> PathBuf {
        let bundle = dist.join(format!("{}.app", name));
        std::fs::create_dir_all(bundle.join("Contents")).unwrap();
        let mut dict = plist::Dictionary::new();
        dict.insert("CFBundleName".into(), name.into());
        plist::Value::Dictionary(dict)
            .to_file_xml(bundle.join("Contents/Info.plist"))
            .unwrap();
        bundle
    }

    pub(crate) async fn built_app(dir: &Path, runner: ScriptedRunner) -> App<ScriptedRunner> {
        let mut app = App::new(runner, "Demo", Some("com.example.demo".into()), None);
        let mut config = AppConfig::new(dir.join("main.py"), dir.join("build"));
        config.custom_spec = Some(dir.join("Demo.spec"));
        app.configure(config).await.unwrap();
        fake_bundle(&dir.join("dist"), "Demo");
        app.build(&BuildPaths::in_dir(dir)).await.unwrap();
        app
    }

    #[test]
    fn name_suffix_is_stripped() {
        let app = App::new(ScriptedRunner::new(), "Demo.app", None, Some("/no/icon.icns".into()));
        assert_eq!(app.name(), "Demo");
        assert!(app.icon.is_none());
        assert_eq!(app.state(), AppState::Unconfigured);
    }

    #[tokio::test]
    async fn build_before_configure_never_runs_pyinstaller() {
        let dir = project();
        let mut app = App::new(ScriptedRunner::new(), "Demo", None, None);
        let err = app.build(&BuildPaths::in_dir(dir.path())).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { operation: "build", .. }));
        assert!(app.runner().calls().is_empty());
        assert!(!dir.path().join("dist").exists());
    }

    #[tokio::test]
    async fn sign_before_build_is_rejected() {
        let mut app = App::new(ScriptedRunner::new(), "Demo", None, None);
        let id = SigningIdentity::new(SigningRole::Application, "ABCD1234");
        let err = app.sign(&id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { operation: "sign", .. }));
        assert!(app.runner().calls().is_empty());
    }

    #[tokio::test]
    async fn missing_entry_or_custom_spec_is_fatal() {
        let dir = project();
        let mut app = App::new(ScriptedRunner::new(), "Demo", None, None);

        let config = AppConfig::new(dir.path().join("nope.py"), dir.path().join("build"));
        assert!(matches!(app.configure(config).await, Err(Error::Config(_))));

        let mut config = AppConfig::new(dir.path().join("main.py"), dir.path().join("build"));
        config.custom_spec = Some(dir.path().join("missing.spec"));
        assert!(matches!(app.configure(config).await, Err(Error::Config(_))));
        assert_eq!(app.state(), AppState::Unconfigured);
    }

    #[tokio::test]
    async fn configure_generates_spec_and_default_entitlements() {
        let dir = project();
        let spec = dir.path().join("build").join("Demo.spec");
        let runner = ScriptedRunner::new().on("pyi-makespec", &format!("Wrote {}.", spec.display()));
        let mut app = App::new(runner, "Demo", Some("com.example.demo".into()), None);

        app.configure(AppConfig::new(dir.path().join("main.py"), dir.path().join("build")))
            .await
            .unwrap();

        assert_eq!(app.state(), AppState::Configured);
        assert_eq!(app.spec_path(), Some(spec.as_path()));
        assert!(dir.path().join("build/entitlements.plist").is_file());
        let call = &app.runner().calls()[0];
        assert!(call.contains("--osx-entitlements-file"));
        assert!(call.contains("--osx-bundle-identifier com.example.demo"));
    }

    #[tokio::test]
    async fn full_lifecycle_patches_plist_before_signing() {
        let dir = project();
        let mut app = App::new(ScriptedRunner::new(), "Demo", Some("com.example.demo".into()), None);
        let mut config = AppConfig::new(dir.path().join("main.py"), dir.path().join("build"));
        config.custom_spec = Some(dir.path().join("Demo.spec"));
        config.url_scheme = Some("demo".into());
        app.configure(config).await.unwrap();

        let bundle = fake_bundle(&dir.path().join("dist"), "Demo");
        assert_eq!(app.build(&BuildPaths::in_dir(dir.path())).await.unwrap(), bundle);
        assert_eq!(app.state(), AppState::Built);

        let plist = plist::Value::from_file(bundle.join("Contents/Info.plist")).unwrap();
        assert!(plist.as_dictionary().unwrap().contains_key("CFBundleURLTypes"));

        let id = SigningIdentity::new(SigningRole::Application, "ABCD1234");
        app.sign(&id).await.unwrap();
        assert!(app.is_signed());

        let calls = app.runner().calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("pyinstaller --noconfirm --log-level WARN --distpath"));
        assert!(calls[1].starts_with("codesign --deep --force --timestamp --options runtime --entitlements"));
        assert!(calls[1].contains("--sign ABCD1234"));
    }

    #[tokio::test]
    async fn failed_pyinstaller_stops_the_chain() {
        let dir = project();
        let runner = ScriptedRunner::new().on_output(
            "pyinstaller",
            crate::bundler::command::CommandOutput {
                status: Some(1),
                stderr: "SyntaxError".into(),
                ..Default::default()
            },
        );
        let mut app = App::new(runner, "Demo", None, None);
        let mut config = AppConfig::new(dir.path().join("main.py"), dir.path().join("build"));
        config.custom_spec = Some(dir.path().join("Demo.spec"));
        app.configure(config).await.unwrap();

        let err = app.build(&BuildPaths::in_dir(dir.path())).await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
        assert_eq!(app.state(), AppState::Configured);
    }

    #[tokio::test]
    async fn verify_reports_without_changing_state() {
        let dir = project();
        let runner = ScriptedRunner::new().on("-dvvv", "Authority=Developer ID Application");
        let app = built_app(dir.path(), runner).await;
        let report = app.verify().await.unwrap();
        assert!(report.verified);
        assert!(report.details.contains("Authority=Developer ID Application"));
        assert_eq!(app.state(), AppState::Built);
    }
}
