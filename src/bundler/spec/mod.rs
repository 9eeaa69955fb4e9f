//! PyInstaller `.spec` generation.
//!
//! Builds a `pyi-makespec` invocation from declarative parameters, validating
//! each one first, and returns the absolute path of the spec file the tool
//! reports having written.
//!
//! # Validation policy
//!
//! Name, entry script, icon, identifier, entitlements, spec directory and data
//! bundles are checked by [`validate`]. A failed check is fatal unless
//! [`SpecParams::brute`] is set, in which case it is logged and the value is
//! passed through anyway. Architecture and log level are typed enums
//! ([`TargetArch`], [`BundlerLogLevel`]) so an invalid value never gets this far.

pub mod validate;

use crate::bundler::{
    command::{CommandRunner, ToolCommand},
    error::{Error, Result},
    settings::{BundlerLogLevel, TargetArch},
};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Marker preceding the spec path in `pyi-makespec` output.
const WROTE_MARKER: &str = "Wrote ";

/// Non-Python file or directory copied into the bundle (`--add-data`).
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct DataBundle {
    /// File or directory to include.
    pub src: PathBuf,
    /// Destination inside the bundle, `.` for the root.
    pub dest: String,
}

impl DataBundle {
    /// Creates a data bundle entry.
    pub fn new(src: impl Into<PathBuf>, dest: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
        }
    }

    fn as_arg(&self) -> String {
        format!("{}:{}", self.src.display(), self.dest)
    }
}

/// Declarative input to the spec generator.
#[derive(Clone, Debug)]
pub struct SpecParams {
    /// Application name (without `.app`).
    pub name: String,
    /// Entry `.py` script.
    pub entry: PathBuf,
    /// Icon file.
    pub icon: Option<PathBuf>,
    /// Bundle identifier (`--osx-bundle-identifier`).
    pub identifier: Option<String>,
    /// Target architecture.
    pub arch: TargetArch,
    /// Entitlements `.plist`.
    pub entitlements: Option<PathBuf>,
    /// Directory the `.spec` is written to.
    pub spec_dir: Option<PathBuf>,
    /// PyInstaller verbosity.
    pub log_level: BundlerLogLevel,
    /// Modules PyInstaller cannot discover statically.
    pub hidden_imports: Vec<String>,
    /// Packages whose submodules are all collected.
    pub collect_submodules: Vec<String>,
    /// Extra data bundled with the app.
    pub data: Vec<DataBundle>,
    /// Produce a windowed `.app` (no terminal).
    pub windowed: bool,
    /// Log validation failures instead of failing.
    pub brute: bool,
}

impl SpecParams {
    /// Parameters with defaults for everything but name and entry script.
    pub fn new(name: impl Into<String>, entry: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            entry: entry.into(),
            icon: None,
            identifier: None,
            arch: TargetArch::default(),
            entitlements: None,
            spec_dir: None,
            log_level: BundlerLogLevel::default(),
            hidden_imports: Vec::new(),
            collect_submodules: Vec::new(),
            data: Vec::new(),
            windowed: true,
            brute: false,
        }
    }

    /// Applies the brute policy to a failed check.
    fn enforce(&self, valid: bool, what: &str, value: impl std::fmt::Display) -> Result<()> {
        if valid {
            return Ok(());
        }
        if self.brute {
            log::warn!("unable to validate {}='{}'; including anyway (brute)", what, value);
            Ok(())
        } else {
            Err(Error::Config(format!("unable to validate {}='{}'", what, value)))
        }
    }
}

/// Assembles the `pyi-makespec` command for `params`.
///
/// # Errors
///
/// [`Error::Config`] for the first parameter that fails validation when
/// `brute` is off.
pub fn build_spec_command(params: &SpecParams) -> Result<ToolCommand> {
    params.enforce(validate::app_name(&params.name), "name", &params.name)?;
    params.enforce(
        validate::file(&params.entry, Some(".py")),
        "main_script",
        params.entry.display(),
    )?;

    let mut cmd = ToolCommand::new("pyi-makespec")
        .arg("--name")
        .arg(params.name.as_str());

    if params.windowed {
        cmd = cmd.arg("--windowed");
    }

    if let Some(icon) = &params.icon {
        params.enforce(validate::file(icon, None), "icon", icon.display())?;
        cmd = cmd.arg("--icon").path_arg(icon);
        log::debug!("adding --icon '{}'", icon.display());
    }

    if let Some(identifier) = &params.identifier {
        params.enforce(validate::identifier(identifier), "identifier", identifier)?;
        cmd = cmd.arg("--osx-bundle-identifier").arg(identifier.as_str());
        log::debug!("adding: --osx-bundle-identifier {}", identifier);
    }

    cmd = cmd.arg("--target-architecture").arg(params.arch.as_str());
    log::debug!("adding: --target-architecture {}", params.arch);

    if let Some(entitlements) = &params.entitlements {
        params.enforce(
            validate::file(entitlements, Some(".plist")),
            "entitlements",
            entitlements.display(),
        )?;
        cmd = cmd.arg("--osx-entitlements-file").path_arg(entitlements);
        log::debug!("adding --osx-entitlements-file '{}'", entitlements.display());
    }

    for module in &params.hidden_imports {
        cmd = cmd.arg("--hidden-import").arg(module.as_str());
    }

    for package in &params.collect_submodules {
        cmd = cmd.arg("--collect-submodules").arg(package.as_str());
    }

    for data in &params.data {
        params.enforce(data.src.exists(), "add_data", data.src.display())?;
        cmd = cmd.arg("--add-data").arg(data.as_arg());
    }

    if let Some(spec_dir) = &params.spec_dir {
        params.enforce(validate::directory(spec_dir), "specpath", spec_dir.display())?;
        cmd = cmd.arg("--specpath").path_arg(spec_dir);
        log::debug!("adding --specpath '{}'", spec_dir.display());
    }

    cmd = cmd.arg("--log-level").arg(params.log_level.as_str());

    Ok(cmd.path_arg(&params.entry))
}

/// Extracts the spec path from the tool's `Wrote <path>.` confirmation line.
pub fn parse_written_path(output: &str) -> Option<PathBuf> {
    output.lines().find_map(|line| {
        let (_, rest) = line.split_once(WROTE_MARKER)?;
        let path = rest.trim();
        let path = path.strip_suffix('.').unwrap_or(path);
        (!path.is_empty()).then(|| PathBuf::from(path))
    })
}

/// Runs `pyi-makespec` and returns the absolute path of the written spec.
///
/// # Errors
///
/// Validation errors from [`build_spec_command`], [`Error::CommandFailed`] if
/// the tool exits non-zero, and [`Error::SpecNotWritten`] if its output has
/// no confirmation line.
pub async fn generate_spec<R: CommandRunner>(runner: &R, params: &SpecParams) -> Result<PathBuf> {
    let command = build_spec_command(params)?;
    let output = runner.run(&command).await?.check()?;

    // pyi-makespec logs through stderr on some versions
    let written = parse_written_path(&output.combined())
        .ok_or_else(|| Error::SpecNotWritten(output.combined().trim().to_string()))?;

    let absolute = absolutize(&written, params.spec_dir.as_deref())?;
    log::info!("✓ Wrote spec file {}", absolute.display());
    Ok(absolute)
}

fn absolutize(path: &Path, base: Option<&Path>) -> Result<PathBuf> {
    let absolute = match base {
        Some(base) if path.is_relative() => path.absolutize_from(base)?,
        _ => path.absolutize()?,
    };
    Ok(absolute.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::command::testing::ScriptedRunner;

    fn fixture() -> (tempfile::TempDir, SpecParams) {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("main.py");
        std::fs::write(&entry, "print('hello')\n").unwrap();
        let mut params = SpecParams::new("My First App", entry);
        params.spec_dir = Some(dir.path().to_path_buf());
        (dir, params)
    }

    #[test]
    fn command_contains_validated_parameters() {
        let (dir, mut params) = fixture();
        params.identifier = Some("com.example.first".into());
        params.arch = TargetArch::Arm64;
        params.hidden_imports = vec!["pkg_resources".into()];

        let cmd = build_spec_command(&params).unwrap();
        let line = cmd.shell_line();
        assert!(line.starts_with("pyi-makespec --name 'My First App' --windowed"));
        assert!(line.contains("--osx-bundle-identifier com.example.first"));
        assert!(line.contains("--target-architecture arm64"));
        assert!(line.contains("--hidden-import pkg_resources"));
        assert!(line.contains("--log-level WARN"));
        assert!(line.ends_with(&dir.path().join("main.py").display().to_string()));
    }

    #[test]
    fn invalid_identifier_is_fatal_without_brute() {
        let (_dir, mut params) = fixture();
        params.identifier = Some("com.example/bad".into());
        let err = build_spec_command(&params).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn brute_includes_invalid_values() {
        let (_dir, mut params) = fixture();
        params.identifier = Some("com.example/bad".into());
        params.icon = Some("/no/such/icon.icns".into());
        params.brute = true;
        let line = build_spec_command(&params).unwrap().shell_line();
        assert!(line.contains("--osx-bundle-identifier com.example/bad"));
        assert!(line.contains("--icon /no/such/icon.icns"));
    }

    #[test]
    fn entry_must_be_python() {
        let (dir, mut params) = fixture();
        let other = dir.path().join("main.rb");
        std::fs::write(&other, "").unwrap();
        params.entry = other;
        assert!(build_spec_command(&params).is_err());
    }

    #[test]
    fn entitlements_must_be_plist() {
        let (dir, mut params) = fixture();
        let ent = dir.path().join("entitlements.xml");
        std::fs::write(&ent, "").unwrap();
        params.entitlements = Some(ent);
        assert!(build_spec_command(&params).is_err());
    }

    #[test]
    fn parses_wrote_line() {
        let out = "12 INFO: something\nWrote /tmp/build/My First App.spec.\nNow run pyinstaller.py to build the executable.\n";
        assert_eq!(
            parse_written_path(out).unwrap(),
            PathBuf::from("/tmp/build/My First App.spec")
        );
        assert!(parse_written_path("nothing here").is_none());
    }

    #[tokio::test]
    async fn generate_returns_absolute_spec_path() {
        let (dir, params) = fixture();
        let spec = dir.path().join("My First App.spec");
        let runner = ScriptedRunner::new()
            .on("pyi-makespec", &format!("Wrote {}.\n", spec.display()));
        let path = generate_spec(&runner, &params).await.unwrap();
        assert_eq!(path, spec);
        assert_eq!(runner.count("pyi-makespec"), 1);
    }

    #[tokio::test]
    async fn generate_without_confirmation_fails() {
        let (_dir, params) = fixture();
        let runner = ScriptedRunner::new().on("pyi-makespec", "usage: pyi-makespec ...");
        let err = generate_spec(&runner, &params).await.unwrap_err();
        assert!(matches!(err, Error::SpecNotWritten(_)));
    }
}
