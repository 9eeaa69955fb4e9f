//! `release`: the full pipeline from a manifest.

use crate::bundler::{
    ArtifactKind, AutoConfirm, Confirm, Credentials, NotarizationOutcome, ReleaseOptions,
    ReleaseReport, Releaser, Settings, ShellRunner, StdinConfirm, preflight,
};
use crate::cli::RuntimeConfig;
use crate::error::{BundlerError, CliError, EXIT_REJECTED, Result};
use crate::metadata::load_manifest;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Command line inputs for `release`.
#[derive(Default)]
pub struct ReleaseArgs<'a> {
    /// Manifest to load.
    pub manifest: PathBuf,
    /// Stop after signing the installer.
    pub skip_notarize: bool,
    /// Verify the app signature.
    pub verify: bool,
    /// Answer every prompt with yes.
    pub yes: bool,
    /// Overrides `[notary] max_attempts`.
    pub max_attempts: Option<u32>,
    /// Overrides `[notary] apple_id`.
    pub apple_id: Option<&'a str>,
    /// Overrides `[notary] team_id`.
    pub team_id: Option<&'a str>,
    /// App-specific password.
    pub password: Option<&'a str>,
    /// Print the report as JSON.
    pub json: bool,
}

/// Applies command line overrides on top of the manifest's `[notary]`.
pub fn apply_overrides(settings: &mut Settings, args: &ReleaseArgs<'_>) {
    let notary = settings.notary_mut();
    if let Some(max) = args.max_attempts {
        notary.max_attempts = max;
    }
    if let Some(apple_id) = args.apple_id {
        notary.apple_id = Some(apple_id.to_string());
    }
    if let Some(team_id) = args.team_id {
        notary.team_id = Some(team_id.to_string());
    }
}

/// Assembles notary credentials; the password is prompted for when absent
/// and prompting is allowed.
pub fn credentials(settings: &Settings, password: Option<&str>, interactive: bool) -> Result<Credentials> {
    let apple_id = settings
        .notary()
        .apple_id
        .clone()
        .ok_or_else(|| missing("apple-id"))?;
    let team_id = settings
        .notary()
        .team_id
        .clone()
        .ok_or_else(|| missing("team-id"))?;
    let password = match password {
        Some(p) if !p.is_empty() => p.to_string(),
        _ if interactive => prompt_password(&apple_id)?,
        _ => return Err(missing("password")),
    };
    Ok(Credentials {
        apple_id,
        password,
        team_id,
    })
}

fn missing(argument: &str) -> BundlerError {
    BundlerError::Cli(CliError::MissingArgument {
        argument: argument.to_string(),
    })
}

fn prompt_password(apple_id: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "App-specific password for {}: ", apple_id)?;
    stdout.flush()?;
    let password = read_hidden_line()?.trim().to_string();
    if password.is_empty() {
        return Err(missing("password"));
    }
    Ok(password)
}

/// Reads one line from stdin with terminal echo off. Piped input is read as is.
#[cfg(unix)]
fn read_hidden_line() -> io::Result<String> {
    use nix::sys::termios::{self, SetArg};

    let stdin = io::stdin();
    let original = termios::tcgetattr(&stdin).ok();
    if let Some(original) = &original {
        termios::tcsetattr(&stdin, SetArg::TCSANOW, &without_echo(original))?;
    }

    let mut line = String::new();
    let read = stdin.lock().read_line(&mut line);
    if let Some(original) = &original {
        if let Err(e) = termios::tcsetattr(&stdin, SetArg::TCSANOW, original) {
            log::warn!("failed to restore terminal echo: {}", e);
        }
    }
    read?;
    Ok(line)
}

/// Terminal settings that hide typed characters but still end the line.
#[cfg(unix)]
fn without_echo(original: &nix::sys::termios::Termios) -> nix::sys::termios::Termios {
    use nix::sys::termios::LocalFlags;

    let mut hidden = original.clone();
    hidden.local_flags.remove(LocalFlags::ECHO);
    hidden.local_flags.insert(LocalFlags::ECHONL);
    hidden
}

#[cfg(not(unix))]
fn read_hidden_line() -> io::Result<String> {
    log::warn!("input is echoed on this platform; prefer APPLE_APP_SPECIFIC_PASSWORD");
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

/// Runs `release`.
pub async fn execute(args: ReleaseArgs<'_>, config: &RuntimeConfig) -> Result<i32> {
    let mut settings = load_manifest(&args.manifest)?;
    apply_overrides(&mut settings, &args);

    let options = ReleaseOptions {
        notarize: !args.skip_notarize,
        verify: args.verify,
    };
    preflight(&options)?;

    let credentials = if options.notarize {
        Some(credentials(&settings, args.password, !args.yes)?)
    } else {
        None
    };

    config.section(&format!(
        "Releasing {} {}",
        settings.product_name(),
        settings.version_string()
    ))?;

    let runner = ShellRunner::default_in(settings.root())?;
    let confirm: Arc<dyn Confirm> = if args.yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(StdinConfirm)
    };

    // Steps check the token between tool runs; prompts and polling abandon
    // their wait as soon as it fires.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received; stopping once the running tool exits");
            on_signal.cancel();
        }
    });

    let result = Releaser::new(settings, runner)
        .release(&options, confirm, credentials, &cancel)
        .await;
    watcher.abort();
    let report = result?;

    if args.json {
        config.output().raw(&serde_json::to_string_pretty(&report)?)?;
    } else {
        summarize(&report, config)?;
    }

    if report.rejected() {
        return Ok(EXIT_REJECTED);
    }
    Ok(0)
}

fn summarize(report: &ReleaseReport, config: &RuntimeConfig) -> io::Result<()> {
    for artifact in &report.artifacts {
        let kind = match artifact.kind {
            ArtifactKind::App => "app",
            ArtifactKind::Installer => "installer",
        };
        config.indent(&format!(
            "{:<9} {} ({} bytes, sha256 {}){}",
            kind,
            artifact.path.display(),
            artifact.size,
            artifact.checksum,
            if artifact.signed { "" } else { " [unsigned]" }
        ))?;
    }
    if let Some(verification) = &report.verification {
        if verification.verified {
            config.success("Signature verified")?;
        } else {
            config.warn("Signature verification failed")?;
            config.verbose_println(&verification.details)?;
        }
    }
    match &report.notarization {
        Some(NotarizationOutcome::Approved) => {
            config.success("Notarized and stapled")?;
        }
        Some(NotarizationOutcome::Invalid { log }) => {
            config.output().error("Notarization rejected")?;
            config.output().raw(log)?;
        }
        None => {}
    }
    config.success(&format!("Released {} {}", report.name, report.version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{AppSettings, NotarySettings, PackageSettings, SettingsBuilder};

    fn settings(notary: NotarySettings) -> Settings {
        SettingsBuilder::new()
            .root("/tmp/project")
            .app_settings(AppSettings {
                name: "Demo".into(),
                entry: "app.py".into(),
                ..Default::default()
            })
            .package_settings(PackageSettings {
                version: "1.0".into(),
                ..Default::default()
            })
            .notary_settings(notary)
            .build()
            .unwrap()
    }

    #[test]
    fn flags_override_the_manifest() {
        let mut s = settings(NotarySettings {
            apple_id: Some("old@example.com".into()),
            ..Default::default()
        });
        apply_overrides(
            &mut s,
            &ReleaseArgs {
                manifest: PathBuf::from("macapp.toml"),
                max_attempts: Some(3),
                apple_id: Some("new@example.com"),
                team_id: Some("TEAM"),
                ..Default::default()
            },
        );
        assert_eq!(s.notary().max_attempts, 3);
        assert_eq!(s.notary().apple_id.as_deref(), Some("new@example.com"));
        assert_eq!(s.poll_policy().max_attempts, 3);

        let creds = credentials(&s, Some("secret"), false).unwrap();
        assert_eq!(creds.team_id, "TEAM");
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    #[cfg(unix)]
    #[test]
    fn password_prompt_hides_input_on_a_terminal() {
        use nix::pty::{Winsize, openpty};
        use nix::sys::termios::{self, LocalFlags, SetArg, Termios};

        let pty = openpty(None::<&Winsize>, None::<&Termios>).unwrap();
        let original = termios::tcgetattr(&pty.slave).unwrap();
        assert!(original.local_flags.contains(LocalFlags::ECHO));

        termios::tcsetattr(&pty.slave, SetArg::TCSANOW, &without_echo(&original)).unwrap();
        let applied = termios::tcgetattr(&pty.slave).unwrap();
        assert!(!applied.local_flags.contains(LocalFlags::ECHO));
        assert!(applied.local_flags.contains(LocalFlags::ECHONL));
    }

    #[test]
    fn missing_credentials_name_the_flag() {
        let s = settings(NotarySettings {
            apple_id: Some("dev@example.com".into()),
            team_id: Some("TEAM".into()),
            ..Default::default()
        });
        let err = credentials(&s, None, false).unwrap_err();
        assert!(matches!(
            err,
            BundlerError::Cli(CliError::MissingArgument { ref argument }) if argument == "password"
        ));

        let bare = settings(NotarySettings::default());
        assert!(credentials(&bare, Some("pw"), false).is_err());
    }
}
