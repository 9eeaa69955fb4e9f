//! `identities`: show which keychain identities a release would use.

use crate::bundler::{ShellRunner, SigningIdentity, resolve_all};
use crate::cli::RuntimeConfig;
use crate::error::Result;

/// Runs `identities`.
pub async fn execute(json: bool, config: &RuntimeConfig) -> Result<i32> {
    let runner = ShellRunner::default_in(std::env::current_dir()?)?;
    let (application, installer) = resolve_all(&runner).await?;

    if json {
        let value = serde_json::json!({
            "application": application,
            "installer": installer,
        });
        config.output().raw(&serde_json::to_string_pretty(&value)?)?;
        return Ok(0);
    }

    config.section("Signing identities")?;
    show(config, "Application", application.as_ref())?;
    show(config, "Installer", installer.as_ref())?;
    if application.is_none() || installer.is_none() {
        config.warn("Artifacts without an identity are left unsigned and cannot be notarized")?;
    }
    Ok(0)
}

fn show(config: &RuntimeConfig, label: &str, identity: Option<&SigningIdentity>) -> std::io::Result<()> {
    match identity {
        Some(id) => config.indent(&format!("{:<12} {}", label, id.hash)),
        None => config.indent(&format!("{:<12} (none)", label)),
    }
}
