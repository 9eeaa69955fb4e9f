//! Installer pre/postinstall scripts.
//!
//! `pkgbuild --scripts` only runs files named exactly `preinstall` and
//! `postinstall`. Anything else is rejected and left out of the package.

use crate::bundler::{
    command::set_executable,
    error::{ErrorExt, Result},
};
use std::path::{Path, PathBuf};

/// Name `pkgbuild` runs before installing.
pub const PREINSTALL: &str = "preinstall";

/// Name `pkgbuild` runs after installing.
pub const POSTINSTALL: &str = "postinstall";

/// Optional scripts bundled into the installer.
#[derive(Clone, Debug, Default)]
pub struct InstallScripts {
    /// Must be named `preinstall`, no extension.
    pub preinstall: Option<PathBuf>,
    /// Must be named `postinstall`, no extension.
    pub postinstall: Option<PathBuf>,
}

/// Whether `path` is an existing file whose basename is exactly `expected`.
pub fn validate_script(path: &Path, expected: &str) -> bool {
    if !path.is_file() {
        log::error!("unable to verify '{}'; it will be ignored", path.display());
        return false;
    }
    if path.file_name().and_then(|n| n.to_str()) != Some(expected) {
        log::error!(
            "the name of the {} script must be '{}' exactly, without extension (currently '{}')",
            expected,
            expected,
            path.display()
        );
        return false;
    }
    true
}

/// Empties `scratch`, copies the valid scripts into it and marks them executable.
///
/// Returns `true` if at least one script was staged.
pub async fn stage_scripts(scripts: &InstallScripts, scratch: &Path) -> Result<bool> {
    log::debug!("emptying '{}'", scratch.display());
    purge_dir(scratch).await?;

    let mut staged = false;
    for (source, expected) in [
        (&scripts.preinstall, PREINSTALL),
        (&scripts.postinstall, POSTINSTALL),
    ] {
        let Some(source) = source else { continue };
        if !validate_script(source, expected) {
            continue;
        }
        let dest = scratch.join(expected);
        tokio::fs::copy(source, &dest)
            .await
            .fs_context("copying install script", source)?;
        set_executable(&dest).await?;
        staged = true;
    }

    if staged {
        log::info!("staged install scripts in {}", scratch.display());
    }
    Ok(staged)
}

async fn purge_dir(dir: &Path) -> Result<()> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .fs_context("reading scratch directory", dir)?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("reading scratch directory", dir)?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .fs_context("inspecting scratch entry", &path)?;
        if file_type.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        }
        .fs_context("purging scratch entry", &path)?;
    }
    Ok(())
}
