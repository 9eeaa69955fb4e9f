//! Default entitlements for PyInstaller-built apps.

use crate::bundler::error::{ErrorExt, Result};
use std::path::{Path, PathBuf};

/// File name the default entitlements are written under.
pub const MINIMUM_ENTITLEMENTS_FILE: &str = "entitlements.plist";

/// Entitlements a hardened-runtime PyInstaller binary needs to start.
pub const MINIMUM_ENTITLEMENTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>com.apple.security.cs.allow-jit</key>
	<true/>
	<key>com.apple.security.cs.allow-unsigned-executable-memory</key>
	<true/>
	<key>com.apple.security.cs.disable-library-validation</key>
	<true/>
</dict>
</plist>
"#;

/// Writes [`MINIMUM_ENTITLEMENTS`] into `dir` unless the file already exists.
///
/// Returns the path of the entitlements file either way.
pub async fn ensure_minimum_entitlements(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(MINIMUM_ENTITLEMENTS_FILE);
    if tokio::fs::try_exists(&path)
        .await
        .fs_context("checking for entitlements", &path)?
    {
        return Ok(path);
    }

    tokio::fs::create_dir_all(dir)
        .await
        .fs_context("creating entitlements directory", dir)?;
    tokio::fs::write(&path, MINIMUM_ENTITLEMENTS)
        .await
        .fs_context("unable to create minimum entitlements file", &path)?;
    log::info!("wrote default entitlements to {}", path.display());
    Ok(path)
}
