//! External tool detection and availability checking.
//!
//! Everything the pipeline shells out to must be on `PATH` before a release
//! starts; a missing `pkgbuild` discovered after a ten minute PyInstaller run
//! is no use to anyone.

use std::path::PathBuf;
use std::sync::LazyLock;

/// Tools needed to build and sign the app and installer.
pub const BUILD_TOOLS: &[&str] = &[
    "pyi-makespec",
    "pyinstaller",
    "security",
    "codesign",
    "pkgbuild",
    "productsign",
];

/// Tools needed to notarize and staple.
pub const NOTARY_TOOLS: &[&str] = &["xcrun"];

/// Whether `xcrun` is available, cached for the process lifetime.
static HAS_XCRUN: LazyLock<bool> = LazyLock::new(|| find_tool("xcrun").is_some());

/// Locates `name` on `PATH`.
pub fn find_tool(name: &str) -> Option<PathBuf> {
    match which::which(name) {
        Ok(path) => {
            log::debug!("Found {} at: {}", name, path.display());
            Some(path)
        }
        Err(e) => {
            log::debug!("{} not found in PATH: {}", name, e);
            None
        }
    }
}

/// Tools from [`BUILD_TOOLS`] (and [`NOTARY_TOOLS`] when notarizing) that are missing.
pub fn missing_tools(notarize: bool) -> Vec<&'static str> {
    let mut missing: Vec<&'static str> = BUILD_TOOLS
        .iter()
        .copied()
        .filter(|tool| find_tool(tool).is_none())
        .collect();
    if notarize && !*HAS_XCRUN {
        missing.extend(NOTARY_TOOLS);
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonexistent_tool_is_not_found() {
        assert!(find_tool("definitely-not-a-real-tool-4f2a").is_none());
    }

    #[test]
    fn notary_tools_only_checked_when_notarizing() {
        let without = missing_tools(false);
        assert!(!without.contains(&"xcrun"));
        if !*HAS_XCRUN {
            assert!(missing_tools(true).contains(&"xcrun"));
        }
    }
}
