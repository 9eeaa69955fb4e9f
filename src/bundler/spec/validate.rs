//! Parameter validation rules applied before a value reaches `pyi-makespec`.
//!
//! Each check logs what it rejected; whether a rejection is fatal is the
//! caller's decision (see `brute` in [`super::SpecParams`]).

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Maximum length of an application name.
pub const APP_NAME_MAX_LEN: usize = 50;

/// Maximum length of a bundle identifier.
pub const IDENTIFIER_MAX_LEN: usize = 155;

static APP_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z\s]+$").expect("app name pattern compiles"));

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9.\-]+$").expect("identifier pattern compiles"));

/// Letters, digits and whitespace, at most 50 characters.
pub fn app_name(name: &str) -> bool {
    if APP_NAME_RE.is_match(name) && name.chars().count() <= APP_NAME_MAX_LEN {
        log::debug!("validated: {}", name);
        true
    } else {
        log::warn!("invalid app name: {}", name);
        false
    }
}

/// Letters, digits, `.` and `-`, at most 155 characters.
pub fn identifier(identifier: &str) -> bool {
    if IDENTIFIER_RE.is_match(identifier) && identifier.len() <= IDENTIFIER_MAX_LEN {
        log::debug!("validated: {}", identifier);
        true
    } else {
        log::warn!("invalid bundle identifier: {}", identifier);
        false
    }
}

/// An existing regular file, optionally required to end with `extension`
/// (including the dot, e.g. `".plist"`).
pub fn file(path: &Path, extension: Option<&str>) -> bool {
    let valid = path.is_file()
        && extension.is_none_or(|ext| path.to_string_lossy().ends_with(ext));
    if valid {
        log::debug!("validated: {}", path.display());
    } else {
        log::warn!("invalid file: {}", path.display());
    }
    valid
}

/// An existing directory.
pub fn directory(path: &Path) -> bool {
    if path.is_dir() {
        log::debug!("validated: {}", path.display());
        true
    } else {
        log::warn!("invalid directory: {}", path.display());
        false
    }
}
