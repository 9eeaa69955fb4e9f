//! Target architecture and bundler log level.
//!
//! Both are closed sets the bundler rejects outright when they are wrong, so
//! they are parsed into enums up front and never relaxed by `brute` mode.

use std::fmt;
use std::str::FromStr;

/// CPU architecture the `.app` is built for.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_macapp::bundler::TargetArch;
///
/// let arch: TargetArch = "arm64".parse().unwrap();
/// assert_eq!(arch.as_str(), "arm64");
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum TargetArch {
    /// Intel 64-bit.
    #[serde(rename = "x86_64")]
    X86_64,
    /// Apple Silicon.
    #[serde(rename = "arm64")]
    Arm64,
    /// Fat binary containing both slices.
    #[default]
    #[serde(rename = "universal2")]
    Universal2,
}

impl TargetArch {
    /// All accepted values.
    pub const ALL: [TargetArch; 3] = [Self::X86_64, Self::Arm64, Self::Universal2];

    /// Value passed to `--target-architecture`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm64",
            Self::Universal2 => "universal2",
        }
    }
}

impl fmt::Display for TargetArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetArch {
    type Err = crate::bundler::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                log::warn!("invalid architecture: {}", s);
                crate::bundler::Error::Config(format!(
                    "unable to validate architecture '{}'; must be one of x86_64, arm64, universal2",
                    s
                ))
            })
    }
}

/// Verbosity passed to PyInstaller's `--log-level`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BundlerLogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Critical,
}

impl BundlerLogLevel {
    /// All accepted values.
    pub const ALL: [BundlerLogLevel; 6] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Critical,
    ];

    /// Value passed to `--log-level`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for BundlerLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BundlerLogLevel {
    type Err = crate::bundler::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| {
                log::warn!("invalid log level: {}", s);
                crate::bundler::Error::Config(format!(
                    "unable to validate log level '{}'; must be one of TRACE, DEBUG, INFO, WARN, ERROR, CRITICAL",
                    s
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arch_parses_exact_names_only() {
        assert_eq!("x86_64".parse::<TargetArch>().unwrap(), TargetArch::X86_64);
        assert_eq!("universal2".parse::<TargetArch>().unwrap(), TargetArch::Universal2);
        assert!("aarch64".parse::<TargetArch>().is_err());
        assert!("ARM64".parse::<TargetArch>().is_err());
    }

    #[test]
    fn log_level_is_case_sensitive() {
        assert_eq!("WARN".parse::<BundlerLogLevel>().unwrap(), BundlerLogLevel::Warn);
        assert!("warn".parse::<BundlerLogLevel>().is_err());
    }

    #[test]
    fn defaults_match_pyinstaller_usage() {
        assert_eq!(TargetArch::default(), TargetArch::Universal2);
        assert_eq!(BundlerLogLevel::default().as_str(), "WARN");
    }
}
