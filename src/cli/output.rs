//! Terminal output for CLI commands.
//!
//! Log records go through `log`; this is for what the operator is meant to
//! read: progress lines, warnings, the final summary.

use std::io::{self, Write};

/// Writes user-facing messages, honouring `--verbose` and `--quiet`.
#[derive(Debug, Clone, Copy)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
}

impl OutputManager {
    /// Creates an output manager.
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    /// Whether `--quiet` was given.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Prints only with `--verbose`.
    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if self.verbose && !self.quiet {
            writeln!(io::stdout(), "  {}", message)?;
        }
        Ok(())
    }

    /// Prints a step in progress.
    pub fn progress(&self, message: &str) -> io::Result<()> {
        if !self.quiet {
            writeln!(io::stdout(), "→ {}", message)?;
        }
        Ok(())
    }

    /// Prints a completed step.
    pub fn success(&self, message: &str) -> io::Result<()> {
        if !self.quiet {
            writeln!(io::stdout(), "✓ {}", message)?;
        }
        Ok(())
    }

    /// Prints a warning to stderr.
    pub fn warn(&self, message: &str) -> io::Result<()> {
        if !self.quiet {
            writeln!(io::stderr(), "⚠ {}", message)?;
        }
        Ok(())
    }

    /// Prints an error to stderr, even with `--quiet`.
    pub fn error(&self, message: &str) -> io::Result<()> {
        writeln!(io::stderr(), "✗ {}", message)
    }

    /// Prints a section header.
    pub fn section(&self, title: &str) -> io::Result<()> {
        if !self.quiet {
            let mut out = io::stdout();
            writeln!(out)?;
            writeln!(out, "{}", title)?;
            writeln!(out, "{}", "─".repeat(title.chars().count()))?;
        }
        Ok(())
    }

    /// Prints an indented line.
    pub fn indent(&self, message: &str) -> io::Result<()> {
        if !self.quiet {
            writeln!(io::stdout(), "    {}", message)?;
        }
        Ok(())
    }

    /// Prints machine-readable output; never suppressed.
    pub fn raw(&self, message: &str) -> io::Result<()> {
        writeln!(io::stdout(), "{}", message)
    }
}
