//! External tool execution.
//!
//! Every Apple tool (`pyi-makespec`, `pyinstaller`, `codesign`, `pkgbuild`,
//! `productsign`, `xcrun`, `security`) is reached through a [`ToolCommand`]
//! executed by a [`CommandRunner`]. The runner is the seam that lets the
//! lifecycle state machines run against scripted tool output in tests.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// Placeholder shown in audit lines instead of secret arguments.
const REDACTED: &str = "******";

/// A single external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    secrets: Vec<usize>,
}

impl ToolCommand {
    /// Creates an invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secrets: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends a filesystem path argument.
    pub fn path_arg(self, path: impl AsRef<Path>) -> Self {
        let rendered = path.as_ref().to_string_lossy().into_owned();
        self.arg(rendered)
    }

    /// Appends an argument that must never appear in logs.
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.secrets.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    /// Program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments, unredacted.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Shell line that is actually executed.
    pub fn shell_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Shell line with secrets redacted, for logs and error messages.
    pub fn command_line(&self) -> String {
        std::iter::once(shell_quote(&self.program))
            .chain(self.args.iter().enumerate().map(|(i, a)| {
                if self.secrets.contains(&i) {
                    REDACTED.to_string()
                } else {
                    shell_quote(a)
                }
            }))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Quotes `s` for a POSIX shell, leaving plain words untouched.
pub fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// Captured result of a finished tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Redacted command line, kept for audit.
    pub command_line: String,
    /// Exit code, `None` if the process was killed by a signal.
    pub status: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the tool exited with status 0.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Lines of standard output.
    pub fn lines(&self) -> std::str::Lines<'_> {
        self.stdout.lines()
    }

    /// Standard output followed by standard error.
    ///
    /// `notarytool` and `altool` split their status reports across both streams.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }

    /// Converts a non-zero exit into [`Error::CommandFailed`].
    pub fn check(self) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                command: self.command_line,
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Executes external tools.
pub trait CommandRunner: Send + Sync {
    /// Runs `command` to completion and captures its output.
    ///
    /// A process that cannot be started at all is an error; a process that
    /// starts and fails is reported through [`CommandOutput::status`].
    fn run(&self, command: &ToolCommand) -> impl Future<Output = Result<CommandOutput>> + Send;
}

impl<R: CommandRunner> CommandRunner for &R {
    fn run(&self, command: &ToolCommand) -> impl Future<Output = Result<CommandOutput>> + Send {
        (**self).run(command)
    }
}

/// Runs commands through a shell interpreter in a fixed working directory.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    interpreter: PathBuf,
    cwd: PathBuf,
}

impl ShellRunner {
    /// Default interpreter used by [`ShellRunner::default_in`].
    pub const DEFAULT_INTERPRETER: &'static str = "/bin/bash";

    /// Creates a runner after validating the interpreter and directory.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `interpreter` is not an executable file or `cwd`
    /// is not an existing directory.
    pub fn new(interpreter: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Result<Self> {
        let interpreter = interpreter.into();
        let cwd = cwd.into();

        if !is_executable(&interpreter) {
            log::error!("'{}' is not an executable", interpreter.display());
            return Err(Error::Config(format!(
                "interpreter '{}' is not an executable",
                interpreter.display()
            )));
        }
        if !cwd.is_dir() {
            log::error!("'{}' is not a directory", cwd.display());
            return Err(Error::Config(format!(
                "working directory '{}' is not a directory",
                cwd.display()
            )));
        }

        Ok(Self { interpreter, cwd })
    }

    /// Creates a `/bin/bash` runner in `cwd`.
    pub fn default_in(cwd: impl Into<PathBuf>) -> Result<Self> {
        Self::new(Self::DEFAULT_INTERPRETER, cwd)
    }
}

impl CommandRunner for ShellRunner {
    async fn run(&self, command: &ToolCommand) -> Result<CommandOutput> {
        let audit = command.command_line();
        log::debug!(
            "attempting to execute '{}' using '{}' in '{}'",
            audit,
            self.interpreter.display(),
            self.cwd.display()
        );

        let output = tokio::process::Command::new(&self.interpreter)
            .arg("-c")
            .arg(command.shell_line())
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| {
                log::warn!("an exception occurred while trying to execute command: {}", source);
                Error::CommandSpawn {
                    command: audit.clone(),
                    source,
                }
            })?;

        let result = CommandOutput {
            command_line: audit,
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        for line in result.stdout.lines() {
            log::debug!("  {}", line);
        }
        for line in result.stderr.lines() {
            log::warn!("  {}", line);
        }
        if !result.success() {
            log::warn!(
                "`{}` exited with status {:?}",
                result.command_line,
                result.status
            );
        }

        Ok(result)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Marks a file executable (`0o755`).
#[cfg(unix)]
pub async fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .fs_context("marking script executable", path)
}

/// Marks a file executable (no-op off unix).
#[cfg(not(unix))]
pub async fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted runner used by the lifecycle tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Rule {
        needle: String,
        outputs: VecDeque<CommandOutput>,
    }

    /// Replays canned output for commands whose shell line contains a needle.
    ///
    /// Each rule yields its outputs in order and keeps repeating the last one.
    /// Commands matching no rule succeed with empty output.
    #[derive(Default)]
    pub struct ScriptedRunner {
        rules: Mutex<Vec<Rule>>,
        calls: Mutex<Vec<String>>,
        writers: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(self, needle: &str, stdout: &str) -> Self {
            self.on_output(needle, ok(stdout))
        }

        pub fn on_sequence(self, needle: &str, stdouts: &[&str]) -> Self {
            for s in stdouts {
                self.push(needle, ok(s));
            }
            self
        }

        pub fn on_output(self, needle: &str, output: CommandOutput) -> Self {
            self.push(needle, output);
            self
        }

        /// Matching commands create the file named by their last argument,
        /// like `productsign` writing its output.
        pub fn writes_last_arg(self, needle: &str) -> Self {
            self.writers.lock().unwrap().push(needle.to_string());
            self
        }

        fn push(&self, needle: &str, output: CommandOutput) {
            let mut rules = self.rules.lock().unwrap();
            match rules.iter_mut().find(|r| r.needle == needle) {
                Some(rule) => rule.outputs.push_back(output),
                None => rules.push(Rule {
                    needle: needle.to_string(),
                    outputs: VecDeque::from([output]),
                }),
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, needle: &str) -> usize {
            self.calls().iter().filter(|c| c.contains(needle)).count()
        }
    }

    pub fn ok(stdout: &str) -> CommandOutput {
        CommandOutput {
            command_line: String::new(),
            status: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    impl CommandRunner for ScriptedRunner {
        async fn run(&self, command: &ToolCommand) -> Result<CommandOutput> {
            let line = command.shell_line();
            self.calls.lock().unwrap().push(line.clone());

            let writes = self.writers.lock().unwrap().iter().any(|n| line.contains(n));
            if let (true, Some(target)) = (writes, command.get_args().last()) {
                std::fs::write(target, command.program()).unwrap();
            }

            let mut rules = self.rules.lock().unwrap();
            let mut output = match rules.iter_mut().find(|r| line.contains(&r.needle)) {
                Some(rule) if rule.outputs.len() > 1 => rule.outputs.pop_front().unwrap(),
                Some(rule) => rule.outputs.front().cloned().unwrap_or_default(),
                None => ok(""),
            };
            output.command_line = command.command_line();
            Ok(output)
        }
    }
}
