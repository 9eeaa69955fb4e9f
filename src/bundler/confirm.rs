//! Operator confirmation prompts.
//!
//! Version regressions and notarizing an unsigned app ask before continuing.
//! Declining turns into [`Error::Aborted`](crate::bundler::Error::Aborted).

use crate::bundler::error::{Error, Result};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Asks the operator a yes/no question.
pub trait Confirm: Send + Sync {
    /// Returns `true` to continue.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Prompts on stdout and reads an answer from stdin; only `y` continues.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        let mut stdout = io::stdout();
        let _ = write!(stdout, "{} (y): ", prompt);
        let _ = stdout.flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => answer.trim() == "y",
            Err(e) => {
                log::warn!("failed to read confirmation: {}", e);
                false
            }
        }
    }
}

/// Answers every prompt the same way (`--yes`, non-interactive runs, tests).
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        log::info!("{} -> {}", prompt, if self.0 { "y" } else { "n" });
        self.0
    }
}

/// Continues if `confirm` agrees, otherwise yields [`Error::Aborted`](crate::bundler::Error::Aborted).
pub fn require(confirm: &dyn Confirm, prompt: &str) -> Result<()> {
    if confirm.confirm(prompt) {
        Ok(())
    } else {
        Err(Error::Aborted(prompt.to_string()))
    }
}

/// Runs blocking work (a stdin prompt, a file lock) on the blocking pool and
/// returns [`Error::Cancelled`] as soon as `cancel` fires.
///
/// A cancelled prompt keeps its thread parked on stdin until the process
/// exits.
pub async fn blocking_until_cancelled<T, F>(cancel: &CancellationToken, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    let task = tokio::task::spawn_blocking(work);
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        joined = task => joined
            .map_err(|e| Error::GenericError(format!("blocking task failed: {}", e)))?,
    }
}

/// [`require`] off the async workers, abandoned when `cancel` fires.
pub async fn require_cancellable(
    confirm: &Arc<dyn Confirm>,
    prompt: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let confirm = Arc::clone(confirm);
    let prompt = prompt.to_string();
    blocking_until_cancelled(cancel, move || require(confirm.as_ref(), &prompt)).await
}
