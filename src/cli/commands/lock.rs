//! `lock`: record a version without building anything.

use crate::bundler::{AutoConfirm, Confirm, LockOutcome, StdinConfirm, Version, VersionLock};
use crate::cli::RuntimeConfig;
use crate::error::Result;
use std::path::Path;

/// Runs `lock`.
pub async fn execute(version: &str, file: &Path, yes: bool, config: &RuntimeConfig) -> Result<i32> {
    let version: Version = version.parse()?;
    let lock = VersionLock::new(file);
    let confirm: Box<dyn Confirm> = if yes {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(StdinConfirm)
    };

    // flock and the prompt both block
    let locked = version.clone();
    let outcome = tokio::task::spawn_blocking(move || lock.lock(&locked, confirm.as_ref()))
        .await
        .map_err(|e| anyhow::anyhow!("version lock task failed: {}", e))??;

    let message = match outcome {
        LockOutcome::Created => format!("Locked first version {}", version),
        LockOutcome::Advanced => format!("Advanced lock to {}", version),
        LockOutcome::ConfirmedRebuild => format!("Rebuilding {}", version),
        LockOutcome::ConfirmedRegression => format!("Went back to {}", version),
    };
    config.success(&message)?;
    Ok(0)
}
