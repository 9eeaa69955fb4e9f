//! `utis`: search the Launch Services registry.

use crate::bundler::{ShellRunner, find_local_utis};
use crate::cli::RuntimeConfig;
use crate::error::Result;

/// Runs `utis`.
pub async fn execute(search: &str, config: &RuntimeConfig) -> Result<i32> {
    let runner = ShellRunner::default_in(std::env::current_dir()?)?;
    let utis = find_local_utis(&runner, search).await?;
    if utis.is_empty() {
        config.warn(&format!("No registered UTI matches '{}'", search))?;
    }
    for uti in utis {
        config.output().raw(&uti)?;
    }
    Ok(0)
}
