//! Command line interface for the macOS app packager.
//!
//! This module provides argument parsing, subcommand dispatch and the
//! operator-facing output.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, RuntimeConfig};
pub use output::OutputManager;

use crate::error::{BundlerError, CliError, Result};

/// Validates `args` and runs the selected subcommand.
pub async fn run(args: Args) -> Result<i32> {
    args.validate()
        .map_err(|reason| BundlerError::Cli(CliError::InvalidArguments { reason }))?;
    let config = RuntimeConfig::from(&args);

    match &args.command {
        Command::Init {
            dir,
            name,
            identifier,
            force,
        } => commands::init::execute(dir, name, identifier, *force, &config).await,
        Command::Identities { json } => commands::identities::execute(*json, &config).await,
        Command::Lock { version, file, yes } => {
            commands::lock::execute(version, file, *yes, &config).await
        }
        Command::Utis { search } => commands::utis::execute(search, &config).await,
        Command::Release {
            manifest,
            skip_notarize,
            verify,
            yes,
            max_attempts,
            apple_id,
            team_id,
            password,
            json,
        } => {
            let release = commands::ReleaseArgs {
                manifest: manifest.clone(),
                skip_notarize: *skip_notarize,
                verify: *verify,
                yes: *yes,
                max_attempts: *max_attempts,
                apple_id: apple_id.as_deref(),
                team_id: team_id.as_deref(),
                password: password.as_deref(),
                json: *json,
            };
            commands::release::execute(release, &config).await
        }
    }
}

