//! Kodegen Bundler MacApp - PyInstaller app packaging for macOS.
//!
//! This binary builds an app bundle from a Python entry script, signs it,
//! wraps it in an installer package, and notarizes and staples the result.

use kodegen_bundler_macapp::cli::{self, Args};
use std::process;

#[tokio::main]
async fn main() {
    let args = Args::parse_args();

    // Initialize logging; RUST_LOG still wins over -v/-q
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .format_timestamp(None)
        .init();

    // Run CLI and get exit code
    let exit_code = match cli::run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            for suggestion in e.recovery_suggestions() {
                eprintln!("  hint: {}", suggestion);
            }
            e.exit_code()
        }
    };

    process::exit(exit_code);
}
