//! Subcommand implementations.
//!
//! Each `execute` returns the process exit code on success.

pub mod identities;
pub mod init;
pub mod lock;
pub mod release;
pub mod utis;

pub use release::ReleaseArgs;
