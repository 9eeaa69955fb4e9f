//! Release orchestration and coordination.
//!
//! This module provides the [`Releaser`] that chains the app and package
//! lifecycles into one run and reports what it produced.
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA-256 digests and sizes for produced artifacts
//! - [`orchestrator`] - Main [`Releaser`] and its report types
//! - [`tool_detection`] - External tool availability checking

mod checksum;
mod orchestrator;
mod tool_detection;

pub use orchestrator::{
    ArtifactKind, ReleaseArtifact, ReleaseOptions, ReleaseReport, Releaser, preflight,
};
