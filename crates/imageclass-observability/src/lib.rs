// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # imageclass-observability
//!
//! Unified logging setup for the imageclass crates.
//!
//! Provides consistent tracing initialization across the workspace with
//! per-crate debug flag support.
//!
//! ## Features
//! - `file-logging`: timestamped per-run JSON log files with retention cleanup

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known crate names (tracing targets) for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "imageclass-session",
    "imageclass-config",
    "imageclass-cli",
];
