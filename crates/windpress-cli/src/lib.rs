//! WindPress CLI - Tailwind CSS caches for WordPress sites.
//!
//! The `windpress` binary drives the build pipeline from a terminal:
//!
//! - `build` runs [`windpress_build::CacheBuilder`] against a site's REST API
//! - `compile` compiles a local volume with the same adapter and optimizer
//! - `volume` converts volumes between directories, `.windpress` backups and
//!   base64 containers
//!
//! Modules:
//!
//! - [`error`] - `CliError` and its miette conversion
//! - [`logger`] - tracing setup
//! - [`ui`] - status lines, spinners and summaries
//! - [`config`] - `windpress.config.json` and `WINDPRESS_*` variables

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, ConfigError, Result, ResultExt};
