//! Command-line interface definition for WindPress.
//!
//! - `windpress build` - generate the cache of a WordPress site
//! - `windpress compile` - compile a local volume without a site
//! - `windpress volume` - convert between directories and backup files

mod commands;
pub mod enums;
mod validation;

use clap::Parser;
use std::path::PathBuf;

pub use commands::{BuildArgs, Command, CompileArgs, VolumeArgs, VolumeCommand};
pub use enums::*;
pub use validation::parse_provider_id;

/// WindPress - Tailwind CSS caches for WordPress
#[derive(Parser, Debug)]
#[command(
    name = "windpress",
    version,
    about = "Build Tailwind CSS caches for WordPress sites",
    long_about = "WindPress scans the content of a WordPress site, extracts the Tailwind CSS\n\
                  classes it uses and compiles the site's stylesheets into a single cached\n\
                  stylesheet. It can also compile a local copy of the stylesheets."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to windpress.config.json
    ///
    /// Defaults to ./windpress.config.json when that file exists.
    #[arg(short, long, global = true, value_name = "FILE", env = "WINDPRESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
