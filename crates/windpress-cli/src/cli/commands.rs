use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::enums::*;
use crate::cli::validation::parse_provider_id;

/// Available WindPress subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the CSS cache of a WordPress site
    ///
    /// Pulls the stylesheets and providers from the site's REST API, scans
    /// every enabled provider, compiles and optimizes the result and stores
    /// it back on the site.
    Build(BuildArgs),

    /// Compile a local volume
    ///
    /// Compiles the stylesheets in a directory or a `.windpress` backup,
    /// using the classes found in local content files.
    Compile(CompileArgs),

    /// Convert volumes between directories and backup files
    Volume(VolumeArgs),
}

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Reuse provider scans from earlier builds where they are still fresh
    #[arg(short, long)]
    pub incremental: bool,

    /// Rescan this provider even in an incremental build (repeatable)
    #[arg(short, long = "provider", value_name = "ID", value_parser = parse_provider_id, requires = "incremental")]
    pub providers: Vec<String>,

    /// Do not store the result on the site
    #[arg(long)]
    pub no_store: bool,

    /// Tailwind CSS major version (defaults to the site setting)
    #[arg(long, value_enum, value_name = "VERSION")]
    pub tailwind: Option<TailwindMajor>,

    /// Generate a source map (defaults to the site setting)
    #[arg(long)]
    pub sourcemap: bool,

    /// Also write the generated CSS to this file
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

/// Arguments for the compile command
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Volume directory or `.windpress` backup file
    #[arg(value_name = "DIR|FILE")]
    pub input: PathBuf,

    /// Glob of content files to extract classes from (repeatable)
    ///
    /// Examples:
    ///   windpress compile ./volume --content "templates/**/*.html"
    #[arg(long, value_name = "GLOB")]
    pub content: Vec<String>,

    /// Entry stylesheet inside the volume
    #[arg(long, default_value = "/main.css", value_name = "PATH")]
    pub entrypoint: String,

    /// Tailwind CSS major version
    #[arg(long, value_enum, default_value = "4", value_name = "VERSION")]
    pub tailwind: TailwindMajor,

    /// Minify the output
    #[arg(short, long)]
    pub minify: bool,

    /// Write a source map next to the output (requires --out)
    #[arg(long, requires = "out")]
    pub sourcemap: bool,

    /// Output file (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

/// Arguments for the volume command
#[derive(Args, Debug)]
pub struct VolumeArgs {
    #[command(subcommand)]
    pub command: VolumeCommand,
}

#[derive(Subcommand, Debug)]
pub enum VolumeCommand {
    /// Pack a directory into a backup file
    Export {
        /// Directory to pack
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "backup")]
        format: VolumeFormat,
    },

    /// Unpack a backup file into a directory
    Import {
        /// Backup or container file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Input format
        #[arg(long, value_enum, default_value = "backup")]
        format: VolumeFormat,
    },
}
