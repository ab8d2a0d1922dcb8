//! `windpress` command-line entry point.

use clap::Parser;
use miette::Result;
use windpress_cli::{cli, commands, error, logger, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let config = args.config.as_deref();
    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args, config).await,
        cli::Command::Compile(compile_args) => commands::compile_execute(compile_args, config).await,
        cli::Command::Volume(volume_args) => commands::volume_execute(volume_args).await,
    };

    result.map_err(error::cli_error_to_miette)
}
