//! `windpress volume`: convert between directories and volume files.

use std::fs;
use std::path::Path;
use windpress_volume::{Volume, codec, sfs};

use crate::cli::{VolumeArgs, VolumeCommand, VolumeFormat};
use crate::commands::utils;
use crate::error::{CliError, Result, ResultExt};
use crate::ui;

/// Execute the volume command.
pub async fn execute(args: VolumeArgs) -> Result<()> {
    match args.command {
        VolumeCommand::Export { dir, output, format } => export(&dir, &output, format),
        VolumeCommand::Import { file, output, format } => import(&file, &output, format),
    }
}

/// Pack `dir` into `output`.
pub(crate) fn export(dir: &Path, output: &Path, format: VolumeFormat) -> Result<()> {
    if !dir.is_dir() {
        return Err(CliError::FileNotFound(dir.to_path_buf()));
    }
    let volume = Volume::from_dir(dir)?;
    if volume.is_empty() {
        ui::warning(&format!("{} contains no files", dir.display()));
    }

    let data = match format {
        VolumeFormat::Backup => sfs::export_sfs(&volume.to_entries())?,
        VolumeFormat::Container => codec::encode(&volume),
    };
    utils::write_file(output, &data)?;

    ui::success(&format!(
        "Exported {} files to {} ({})",
        volume.len(),
        output.display(),
        ui::format_size(data.len() as u64)
    ));
    Ok(())
}

/// Unpack `file` below `output`.
pub(crate) fn import(file: &Path, output: &Path, format: VolumeFormat) -> Result<()> {
    let data = fs::read_to_string(file).with_path(file)?;
    let volume = match format {
        VolumeFormat::Backup => Volume::from_entries(&sfs::import_sfs(data.trim())?),
        VolumeFormat::Container => codec::decode(data.trim())?,
    };

    let written = volume.write_to(output)?;
    ui::success(&format!("Imported {written} files into {}", output.display()));
    Ok(())
}
