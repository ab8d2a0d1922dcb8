//! `windpress compile`: compile a local volume.
//!
//! Works without a site: the volume comes from a directory or a `.windpress`
//! backup and the classes come from local content files. `@source`
//! declarations pointing at the CDN or at URLs are still honored.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use windpress_build::{SourceLoader, TailwindVersion};
use windpress_compiler::{
    CandidateExtractor, CompileRequest, DesignSystemAdapter, Fetch, HttpFetcher, OptimizeOptions,
    design::DEFAULT_LEGACY_CONFIG, optimize,
};
use windpress_volume::{Volume, sfs};

use crate::cli::CompileArgs;
use crate::commands::utils;
use crate::config::WindpressConfig;
use crate::error::{CliError, Result, ResultExt};
use crate::ui;

/// Execute the compile command.
pub async fn execute(args: CompileArgs, config_path: Option<&Path>) -> Result<()> {
    let start_time = Instant::now();
    let config = WindpressConfig::load(config_path)?;

    let volume = load_volume(&args.input)?;
    ui::debug(&format!("{} files in volume", volume.len()));

    let contents = read_content_files(&args.content)?;
    if contents.is_empty() && !args.content.is_empty() {
        ui::warning("No content files matched --content");
    }

    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(config.timeout())?);
    let compiler = utils::tailwind_cli(&config).await?;
    let adapter = DesignSystemAdapter::new(Arc::new(compiler), fetcher.clone(), config.cdn.clone());

    let spinner = ui::Spinner::new("Compiling Tailwind CSS...");
    let version = TailwindVersion::from(args.tailwind);
    let compiled = match version {
        TailwindVersion::V4 => {
            let sources = SourceLoader::new(fetcher, config.cdn.clone());
            compile_v4(&adapter, &sources, volume, &args.entrypoint, contents, &spinner).await
        }
        TailwindVersion::V3 => adapter
            .build_legacy(&volume, DEFAULT_LEGACY_CONFIG, &args.entrypoint, contents)
            .await
            .map(|css| (css, None, 0))
            .map_err(CliError::from),
    };
    let (css, input_map, candidates) = match compiled {
        Ok(compiled) => compiled,
        Err(e) => {
            spinner.fail("Compilation failed");
            return Err(e);
        }
    };

    spinner.set_message("Optimizing...");
    let file = args
        .out
        .as_deref()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "windpress.css".to_string());
    let options = OptimizeOptions::new(file)
        .with_minify(args.minify)
        .with_sourcemap(args.sourcemap, input_map);
    let optimized = optimize(&css, &options)?;
    spinner.clear();

    for warning in &optimized.warnings {
        ui::warning(warning);
    }

    match &args.out {
        Some(out) => {
            utils::write_stylesheet(out, &optimized.code, optimized.map.as_deref())?;
            ui::success(&format!(
                "Wrote {} ({}) in {}",
                out.display(),
                ui::format_size(optimized.code.len() as u64),
                ui::format_duration(start_time.elapsed())
            ));
            if candidates > 0 {
                ui::info(&format!("{candidates} candidates"));
            }
        }
        None => print!("{}", optimized.code),
    }

    Ok(())
}

/// A volume from a directory or a `.windpress` backup file.
pub(crate) fn load_volume(input: &Path) -> Result<Volume> {
    if input.is_dir() {
        return Ok(Volume::from_dir(input)?);
    }
    let data = fs::read_to_string(input).with_path(input)?;
    let entries = sfs::import_sfs(&data)?;
    Ok(Volume::from_entries(&entries))
}

fn read_content_files(patterns: &[String]) -> Result<Vec<String>> {
    if patterns.is_empty() {
        return Ok(Vec::new());
    }
    let root = std::env::current_dir()?;
    let matcher = utils::content_matcher(patterns)?;
    let files = utils::find_content_files(&root, &matcher)?;
    ui::debug(&format!("{} content files", files.len()));

    files
        .iter()
        .map(|path| fs::read_to_string(path).with_path(path))
        .collect()
}

/// Compile, load `@source` content, extract candidates and generate CSS.
/// Returns the CSS, its source map and the candidate count.
async fn compile_v4(
    adapter: &DesignSystemAdapter,
    sources: &SourceLoader,
    volume: Volume,
    entrypoint: &str,
    contents: Vec<String>,
    spinner: &ui::Spinner,
) -> Result<(String, Option<String>, usize)> {
    let request = CompileRequest::new(volume).with_entrypoint(entrypoint);
    let mut compiled = adapter.compile(&request).await?;

    let extractor = Arc::new(CandidateExtractor::new());
    extractor.init();
    let candidates = sources
        .candidates(&extractor, compiled.sources(), contents, |source, e| {
            spinner.suspend(|| ui::warning(&format!("Skipping @source \"{}\": {e}", source.pattern)))
        })
        .await?;

    let css = compiled.build(&candidates).await?;
    Ok((css, compiled.build_source_map(), candidates.len()))
}
