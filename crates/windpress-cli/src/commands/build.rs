//! `windpress build`: generate the cache of a WordPress site.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use windpress_build::{
    Backend, BuildCacheOptions, BuildOutcome, CacheBuilder, ProviderCacheStore, RedbStore, RestBackend,
    SourceLoader,
};
use windpress_bus::{BusLogger, Envelope, LogEvent, MessageBus, Subscription, peer, task};
use windpress_compiler::{DesignSystemAdapter, Fetch, HttpFetcher};

use crate::cli::BuildArgs;
use crate::commands::utils;
use crate::config::WindpressConfig;
use crate::error::Result;
use crate::ui;

/// Execute the build command.
///
/// 1. Load the configuration and connect to the site
/// 2. Open the provider cache under `cacheDir`
/// 3. Run one cache build, printing its log events as they arrive
/// 4. Write `--out` and print a summary
pub async fn execute(args: BuildArgs, config_path: Option<&Path>) -> Result<()> {
    let start_time = Instant::now();

    let config = WindpressConfig::load(config_path)?;
    let site_url = config.require_site_url()?;
    let credentials = config.credentials()?;

    let backend: Arc<dyn Backend> = Arc::new(RestBackend::new(
        site_url,
        &config.rest_prefix,
        credentials,
        config.timeout(),
    )?);
    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(config.timeout())?);
    let compiler = utils::tailwind_cli(&config).await?;
    let adapter = DesignSystemAdapter::new(Arc::new(compiler), fetcher.clone(), config.cdn.clone());
    let sources = SourceLoader::new(fetcher, config.cdn.clone()).with_backend(backend.clone());

    let bus = MessageBus::default();
    let mut logs = bus.subscribe();
    let logger = BusLogger::new(bus.clone(), peer::COMPILER, peer::DASHBOARD);

    let builder = CacheBuilder::new(backend, adapter, sources, logger)
        .with_provider_cache(open_provider_cache(&config.cache_dir));

    let options = build_options(&args);
    ui::info(&format!("Building the cache of {site_url}"));

    let spinner = ui::Spinner::new("Starting build...");
    let result = {
        let build = builder.build_cache(options);
        tokio::pin!(build);
        loop {
            tokio::select! {
                result = &mut build => break result,
                received = logs.recv() => match received {
                    Ok(envelope) => print_log(&spinner, &envelope),
                    Err(_) => {}
                },
            }
        }
    };
    drain_logs(&spinner, &mut logs);
    spinner.clear();

    let outcome = result?;

    if let Some(out) = &args.out {
        utils::write_stylesheet(out, &outcome.css, outcome.sourcemap.as_deref())?;
        ui::success(&format!("Wrote {}", out.display()));
    }

    print_summary(&outcome, start_time);
    Ok(())
}

/// Options for one build from the command-line flags.
pub(crate) fn build_options(args: &BuildArgs) -> BuildCacheOptions {
    let mut options = if args.incremental {
        BuildCacheOptions::incremental().with_providers(args.providers.clone())
    } else {
        BuildCacheOptions::full()
    };
    options = options.with_store(!args.no_store);
    if let Some(major) = args.tailwind {
        options = options.with_version(major.into());
    }
    if args.sourcemap {
        options = options.with_sourcemap(true);
    }
    options
}

/// Provider cache backed by redb, or disabled when the database can't be opened.
fn open_provider_cache(cache_dir: &Path) -> ProviderCacheStore {
    match RedbStore::open(cache_dir) {
        Ok(store) => ProviderCacheStore::new(Some(Arc::new(store))),
        Err(e) => {
            ui::warning(&format!(
                "Cannot open the provider cache in {}: {e}",
                cache_dir.display()
            ));
            ProviderCacheStore::disabled()
        }
    }
}

/// Added events with an id are transient: they show in the spinner until
/// the matching update is printed. Everything else is printed right away.
fn print_log(spinner: &ui::Spinner, envelope: &Envelope) {
    if envelope.source != peer::COMPILER {
        return;
    }
    let Ok(Some(event)) = envelope.data_as::<LogEvent>() else {
        return;
    };

    match envelope.task.as_str() {
        task::LOG_ADD if event.id.is_some() => spinner.set_message(&event.message),
        task::LOG_ADD | task::LOG_UPDATE => spinner.suspend(|| ui::log_event(&event)),
        _ => {}
    }
}

fn drain_logs(spinner: &ui::Spinner, logs: &mut Subscription) {
    while let Some(envelope) = logs.try_recv() {
        print_log(spinner, &envelope);
    }
}

fn print_summary(outcome: &BuildOutcome, start_time: Instant) {
    let rows = [
        ui::SummaryRow {
            label: "stored",
            bytes: outcome.css.len() as u64,
        },
        ui::SummaryRow {
            label: "readable",
            bytes: outcome.normal.code.len() as u64,
        },
        ui::SummaryRow {
            label: "minified",
            bytes: outcome.minified.code.len() as u64,
        },
    ];
    ui::print_build_summary(&rows, outcome.candidates.len(), start_time.elapsed());

    if let Some(url) = &outcome.cache.file_url {
        ui::info(&format!("Cache file: {url}"));
    }
}
