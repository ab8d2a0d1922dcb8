//! The cache build state machine.
//!
//! ```text
//! idle -> pulling-config -> scanning -> extracting -> compiling
//!      -> optimizing -> persisting -> done
//!                (any non-idle stage) -> failed
//! ```
//!
//! Builds on one [`CacheBuilder`] run one at a time, in request order. Every
//! stage change is published on a watch channel and as a bus log event.
//! Nothing is retried: the first backend, compile or optimize error fails the
//! build. The per-provider scan cache lets incremental builds skip
//! rescanning, it never papers over a failed scan.

use async_trait::async_trait;
use chrono::Utc;
use futures::future::try_join_all;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::{Mutex, watch};
use tracing::debug;
use windpress_bus::{BusLogger, LogEvent};
use windpress_compiler::design::{DEFAULT_ENTRYPOINT, DEFAULT_LEGACY_CONFIG};
use windpress_compiler::{
    CandidateExtractor, CompileRequest, DesignSystemAdapter, OptimizeOptions, Optimized, optimize,
};
use windpress_volume::Volume;

use crate::backend::Backend;
use crate::error::{BuildError, ProviderCacheError};
use crate::extract;
use crate::intellisense::ClassSource;
use crate::models::{
    BuildCacheOptions, BuildKind, CssCache, NextBatch, Provider, ProviderCache, ScanBatch, Settings,
    StoreCacheRequest, TailwindVersion,
};
use crate::provider_cache::ProviderCacheStore;
use crate::sources::SourceLoader;

/// File name recorded in diagnostics and source maps.
const OUTPUT_FILE: &str = "windpress.css";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildStage {
    Idle,
    PullingConfig,
    Scanning,
    Extracting,
    Compiling,
    Optimizing,
    Persisting,
    Done,
    Failed,
}

impl BuildStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::PullingConfig => "Pulling the configuration",
            Self::Scanning => "Scanning providers",
            Self::Extracting => "Extracting class candidates",
            Self::Compiling => "Compiling Tailwind CSS",
            Self::Optimizing => "Optimizing the stylesheet",
            Self::Persisting => "Storing the cache",
            Self::Done => "Cache generated",
            Self::Failed => "Cache generation failed",
        }
    }
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub version: TailwindVersion,
    pub kind: BuildKind,
    /// The stored artifact: readable CSS with a source map, minified CSS otherwise.
    pub css: String,
    pub sourcemap: Option<String>,
    pub normal: Optimized,
    pub minified: Optimized,
    /// Sorted candidates fed to the compiler. Empty for v3 builds.
    pub candidates: Vec<String>,
    pub cache: CssCache,
    /// Epoch milliseconds.
    pub started_at: i64,
}

/// Everything pulled from the backend before scanning.
struct Pulled {
    providers: Vec<Provider>,
    css_cache: CssCache,
    volume: Volume,
    version: TailwindVersion,
    sourcemap: bool,
}

pub struct CacheBuilder {
    backend: Arc<dyn Backend>,
    adapter: DesignSystemAdapter,
    extractor: Arc<CandidateExtractor>,
    sources: SourceLoader,
    caches: ProviderCacheStore,
    logger: BusLogger,
    queue: Mutex<()>,
    stage: watch::Sender<BuildStage>,
    store_warned: AtomicBool,
    last_candidates: RwLock<Vec<String>>,
}

impl CacheBuilder {
    pub fn new(
        backend: Arc<dyn Backend>,
        adapter: DesignSystemAdapter,
        sources: SourceLoader,
        logger: BusLogger,
    ) -> Self {
        let extractor = Arc::new(CandidateExtractor::new());
        extractor.init();
        let (stage, _) = watch::channel(BuildStage::Idle);

        Self {
            backend,
            adapter,
            extractor,
            sources,
            caches: ProviderCacheStore::disabled(),
            logger,
            queue: Mutex::new(()),
            stage,
            store_warned: AtomicBool::new(false),
            last_candidates: RwLock::new(Vec::new()),
        }
    }

    pub fn with_provider_cache(mut self, caches: ProviderCacheStore) -> Self {
        self.caches = caches;
        self
    }

    /// Stage updates. The receiver starts at the current stage.
    pub fn stage(&self) -> watch::Receiver<BuildStage> {
        self.stage.subscribe()
    }

    pub fn logger(&self) -> &BusLogger {
        &self.logger
    }

    /// Candidates of the most recent successful v4 build.
    pub fn last_candidates(&self) -> Vec<String> {
        self.last_candidates.read().clone()
    }

    /// Run one build. Waits for any build already running on this builder.
    pub async fn build_cache(&self, options: BuildCacheOptions) -> Result<BuildOutcome, BuildError> {
        let _turn = self.queue.lock().await;
        let timer = Instant::now();
        let started_at = Utc::now().timestamp_millis();

        match self.run(&options, started_at).await {
            Ok(outcome) => {
                if !outcome.candidates.is_empty() {
                    *self.last_candidates.write() = outcome.candidates.clone();
                }
                self.enter(BuildStage::Done);
                self.logger.add(LogEvent::success(format!(
                    "Cache generated: {} bytes in {} ms",
                    outcome.css.len(),
                    timer.elapsed().as_millis()
                )));
                Ok(outcome)
            }
            Err(err) => {
                self.logger.add(LogEvent::error(format!("Cache generation failed: {err}")));
                self.enter(BuildStage::Failed);
                Err(err)
            }
        }
    }

    fn enter(&self, stage: BuildStage) {
        self.stage.send_replace(stage);
        if !stage.is_terminal() {
            self.logger
                .add(LogEvent::info(format!("{}...", stage.message())).with_group("build"));
        }
    }

    async fn run(&self, options: &BuildCacheOptions, started_at: i64) -> Result<BuildOutcome, BuildError> {
        self.enter(BuildStage::PullingConfig);
        let pulled = self.pull_config(options).await?;
        debug!(
            "pulled {} providers, {} volume files, Tailwind CSS v{}",
            pulled.providers.len(),
            pulled.volume.len(),
            u8::from(pulled.version)
        );

        self.enter(BuildStage::Scanning);
        let batches = self.scan(&pulled, options).await?;

        self.enter(BuildStage::Extracting);
        let mut contents = batches
            .iter()
            .flat_map(|batch| &batch.contents)
            .map(extract::content_text)
            .collect::<Result<Vec<_>, _>>()?;
        contents.extend(options.incremental.sources.iter().cloned());

        let (css, input_map, candidates) = match pulled.version {
            TailwindVersion::V4 => self.compile_v4(&pulled.volume, contents).await?,
            TailwindVersion::V3 => {
                self.enter(BuildStage::Compiling);
                let css = self
                    .adapter
                    .build_legacy(&pulled.volume, DEFAULT_LEGACY_CONFIG, DEFAULT_ENTRYPOINT, contents)
                    .await?;
                (css, None, Vec::new())
            }
        };

        self.enter(BuildStage::Optimizing);
        let input_map = input_map.filter(|_| pulled.sourcemap);
        let normal = optimize(
            &css,
            &OptimizeOptions::new(OUTPUT_FILE).with_sourcemap(pulled.sourcemap, input_map.clone()),
        )?;
        let minified = optimize(
            &css,
            &OptimizeOptions::new(OUTPUT_FILE)
                .with_minify(true)
                .with_sourcemap(pulled.sourcemap, input_map),
        )?;
        let (primary, sourcemap) = if pulled.sourcemap {
            (normal.code.clone(), normal.map.clone())
        } else {
            (minified.code.clone(), None)
        };

        self.enter(BuildStage::Persisting);
        let full = options.kind == BuildKind::Full;
        let mut cache = if options.store {
            let request = StoreCacheRequest {
                content: extract::encode_base64(&primary),
                sourcemap: sourcemap.as_deref().map(extract::encode_base64),
                full_build: full.then_some(started_at),
            };
            self.backend.store_cache(&request).await?
        } else {
            debug!("store disabled, keeping the pulled cache record");
            pulled.css_cache.clone()
        };
        cache.last_generated = Some(Utc::now().timestamp_millis());
        cache.last_full_build = if full {
            Some(started_at)
        } else {
            pulled.css_cache.last_full_build
        };

        Ok(BuildOutcome {
            version: pulled.version,
            kind: options.kind,
            css: primary,
            sourcemap,
            normal,
            minified,
            candidates,
            cache,
            started_at,
        })
    }

    async fn pull_config(&self, options: &BuildCacheOptions) -> Result<Pulled, BuildError> {
        let needs_settings = options.tailwindcss_version.is_none() || options.sourcemap.is_none();
        let settings = async {
            if needs_settings {
                self.backend.settings().await.map(Some)
            } else {
                Ok(None)
            }
        };

        let (providers, css_cache, entries, settings) = tokio::try_join!(
            self.backend.providers(),
            self.backend.css_cache(),
            self.backend.volume(),
            settings
        )?;
        let settings: Settings = settings.unwrap_or_default();

        Ok(Pulled {
            providers,
            css_cache,
            volume: Volume::from_entries(&entries),
            version: options
                .tailwindcss_version
                .unwrap_or_else(|| settings.tailwind_version()),
            sourcemap: options.sourcemap.unwrap_or_else(|| settings.sourcemap()),
        })
    }

    async fn scan(&self, pulled: &Pulled, options: &BuildCacheOptions) -> Result<Vec<ScanBatch>, BuildError> {
        let enabled: Vec<&Provider> = pulled.providers.iter().filter(|p| p.enabled).collect();
        if enabled.is_empty() {
            self.logger.add(LogEvent::warning(
                "No content providers are enabled, only the stylesheets will be compiled",
            ));
            return Ok(Vec::new());
        }

        let watermark = pulled.css_cache.last_full_build;
        let scanned = try_join_all(
            enabled
                .into_iter()
                .map(|provider| self.scan_provider(provider, options, watermark)),
        )
        .await?;
        Ok(scanned.into_iter().flatten().collect())
    }

    async fn scan_provider(
        &self,
        provider: &Provider,
        options: &BuildCacheOptions,
        watermark: Option<i64>,
    ) -> Result<Vec<ScanBatch>, BuildError> {
        let label = if provider.name.is_empty() { &provider.id } else { &provider.name };

        let reuse = options.kind == BuildKind::Incremental
            && !options.incremental.providers.contains(&provider.id);
        if reuse {
            match self.caches.load(&provider.id) {
                Ok(Some(cached)) if cached.is_fresh(watermark) => {
                    self.logger
                        .add(LogEvent::info(format!("Using cached scan of {label}")).with_group("scan"));
                    return Ok(cached.contents);
                }
                Ok(_) => debug!("no fresh cached scan for {}", provider.id),
                Err(ProviderCacheError::Corrupt(err)) => self.logger.add(
                    LogEvent::warning(format!("Cached scan of {label} is unreadable ({err}), rescanning"))
                        .with_group("scan"),
                ),
                Err(err) => self.warn_store_unavailable(&err),
            }
        }

        let mut batches = Vec::new();
        let mut next = NextBatch::Done;
        for page in 1.. {
            let id = format!("scan-{}-{page}", provider.id);
            let message = format!("Scanning {label} (batch {page})");
            self.logger
                .add(LogEvent::info(&message).with_id(&id).with_group("scan"));

            let batch = match self.backend.scan_provider(&provider.id, &next).await {
                Ok(batch) => batch,
                Err(source) => {
                    self.logger.update(
                        LogEvent::error(format!("Scanning {label} failed: {source}"))
                            .with_id(&id)
                            .with_group("scan"),
                    );
                    return Err(BuildError::Scan {
                        provider: provider.id.clone(),
                        source,
                    });
                }
            };
            self.logger.update(
                LogEvent::info(format!("{message} - done"))
                    .with_id(&id)
                    .with_group("scan"),
            );

            next = batch.metadata.next_batch.clone();
            batches.push(batch);
            if next.is_done() {
                break;
            }
        }

        let cache = ProviderCache {
            contents: batches,
            timestamp: Utc::now().timestamp_millis(),
        };
        if let Err(err) = self.caches.save(&provider.id, &cache) {
            self.warn_store_unavailable(&err);
        }
        Ok(cache.contents)
    }

    fn warn_store_unavailable(&self, err: &ProviderCacheError) {
        if self.store_warned.swap(true, Ordering::Relaxed) {
            debug!("provider cache unavailable: {err}");
            return;
        }
        self.logger.add(LogEvent::warning(format!(
            "Provider cache unavailable ({err}), every build will rescan all providers"
        )));
    }

    /// Returns the generated CSS, its source map and the candidate set.
    async fn compile_v4(
        &self,
        volume: &Volume,
        contents: Vec<String>,
    ) -> Result<(String, Option<String>, Vec<String>), BuildError> {
        let request = CompileRequest::new(volume.clone());
        let mut compiled = self.adapter.compile(&request).await?;

        let candidates = self
            .sources
            .candidates(&self.extractor, compiled.sources(), contents, |source, err| {
                self.logger.add(LogEvent::warning(format!(
                    "Skipping @source \"{}\": {err}",
                    source.pattern
                )))
            })
            .await?;

        self.enter(BuildStage::Compiling);
        let css = compiled.build(&candidates).await?;
        Ok((css, compiled.build_source_map(), candidates))
    }
}

#[async_trait]
impl ClassSource for CacheBuilder {
    async fn classes(&self) -> Vec<String> {
        self.last_candidates()
    }
}
