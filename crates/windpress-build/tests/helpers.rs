//! Shared test doubles for windpress-build tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::json;
use std::sync::Arc;
use windpress_build::extract::encode_base64;
use windpress_build::{
    Backend, BackendError, CacheBuilder, ContentKind, CssCache, MemoryStore, NextBatch, Provider,
    ProviderCacheStore, ScanBatch, ScanContent, Settings, SourceLoader, StoreCacheRequest,
};
use windpress_bus::{BusLogger, LogEvent, MessageBus, Subscription, peer};
use windpress_compiler::{
    AssetLoader, CdnConfig, CompileError, DesignSystem, DesignSystemAdapter, Fetch, FetchError,
    LegacyBuildRequest, SourceEntry, TailwindCompiler, Url,
};
use windpress_volume::Entry;

pub const MAIN_CSS: &str = "@import \"tailwindcss\";";

/// Stand-in for Tailwind's preflight.
pub const BASE_LAYER: &str = "@layer base { *, ::before, ::after { box-sizing: border-box; } }\n";

/// Utilities the fake design system knows how to generate.
const UTILITIES: &[(&str, &str)] = &[
    ("text-red-500", "color: #ef4444"),
    ("p-4", "padding: 1rem"),
    ("flex", "display: flex"),
    ("grid", "display: grid"),
];

pub fn provider(id: &str) -> Provider {
    Provider {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        enabled: true,
    }
}

pub fn text(content: &str) -> ScanContent {
    ScanContent {
        content: encode_base64(content),
        kind: ContentKind::Text,
    }
}

pub fn json_item(content: &str) -> ScanContent {
    ScanContent {
        content: encode_base64(content),
        kind: ContentKind::Json,
    }
}

/// In-memory backend serving paged provider scans.
#[derive(Default)]
pub struct FakeBackend {
    pub providers: Vec<Provider>,
    pub css_cache: CssCache,
    pub entries: Vec<Entry>,
    pub settings: Settings,
    /// Pages per provider, served in order.
    pub pages: FxHashMap<String, Vec<Vec<ScanContent>>>,
    pub failing: FxHashSet<String>,
    /// Provider id -> zero-based page whose request fails.
    pub failing_pages: FxHashMap<String, usize>,
    pub local_files: FxHashMap<String, Vec<ScanContent>>,
    pub scan_requests: Mutex<Vec<(String, NextBatch)>>,
    pub stored: Mutex<Vec<StoreCacheRequest>>,
    pub settings_requests: Mutex<usize>,
}

impl FakeBackend {
    /// One enabled provider `p` with one page, and the default entrypoint.
    pub fn single(content: &str) -> Self {
        Self::default()
            .with_file("main.css", MAIN_CSS)
            .with_provider("p", vec![vec![text(content)]])
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.entries.push(Entry::new(path, content));
        self
    }

    pub fn with_provider(mut self, id: &str, pages: Vec<Vec<ScanContent>>) -> Self {
        self.providers.push(provider(id));
        self.pages.insert(id.to_string(), pages);
        self
    }

    pub fn with_disabled_provider(mut self, id: &str) -> Self {
        self.providers.push(Provider {
            enabled: false,
            ..provider(id)
        });
        self
    }

    pub fn with_failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn with_failing_page(mut self, id: &str, page: usize) -> Self {
        self.failing_pages.insert(id.to_string(), page);
        self
    }

    pub fn with_last_full_build(mut self, at: i64) -> Self {
        self.css_cache.last_full_build = Some(at);
        self
    }

    pub fn with_settings(mut self, settings: serde_json::Value) -> Self {
        self.settings = Settings(settings);
        self
    }

    pub fn scans(&self) -> Vec<(String, NextBatch)> {
        self.scan_requests.lock().clone()
    }

    pub fn scans_of(&self, id: &str) -> usize {
        self.scan_requests.lock().iter().filter(|(p, _)| p == id).count()
    }

    pub fn stored(&self) -> Vec<StoreCacheRequest> {
        self.stored.lock().clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn providers(&self) -> Result<Vec<Provider>, BackendError> {
        Ok(self.providers.clone())
    }

    async fn css_cache(&self) -> Result<CssCache, BackendError> {
        Ok(self.css_cache.clone())
    }

    async fn volume(&self) -> Result<Vec<Entry>, BackendError> {
        Ok(self.entries.clone())
    }

    async fn settings(&self) -> Result<Settings, BackendError> {
        *self.settings_requests.lock() += 1;
        Ok(self.settings.clone())
    }

    async fn scan_provider(&self, provider_id: &str, next_batch: &NextBatch) -> Result<ScanBatch, BackendError> {
        self.scan_requests
            .lock()
            .push((provider_id.to_string(), next_batch.clone()));
        tokio::task::yield_now().await;

        if self.failing.contains(provider_id) {
            return Err(BackendError::Status {
                status: 500,
                message: "provider exploded".into(),
            });
        }

        let pages = self.pages.get(provider_id).cloned().unwrap_or_default();
        let index = match next_batch {
            NextBatch::Done => 0,
            NextBatch::Cursor(value) => value.as_u64().unwrap_or(0) as usize,
        };
        if self.failing_pages.get(provider_id) == Some(&index) {
            return Err(BackendError::Status {
                status: 502,
                message: format!("page {} timed out", index + 1),
            });
        }
        let contents = pages.get(index).cloned().unwrap_or_default();
        let next = if index + 1 < pages.len() {
            NextBatch::Cursor(json!(index + 1))
        } else {
            NextBatch::Done
        };

        let mut batch = ScanBatch {
            contents,
            ..ScanBatch::default()
        };
        batch.metadata.next_batch = next;
        Ok(batch)
    }

    async fn store_cache(&self, request: &StoreCacheRequest) -> Result<CssCache, BackendError> {
        self.stored.lock().push(request.clone());
        Ok(CssCache {
            last_generated: None,
            last_full_build: request.full_build.or(self.css_cache.last_full_build),
            file_url: Some("https://example.com/wp-content/uploads/windpress/cache/tailwind.css".into()),
            file_size: Some(request.content.len() as u64),
        })
    }

    async fn scan_local_files(&self, path: &str) -> Result<Vec<ScanContent>, BackendError> {
        Ok(self.local_files.get(path).cloned().unwrap_or_default())
    }
}

/// In-memory [`Fetch`]; unknown URLs are 404.
#[derive(Default)]
pub struct FakeFetcher {
    responses: FxHashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_string(), body.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Fetch for FakeFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        self.requests.lock().push(url.to_string());
        self.responses
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// What the fake compiler was asked to do.
#[derive(Default)]
pub struct CompilerLog {
    pub compiled: Mutex<Vec<String>>,
    pub built: Mutex<Vec<Vec<String>>>,
    pub legacy: Mutex<Vec<LegacyBuildRequest>>,
}

/// Design system emitting a base layer plus one rule per known utility.
#[derive(Clone, Default)]
pub struct FakeCompiler {
    pub sources: Vec<SourceEntry>,
    pub log: Arc<CompilerLog>,
}

impl FakeCompiler {
    pub fn with_source(mut self, pattern: &str) -> Self {
        self.sources.push(SourceEntry {
            base: "/".into(),
            pattern: pattern.into(),
            negated: false,
        });
        self
    }

    pub fn built(&self) -> Vec<Vec<String>> {
        self.log.built.lock().clone()
    }

    pub fn legacy_contents(&self) -> Vec<Vec<String>> {
        self.log.legacy.lock().iter().map(|r| r.contents.clone()).collect()
    }
}

pub fn generate(candidates: &[String]) -> String {
    let mut css = BASE_LAYER.to_string();
    for (class, declaration) in UTILITIES {
        if candidates.iter().any(|c| c == class) {
            css.push_str(&format!(".{class} {{ {declaration}; }}\n"));
        }
    }
    css
}

#[async_trait]
impl TailwindCompiler for FakeCompiler {
    async fn compile(
        &self,
        css: &str,
        _base: &str,
        _loader: Arc<dyn AssetLoader>,
    ) -> Result<Box<dyn DesignSystem>, CompileError> {
        self.log.compiled.lock().push(css.to_string());
        Ok(Box::new(FakeDesign {
            log: self.log.clone(),
            sources: self.sources.clone(),
        }))
    }

    async fn build_legacy(
        &self,
        request: LegacyBuildRequest,
        _loader: Arc<dyn AssetLoader>,
    ) -> Result<String, CompileError> {
        let count = request.contents.len();
        self.log.legacy.lock().push(request);
        Ok(format!("{BASE_LAYER}.legacy {{ --contents: {count}; }}\n"))
    }
}

struct FakeDesign {
    log: Arc<CompilerLog>,
    sources: Vec<SourceEntry>,
}

#[async_trait]
impl DesignSystem for FakeDesign {
    fn sources(&self) -> &[SourceEntry] {
        &self.sources
    }

    async fn build(&mut self, candidates: &[String]) -> Result<String, CompileError> {
        self.log.built.lock().push(candidates.to_vec());
        Ok(generate(candidates))
    }

    fn build_source_map(&self) -> Option<String> {
        None
    }
}

/// A builder wired to fakes, with its bus and an in-memory provider cache.
pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub compiler: Arc<FakeCompiler>,
    pub fetcher: Arc<FakeFetcher>,
    pub memory: Arc<MemoryStore>,
    pub bus: MessageBus,
    pub builder: Arc<CacheBuilder>,
}

impl Harness {
    pub fn new(backend: FakeBackend) -> Self {
        Self::with(backend, FakeCompiler::default(), FakeFetcher::default())
    }

    pub fn with(backend: FakeBackend, compiler: FakeCompiler, fetcher: FakeFetcher) -> Self {
        let memory = Arc::new(MemoryStore::new());
        let caches = ProviderCacheStore::new(Some(memory.clone()));
        Self::assemble(backend, compiler, fetcher, memory, caches)
    }

    /// No durable store: every build rescans.
    pub fn without_store(backend: FakeBackend) -> Self {
        Self::assemble(
            backend,
            FakeCompiler::default(),
            FakeFetcher::default(),
            Arc::new(MemoryStore::new()),
            ProviderCacheStore::disabled(),
        )
    }

    fn assemble(
        backend: FakeBackend,
        compiler: FakeCompiler,
        fetcher: FakeFetcher,
        memory: Arc<MemoryStore>,
        caches: ProviderCacheStore,
    ) -> Self {
        let backend = Arc::new(backend);
        let compiler = Arc::new(compiler);
        let fetcher = Arc::new(fetcher);
        let bus = MessageBus::new("test");

        let adapter = DesignSystemAdapter::new(
            compiler.clone(),
            fetcher.clone(),
            CdnConfig::default(),
        );
        let sources = SourceLoader::new(fetcher.clone(), CdnConfig::default()).with_backend(backend.clone());
        let logger = BusLogger::new(bus.clone(), peer::COMPILER, peer::DASHBOARD);
        let builder = CacheBuilder::new(backend.clone(), adapter, sources, logger)
            .with_provider_cache(caches);

        Self {
            backend,
            compiler,
            fetcher,
            memory,
            bus,
            builder: Arc::new(builder),
        }
    }
}

/// Log events posted so far, as `(task, event)`.
pub fn drain_logs(subscription: &mut Subscription) -> Vec<(String, LogEvent)> {
    let mut logs = Vec::new();
    while let Some(envelope) = subscription.try_recv() {
        if let Ok(Some(event)) = envelope.data_as::<LogEvent>() {
            logs.push((envelope.task.clone(), event));
        }
    }
    logs
}
