//! Wire and option types shared by the backend client and the orchestrator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A registered content source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Text,
    Json,
}

/// One scanned item; `content` is base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanContent {
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: ContentKind,
}

/// Pagination cursor. `false` on the wire means "no more pages" in a
/// response and "first page" in a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum NextBatch {
    #[default]
    Done,
    Cursor(Value),
}

impl NextBatch {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl From<Value> for NextBatch {
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::Bool(false) => Self::Done,
            other => Self::Cursor(other),
        }
    }
}

impl From<NextBatch> for Value {
    fn from(next: NextBatch) -> Self {
        match next {
            NextBatch::Done => Value::Bool(false),
            NextBatch::Cursor(value) => value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchMetadata {
    #[serde(default)]
    pub next_batch: NextBatch,
}

/// One page of a provider scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanBatch {
    #[serde(default)]
    pub contents: Vec<ScanContent>,
    #[serde(default)]
    pub metadata: BatchMetadata,
}

/// Body of a provider scan request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanRequest<'a> {
    pub provider_id: &'a str,
    pub metadata: BatchMetadata,
}

/// Locally persisted result of a complete provider scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCache {
    pub contents: Vec<ScanBatch>,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl ProviderCache {
    /// Reusable unless older than the last full build.
    pub fn is_fresh(&self, last_full_build: Option<i64>) -> bool {
        last_full_build.is_none_or(|watermark| self.timestamp >= watermark)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TailwindVersion {
    V3,
    V4,
}

impl TryFrom<u8> for TailwindVersion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            3 => Ok(Self::V3),
            4 => Ok(Self::V4),
            other => Err(format!("unsupported Tailwind CSS version {other}")),
        }
    }
}

impl From<TailwindVersion> for u8 {
    fn from(version: TailwindVersion) -> Self {
        match version {
            TailwindVersion::V3 => 3,
            TailwindVersion::V4 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildKind {
    #[default]
    Full,
    Incremental,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalScope {
    /// Providers rescanned even in an incremental build.
    #[serde(default)]
    pub providers: Vec<String>,
    /// Extra raw text (e.g. unsaved editor content) added to the content pool.
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Options for one `build_cache` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCacheOptions {
    #[serde(default = "default_store")]
    pub store: bool,
    /// Read from settings when `None`.
    #[serde(default)]
    pub tailwindcss_version: Option<TailwindVersion>,
    #[serde(default)]
    pub kind: BuildKind,
    #[serde(default)]
    pub incremental: IncrementalScope,
    /// Read from settings when `None`.
    #[serde(default)]
    pub sourcemap: Option<bool>,
}

fn default_store() -> bool {
    true
}

impl Default for BuildCacheOptions {
    fn default() -> Self {
        Self {
            store: true,
            tailwindcss_version: None,
            kind: BuildKind::Full,
            incremental: IncrementalScope::default(),
            sourcemap: None,
        }
    }
}

impl BuildCacheOptions {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn incremental() -> Self {
        Self {
            kind: BuildKind::Incremental,
            ..Self::default()
        }
    }

    pub fn with_store(mut self, store: bool) -> Self {
        self.store = store;
        self
    }

    pub fn with_version(mut self, version: TailwindVersion) -> Self {
        self.tailwindcss_version = Some(version);
        self
    }

    pub fn with_sourcemap(mut self, sourcemap: bool) -> Self {
        self.sourcemap = Some(sourcemap);
        self
    }

    pub fn with_providers(mut self, providers: Vec<String>) -> Self {
        self.incremental.providers = providers;
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.incremental.sources = sources;
        self
    }
}

/// Server-side record of the latest build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CssCache {
    #[serde(default)]
    pub last_generated: Option<i64>,
    #[serde(default)]
    pub last_full_build: Option<i64>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Body of the cache store request. `None` fields are sent as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCacheRequest {
    /// Base64 CSS.
    pub content: String,
    /// Base64 source map JSON.
    pub sourcemap: Option<String>,
    /// Build start (epoch ms) for full builds.
    pub full_build: Option<i64>,
}

/// Plugin options as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(pub Value);

impl Settings {
    /// `general.tailwindcss.version`, defaulting to 4.
    pub fn tailwind_version(&self) -> TailwindVersion {
        let raw = self.0.pointer("/general/tailwindcss/version");
        let number = match raw {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        match number {
            Some(3) => TailwindVersion::V3,
            _ => TailwindVersion::V4,
        }
    }

    /// `performance.cache.source_map`, defaulting to false.
    pub fn sourcemap(&self) -> bool {
        match self.0.pointer("/performance/cache/source_map") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.as_str(), "true" | "1"),
            Some(Value::Number(n)) => n.as_u64() == Some(1),
            _ => false,
        }
    }
}
