//! Stylesheet and module resolution against a virtual volume with CDN fallback.
//!
//! The Tailwind compiler asks for two kinds of assets while compiling:
//! stylesheets (`@import`) and JavaScript modules (`@plugin`, `@config`,
//! and whatever those modules import in turn). [`Resolver`] answers both
//! from the build's volume first and falls back to public CDNs for npm
//! packages that are not in the volume.
//!
//! # Resolution order for stylesheets
//!
//! 1. `fetch:<url>` and absolute `http(s)` ids are fetched as-is.
//! 2. Relative ids are joined onto `base` (a virtual directory or a URL).
//! 3. Bare ids map to `/node_modules/<id>`; a bare package name with no
//!    subpath maps to `/node_modules/<pkg>/index.css`.
//! 4. Without an extension, `<path>.css` is tried, then `<path>/index.css`.
//! 5. The volume (pre-merged with [`crate::builtins`]) is consulted.
//! 6. Paths under `/node_modules/` fall back to the stylesheet CDN. Fetched
//!    text has relative `@config`/`@plugin` paths rewritten to absolute
//!    URLs and is memoized into the resolver's private volume copy.
//!
//! The caller's volume is never modified; memoization only touches the copy
//! owned by this resolver, which lives for a single compilation.
//!
//! # Module linking
//!
//! With [`ModuleLinking::Url`] bare packages become module CDN URLs and
//! local modules `data:` URLs, which suits hosts whose loader imports
//! `https:` (browsers, Deno). Node's ESM loader refuses `https:` and
//! cannot resolve bare packages from `data:` modules, so with
//! [`ModuleLinking::Node`] bare packages stay bare, CDN URLs are mapped back
//! to package specifiers, and local modules import each other as sibling
//! files named by [`module_file_name`].

mod module;

pub use module::{LoadedModule, ModuleRegistry, module_file_name};

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use regex::{Captures, Regex};
use reqwest::Url;
use rustc_hash::FxHashMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, trace};
use windpress_volume::{Volume, path};

use crate::builtins;
use crate::error::{FetchError, ResolveError};
use crate::fetch::{CdnConfig, Fetch, is_http_url, url_dir};

/// Explicit network marker: `fetch:https://...`.
pub const FETCH_MARKER: &str = "fetch:";

const NODE_MODULES: &str = "/node_modules/";

static CSS_DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@(config|plugin)\s+(['"])(\.{1,2}/[^'"]+)(['"])"#).expect("valid regex")
});

/// How loaded modules reference packages and each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModuleLinking {
    /// CDN URLs for packages, `data:` URLs for local modules.
    #[default]
    Url,
    /// Bare package specifiers and sibling `.mjs` files.
    Node,
}

/// What a module is being loaded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceHint {
    Plugin,
    Config,
}

/// A resolved stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedStylesheet {
    /// Virtual path or URL the content came from.
    pub path: String,
    /// Directory for resolving imports inside `content`.
    pub base: String,
    pub content: String,
}

/// The two loading callbacks a Tailwind compiler needs.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load_stylesheet(&self, id: &str, base: &str) -> Result<LoadedStylesheet, ResolveError>;

    async fn load_module(
        &self,
        id: &str,
        base: &str,
        hint: ResourceHint,
    ) -> Result<LoadedModule, ResolveError>;

    /// Every local module loaded so far, including nested imports. Engines
    /// that link modules as files write all of them.
    fn linked_modules(&self) -> Vec<LoadedModule> {
        Vec::new()
    }
}

/// Split a bare npm specifier into package name and optional subpath.
///
/// `@scope/pkg/a/b.css` -> (`@scope/pkg`, `Some("a/b.css")`)
pub fn split_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    let name_segments = if specifier.starts_with('@') { 2 } else { 1 };
    let mut split_at = None;
    for (seen, (idx, _)) in specifier.match_indices('/').enumerate() {
        if seen + 1 == name_segments {
            split_at = Some(idx);
            break;
        }
    }
    match split_at {
        Some(idx) if idx + 1 < specifier.len() => (&specifier[..idx], Some(&specifier[idx + 1..])),
        Some(idx) => (&specifier[..idx], None),
        None => (specifier, None),
    }
}

fn is_bare(id: &str) -> bool {
    !(path::is_relative(id)
        || id.starts_with('/')
        || id.starts_with(FETCH_MARKER)
        || id.starts_with("data:")
        || is_http_url(id))
}

/// Virtual paths to try for a stylesheet specifier, in order.
fn stylesheet_candidates(id: &str, base: &str) -> Vec<String> {
    let resolved = if is_bare(id) {
        match split_package_specifier(id) {
            (package, None) => return vec![format!("{NODE_MODULES}{package}/index.css")],
            _ => format!("{NODE_MODULES}{id}"),
        }
    } else {
        path::join(base, id)
    };

    if path::has_extension(&resolved) {
        vec![resolved]
    } else {
        vec![format!("{resolved}.css"), format!("{resolved}/index.css")]
    }
}

/// Virtual paths to try for a module specifier, in order.
fn module_candidates(id: &str, base: &str) -> Vec<String> {
    let resolved = if is_bare(id) {
        format!("{NODE_MODULES}{id}")
    } else {
        path::join(base, id)
    };

    if path::has_extension(&resolved) {
        vec![resolved]
    } else {
        ["js", "mjs", "cjs"]
            .iter()
            .map(|ext| format!("{resolved}.{ext}"))
            .chain(std::iter::once(format!("{resolved}/index.js")))
            .collect()
    }
}

/// Resolves stylesheets and modules for one compilation.
pub struct Resolver {
    volume: RwLock<Volume>,
    fetcher: Arc<dyn Fetch>,
    cdn: CdnConfig,
    modules: ModuleRegistry,
    linking: ModuleLinking,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("files", &self.volume.read().len())
            .field("modules", &self.modules.len())
            .field("cdn", &self.cdn)
            .field("linking", &self.linking)
            .finish()
    }
}

impl Resolver {
    /// Create a resolver over a copy of `volume` merged with the built-in
    /// Tailwind stylesheets.
    pub fn new(volume: &Volume, fetcher: Arc<dyn Fetch>, cdn: CdnConfig) -> Self {
        Self {
            volume: RwLock::new(builtins::with_builtins(volume)),
            fetcher,
            cdn,
            modules: ModuleRegistry::default(),
            linking: ModuleLinking::default(),
        }
    }

    pub fn with_linking(mut self, linking: ModuleLinking) -> Self {
        self.linking = linking;
        self
    }

    pub fn linking(&self) -> ModuleLinking {
        self.linking
    }

    /// Snapshot of the resolver's volume, including memoized CDN files.
    pub fn volume(&self) -> Volume {
        self.volume.read().clone()
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn cdn(&self) -> &CdnConfig {
        &self.cdn
    }

    async fn fetch_stylesheet(&self, id: &str, base: &str, url: Url) -> Result<LoadedStylesheet, ResolveError> {
        let text = self.fetcher.fetch_text(&url).await.map_err(|e| ResolveError::StylesheetNotFound {
            id: id.to_string(),
            base: base.to_string(),
            remote: true,
            reason: e.to_string(),
        })?;

        Ok(LoadedStylesheet {
            path: url.to_string(),
            base: url_dir(&url),
            content: absolutize_directives(&text, &url),
        })
    }

    fn read_local(&self, candidates: &[String]) -> Option<(String, String)> {
        let volume = self.volume.read();
        candidates
            .iter()
            .find_map(|p| volume.get(p).map(|content| (p.clone(), content.to_string())))
    }

    /// How a bare package specifier is imported.
    fn package_ref(&self, id: &str, base: &str) -> Result<String, ResolveError> {
        match self.linking {
            ModuleLinking::Url => self.module_url(id, base),
            ModuleLinking::Node => Ok(id.to_string()),
        }
    }

    /// Module reference for an absolute URL. Under Node, CDN URLs turn back
    /// into package specifiers; other URLs are kept and fail in the engine.
    fn remote_ref(&self, url: &Url) -> String {
        match self.linking {
            ModuleLinking::Node => self.cdn.package_specifier(url).unwrap_or_else(|| url.to_string()),
            ModuleLinking::Url => url.to_string(),
        }
    }

    fn module_url(&self, id: &str, base: &str) -> Result<String, ResolveError> {
        self.cdn
            .module_url(id)
            .map(|url| url.to_string())
            .map_err(|e| ResolveError::ModuleNotFound {
                id: id.to_string(),
                base: base.to_string(),
                remote: true,
                reason: e.to_string(),
            })
    }

    fn load_local_module<'a>(
        &'a self,
        id: &'a str,
        base: &'a str,
        stack: Vec<String>,
    ) -> BoxFuture<'a, Result<LoadedModule, ResolveError>> {
        Box::pin(async move {
            let candidates = module_candidates(id, base);
            let Some((module_path, source)) = self.read_local(&candidates) else {
                return Err(ResolveError::ModuleNotFound {
                    id: id.to_string(),
                    base: base.to_string(),
                    remote: false,
                    reason: format!("tried {}", candidates.join(", ")),
                });
            };

            if stack.contains(&module_path) {
                let mut chain = stack.clone();
                chain.push(module_path);
                return Err(ResolveError::ModuleCycle {
                    chain: chain.join(" -> "),
                });
            }
            if let Some(cached) = self.modules.get(&module_path) {
                trace!("module cache hit {module_path}");
                return Ok(cached);
            }

            let dir = path::dirname(&module_path);
            let mut stack = stack;
            stack.push(module_path.clone());

            let mut urls = FxHashMap::default();
            for spec in module::collect_specifiers(&source) {
                let url = if spec.starts_with("data:") {
                    continue;
                } else if is_http_url(&spec) {
                    let package = match self.linking {
                        ModuleLinking::Node => Url::parse(&spec).ok().and_then(|url| self.cdn.package_specifier(&url)),
                        ModuleLinking::Url => None,
                    };
                    match package {
                        Some(package) => package,
                        None => continue,
                    }
                } else if let Some(rest) = spec.strip_prefix(FETCH_MARKER) {
                    match Url::parse(rest) {
                        Ok(url) => self.remote_ref(&url),
                        Err(_) => rest.to_string(),
                    }
                } else if is_bare(&spec) {
                    self.package_ref(&spec, &dir)?
                } else {
                    self.load_local_module(&spec, &dir, stack.clone()).await?.url
                };
                urls.insert(spec, url);
            }

            let rewritten = module::rewrite(&source, &urls);
            let url = match self.linking {
                ModuleLinking::Url => module::data_url(&rewritten),
                ModuleLinking::Node => format!("./{}", module_file_name(&module_path)),
            };
            let loaded = LoadedModule {
                path: module_path,
                base: dir,
                url,
                source: Some(rewritten),
            };
            debug!("loaded module {} ({} imports rewritten)", loaded.path, urls.len());
            self.modules.insert(loaded.clone());
            Ok(loaded)
        })
    }
}

#[async_trait]
impl AssetLoader for Resolver {
    async fn load_stylesheet(&self, id: &str, base: &str) -> Result<LoadedStylesheet, ResolveError> {
        if let Some(raw) = id.strip_prefix(FETCH_MARKER) {
            let url = Url::parse(raw).map_err(|e| FetchError::invalid_url(raw, e))?;
            return self.fetch_stylesheet(id, base, url).await;
        }
        if is_http_url(id) {
            let url = Url::parse(id).map_err(|e| FetchError::invalid_url(id, e))?;
            return self.fetch_stylesheet(id, base, url).await;
        }
        if is_http_url(base) && !is_bare(id) && !id.starts_with('/') {
            let url = Url::parse(base)
                .and_then(|b| b.join(id))
                .map_err(|e| FetchError::invalid_url(format!("{base}{id}"), e))?;
            return self.fetch_stylesheet(id, base, url).await;
        }

        let candidates = stylesheet_candidates(id, base);
        if let Some((found, content)) = self.read_local(&candidates) {
            trace!("stylesheet {id} -> {found}");
            return Ok(LoadedStylesheet {
                base: path::dirname(&found),
                path: found,
                content,
            });
        }

        if !candidates.iter().all(|p| p.starts_with(NODE_MODULES)) {
            return Err(ResolveError::StylesheetNotFound {
                id: id.to_string(),
                base: base.to_string(),
                remote: false,
                reason: format!("no such file in volume (tried {})", candidates.join(", ")),
            });
        }

        let mut last_error = None;
        for candidate in &candidates {
            let url = self.cdn.stylesheet_url(&candidate[NODE_MODULES.len()..])?;
            match self.fetcher.fetch_text(&url).await {
                Ok(text) => {
                    debug!("stylesheet {id} fetched from {url}");
                    let content = absolutize_directives(&text, &url);
                    self.volume.write().insert(candidate, content.clone());
                    return Ok(LoadedStylesheet {
                        path: candidate.clone(),
                        base: path::dirname(candidate),
                        content,
                    });
                }
                Err(e) => {
                    trace!("CDN miss for {url}: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(ResolveError::StylesheetNotFound {
            id: id.to_string(),
            base: base.to_string(),
            remote: true,
            reason: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn load_module(
        &self,
        id: &str,
        base: &str,
        hint: ResourceHint,
    ) -> Result<LoadedModule, ResolveError> {
        if let Some(raw) = id.strip_prefix(FETCH_MARKER) {
            let url = Url::parse(raw).map_err(|e| FetchError::invalid_url(raw, e))?;
            return Ok(LoadedModule::remote(id, url_dir(&url), self.remote_ref(&url)));
        }
        if is_http_url(id) {
            let url = Url::parse(id).map_err(|e| FetchError::invalid_url(id, e))?;
            return Ok(LoadedModule::remote(id, url_dir(&url), self.remote_ref(&url)));
        }
        if is_http_url(base) && path::is_relative(id) {
            let url = Url::parse(base)
                .and_then(|b| b.join(id))
                .map_err(|e| FetchError::invalid_url(format!("{base}{id}"), e))?;
            return Ok(LoadedModule::remote(id, url_dir(&url), self.remote_ref(&url)));
        }

        if is_bare(id) {
            let local = hint != ResourceHint::Plugin && self.read_local(&module_candidates(id, base)).is_some();
            if !local {
                let url = self.package_ref(id, base)?;
                debug!("module {id} -> {url}");
                return Ok(LoadedModule::remote(id, base, url));
            }
        }

        self.load_local_module(id, base, Vec::new()).await
    }

    fn linked_modules(&self) -> Vec<LoadedModule> {
        self.modules.all()
    }
}

/// Rewrite relative `@config`/`@plugin` paths in CDN-fetched CSS to absolute URLs.
fn absolutize_directives(css: &str, source_url: &Url) -> String {
    CSS_DIRECTIVE_RE
        .replace_all(css, |caps: &Captures| match source_url.join(&caps[3]) {
            Ok(url) => format!("@{} {}{}{}", &caps[1], &caps[2], url, &caps[4]),
            Err(_) => caps[0].to_string(),
        })
        .into_owned()
}
