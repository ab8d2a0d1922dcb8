//! Stylesheet expansion for the CLI engine.
//!
//! The Tailwind CLI reads a single stylesheet from stdin and resolves
//! imports against the real filesystem, which knows nothing about the
//! volume. Before handing CSS to it we:
//!
//! - pull `@source "<glob>"` declarations out (the build scans those
//!   itself; `@source inline(...)` stays),
//! - load every `@plugin`/`@config` module through the asset loader and
//!   write it into the compile workspace, pointing the directive at the file
//!   (with file linking, every local module it imports is written next to it),
//! - inline every `@import` through the asset loader, honouring `layer()`
//!   and media conditions.

use futures::future::BoxFuture;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, trace};

use crate::design::SourceEntry;
use crate::error::CompileError;
use crate::fetch::is_http_url;
use crate::resolve::{AssetLoader, LoadedModule, ModuleLinking, ResourceHint, module_file_name};

/// Nested `@import` limit.
const MAX_IMPORT_DEPTH: usize = 32;

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*@import\s+(?:url\(\s*)?['"]([^'"]+)['"]\s*\)?([^;]*);"#).expect("valid regex")
});

static SOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*@source\s+(not\s+)?['"]([^'"]+)['"]\s*;[ \t]*\n?"#).expect("valid regex")
});

static MODULE_DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"@(plugin|config)\s+['"]([^'"]+)['"]"#).expect("valid regex"));

static LAYER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\blayer(?:\(\s*([^)]*?)\s*\))?").expect("valid regex"));

/// Tailwind import modifiers that have no meaning once the import is inlined.
static IMPORT_MODIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(source|theme|prefix)\([^)]*\)").expect("valid regex"));

pub(crate) struct Expander<'a> {
    loader: &'a dyn AssetLoader,
    modules_dir: PathBuf,
    linking: ModuleLinking,
    sources: Vec<SourceEntry>,
    seen: FxHashSet<String>,
    written: FxHashSet<String>,
}

impl<'a> Expander<'a> {
    pub(crate) fn new(loader: &'a dyn AssetLoader, modules_dir: &Path, linking: ModuleLinking) -> Self {
        Self {
            loader,
            modules_dir: modules_dir.to_path_buf(),
            linking,
            sources: Vec::new(),
            seen: FxHashSet::default(),
            written: FxHashSet::default(),
        }
    }

    pub(crate) fn into_sources(self) -> Vec<SourceEntry> {
        self.sources
    }

    /// Expand `css`, whose relative references resolve against `base`.
    pub(crate) fn expand<'b>(
        &'b mut self,
        css: String,
        base: String,
        depth: usize,
    ) -> BoxFuture<'b, Result<String, CompileError>> {
        Box::pin(async move {
            let css = self.collect_sources(&css, &base);
            let css = self.materialize_modules(&css, &base).await?;
            self.inline_imports(&css, &base, depth).await
        })
    }

    fn collect_sources(&mut self, css: &str, base: &str) -> String {
        for caps in SOURCE_RE.captures_iter(css) {
            let entry = SourceEntry {
                base: base.to_string(),
                pattern: caps[2].to_string(),
                negated: caps.get(1).is_some(),
            };
            trace!("@source {:?}", entry);
            self.sources.push(entry);
        }
        SOURCE_RE.replace_all(css, "").into_owned()
    }

    async fn materialize_modules(&mut self, css: &str, base: &str) -> Result<String, CompileError> {
        let mut out = String::with_capacity(css.len());
        let mut last = 0;

        for caps in MODULE_DIRECTIVE_RE.captures_iter(css) {
            let Some(whole) = caps.get(0) else { continue };
            let hint = if &caps[1] == "plugin" {
                ResourceHint::Plugin
            } else {
                ResourceHint::Config
            };

            let module = self.loader.load_module(&caps[2], base, hint).await?;
            let file = self.write_module(&module)?;
            debug!("@{} {} -> {}", &caps[1], &caps[2], file.display());

            out.push_str(&css[last..whole.start()]);
            out.push_str(&format!("@{} {}", &caps[1], quote(&file.to_string_lossy())));
            last = whole.end();
        }

        out.push_str(&css[last..]);
        Ok(out)
    }

    /// Write `module` into the modules directory and return its file.
    pub(crate) fn write_module(&mut self, module: &LoadedModule) -> Result<PathBuf, CompileError> {
        if self.linking == ModuleLinking::Node && module.is_remote() && is_http_url(&module.url) {
            return Err(CompileError::RemoteModule {
                id: module.path.clone(),
                url: module.url.clone(),
            });
        }

        let file = self.write_file(module)?;
        if self.linking == ModuleLinking::Node {
            for linked in self.loader.linked_modules() {
                self.write_file(&linked)?;
            }
        }
        Ok(file)
    }

    fn write_file(&mut self, module: &LoadedModule) -> Result<PathBuf, CompileError> {
        let file = self.modules_dir.join(module_file_name(&module.path));
        if self.written.insert(module.path.clone()) {
            std::fs::create_dir_all(&self.modules_dir)
                .and_then(|_| std::fs::write(&file, module_body(module)))
                .map_err(|e| CompileError::workspace(&file, e))?;
        }
        Ok(file)
    }

    async fn inline_imports(&mut self, css: &str, base: &str, depth: usize) -> Result<String, CompileError> {
        let mut out = String::with_capacity(css.len());
        let mut last = 0;

        for caps in IMPORT_RE.captures_iter(css) {
            let Some(whole) = caps.get(0) else { continue };
            let specifier = &caps[1];
            out.push_str(&css[last..whole.start()]);
            last = whole.end();

            if is_http_url(specifier) || specifier.starts_with("//") {
                out.push_str(whole.as_str());
                continue;
            }
            if depth >= MAX_IMPORT_DEPTH {
                return Err(CompileError::ImportDepth {
                    id: specifier.to_string(),
                    max_depth: MAX_IMPORT_DEPTH,
                });
            }

            let loaded = self.loader.load_stylesheet(specifier, base).await?;
            if !self.seen.insert(loaded.path.clone()) {
                trace!("skipping duplicate import {}", loaded.path);
                continue;
            }

            let inner = self.expand(loaded.content, loaded.base, depth + 1).await?;
            out.push_str(&wrap_conditions(&inner, &caps[2]));
        }

        out.push_str(&css[last..]);
        Ok(out)
    }
}

/// Wrap inlined CSS in the `layer(...)` and media conditions of its import.
fn wrap_conditions(css: &str, conditions: &str) -> String {
    let mut layer = None;
    let mut rest = conditions.to_string();

    if let Some(caps) = LAYER_RE.captures(conditions) {
        layer = Some(caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default());
        rest = LAYER_RE.replace(&rest, "").into_owned();
    }
    let media = IMPORT_MODIFIER_RE.replace_all(&rest, "").trim().to_string();

    let mut wrapped = css.trim_end().to_string();
    if !media.is_empty() {
        wrapped = format!("@media {media} {{\n{wrapped}\n}}");
    }
    match layer {
        Some(name) if name.is_empty() => format!("@layer {{\n{wrapped}\n}}\n"),
        Some(name) => format!("@layer {name} {{\n{wrapped}\n}}\n"),
        None => format!("{wrapped}\n"),
    }
}

/// Rewritten source of a local module, or a re-export shim of whatever a
/// remote module points at (a CDN URL, or a bare package under Node).
pub(crate) fn module_body(module: &LoadedModule) -> String {
    match &module.source {
        Some(source) => source.clone(),
        None => format!("export {{ default }} from {};\n", quote(&module.url)),
    }
}

pub(crate) fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::resolve::LoadedStylesheet;
    use async_trait::async_trait;

    /// Loader that only reports a fixed set of linked modules.
    struct LinkedOnly(Vec<LoadedModule>);

    #[async_trait]
    impl AssetLoader for LinkedOnly {
        async fn load_stylesheet(&self, id: &str, base: &str) -> Result<LoadedStylesheet, ResolveError> {
            Err(ResolveError::StylesheetNotFound {
                id: id.to_string(),
                base: base.to_string(),
                remote: false,
                reason: "not available".to_string(),
            })
        }

        async fn load_module(
            &self,
            id: &str,
            base: &str,
            _hint: ResourceHint,
        ) -> Result<LoadedModule, ResolveError> {
            Err(ResolveError::ModuleNotFound {
                id: id.to_string(),
                base: base.to_string(),
                remote: false,
                reason: "not available".to_string(),
            })
        }

        fn linked_modules(&self) -> Vec<LoadedModule> {
            self.0.clone()
        }
    }

    fn local(path: &str, source: &str) -> LoadedModule {
        LoadedModule {
            path: path.to_string(),
            base: "/plugins".to_string(),
            url: format!("./{}", module_file_name(path)),
            source: Some(source.to_string()),
        }
    }

    #[test]
    fn test_module_body_shims() {
        let node = LoadedModule::remote("daisyui", "/", "daisyui");
        assert_eq!(module_body(&node), "export { default } from \"daisyui\";\n");

        let url = LoadedModule::remote("daisyui", "/", "https://esm.sh/daisyui");
        assert_eq!(module_body(&url), "export { default } from \"https://esm.sh/daisyui\";\n");

        assert_eq!(module_body(&local("/plugins/a.js", "export default 1;")), "export default 1;");
    }

    #[test]
    fn test_node_linking_writes_imported_modules() {
        let dir = tempfile::tempdir().unwrap();
        let nested = local("/plugins/b.js", "export default { name: 'b' };");
        let entry = local(
            "/plugins/a.js",
            &format!("import b from \"{}\";\nexport default b;", nested.url),
        );
        let loader = LinkedOnly(vec![entry.clone(), nested.clone()]);
        let mut expander = Expander::new(&loader, dir.path(), ModuleLinking::Node);

        let file = expander.write_module(&entry).unwrap();

        assert_eq!(file, dir.path().join(module_file_name("/plugins/a.js")));
        assert!(std::fs::read_to_string(&file).unwrap().contains(&nested.url));
        assert_eq!(
            std::fs::read_to_string(dir.path().join(module_file_name("/plugins/b.js"))).unwrap(),
            "export default { name: 'b' };"
        );
    }

    #[test]
    fn test_node_linking_rejects_url_modules() {
        let dir = tempfile::tempdir().unwrap();
        let loader = LinkedOnly(Vec::new());
        let module = LoadedModule::remote("https://example.com/plugin.js", "https://example.com/", "https://example.com/plugin.js");

        let mut node = Expander::new(&loader, dir.path(), ModuleLinking::Node);
        let err = node.write_module(&module).unwrap_err();
        assert!(matches!(err, CompileError::RemoteModule { .. }));

        let mut url = Expander::new(&loader, dir.path(), ModuleLinking::Url);
        assert!(url.write_module(&module).is_ok());
    }

    #[test]
    fn test_wrap_conditions() {
        assert_eq!(wrap_conditions(".a{}", ""), ".a{}\n");
        assert_eq!(
            wrap_conditions(".a{}", " layer(theme)"),
            "@layer theme {\n.a{}\n}\n"
        );
        assert_eq!(
            wrap_conditions(".a{}", " layer(base) screen"),
            "@layer base {\n@media screen {\n.a{}\n}\n}\n"
        );
        assert_eq!(wrap_conditions(".a{}", " source(none)"), ".a{}\n");
    }
}
