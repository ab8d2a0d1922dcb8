//! Rewriting of CommonJS/ESM sources into self-contained ES modules.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use parking_lot::RwLock;
use regex::{Captures, Regex};
use rustc_hash::FxHashMap;
use std::sync::LazyLock;

/// `import x from '...'`, `import '...'`, `import('...')`, `export ... from '...'`
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\bfrom\s*|\bimport\s*\(?\s*)(['"])([^'"\n]+)(['"])"#).expect("valid regex")
});

/// `require('...')`
static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).expect("valid regex")
});

static MODULE_EXPORTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmodule\.exports\s*=").expect("valid regex"));

/// A module ready to be handed to the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    /// Virtual path, or the specifier for remote modules.
    pub path: String,
    /// Directory further relative specifiers resolve against.
    pub base: String,
    /// How other modules import this one. Depends on the resolver's
    /// [`ModuleLinking`](super::ModuleLinking): a `data:` or CDN URL, or a
    /// bare package / sibling file specifier for Node.
    pub url: String,
    /// Rewritten source for local modules.
    pub source: Option<String>,
}

impl LoadedModule {
    pub fn remote(path: impl Into<String>, base: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            url: url.into(),
            source: None,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.source.is_none()
    }
}

/// Loaded local modules, keyed by virtual path.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: RwLock<FxHashMap<String, LoadedModule>>,
}

impl ModuleRegistry {
    pub fn get(&self, path: &str) -> Option<LoadedModule> {
        self.modules.read().get(path).cloned()
    }

    pub fn insert(&self, module: LoadedModule) {
        self.modules.write().insert(module.path.clone(), module);
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }

    /// Every loaded module, sorted by path.
    pub fn all(&self) -> Vec<LoadedModule> {
        let mut modules: Vec<LoadedModule> = self.modules.read().values().cloned().collect();
        modules.sort_by(|a, b| a.path.cmp(&b.path));
        modules
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.modules.read().keys().cloned().collect();
        paths.sort();
        paths
    }
}

/// Every import/require specifier in `source`, in first-seen order.
pub(crate) fn collect_specifiers(source: &str) -> Vec<String> {
    let mut seen = Vec::new();
    let found = IMPORT_RE
        .captures_iter(source)
        .map(|c| c[3].to_string())
        .chain(REQUIRE_RE.captures_iter(source).map(|c| c[1].to_string()));
    for spec in found {
        if !seen.contains(&spec) {
            seen.push(spec);
        }
    }
    seen
}

/// Rewrite `source` into an ES module, substituting resolved specifiers.
///
/// Specifiers missing from `urls` are left untouched.
pub(crate) fn rewrite(source: &str, urls: &FxHashMap<String, String>) -> String {
    let exported = MODULE_EXPORTS_RE.replace_all(source, "export default");

    let required = REQUIRE_RE.replace_all(&exported, |caps: &Captures| match urls.get(&caps[1]) {
        Some(url) => format!("(await import({})).default", quote(url)),
        None => caps[0].to_string(),
    });

    IMPORT_RE
        .replace_all(&required, |caps: &Captures| match urls.get(&caps[3]) {
            Some(url) => format!("{}{}{}{}", &caps[1], &caps[2], url, &caps[4]),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// File name a module is written under when linked as files.
pub fn module_file_name(path: &str) -> String {
    let hash = blake3::hash(path.as_bytes()).to_hex();
    format!("{}.mjs", &hash.as_str()[..16])
}

pub(crate) fn data_url(source: &str) -> String {
    format!("data:text/javascript;base64,{}", STANDARD.encode(source))
}

fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_specifiers() {
        let source = r#"
            import plugin from 'tailwindcss/plugin';
            import { colors } from "./colors.js";
            const forms = require('@tailwindcss/forms');
            export * from './colors.js';
        "#;
        assert_eq!(
            collect_specifiers(source),
            vec!["tailwindcss/plugin", "./colors.js", "@tailwindcss/forms"]
        );
    }

    #[test]
    fn test_rewrite_commonjs() {
        let source = "const forms = require('@tailwindcss/forms');\nmodule.exports = { plugins: [forms] };";
        let mut urls = FxHashMap::default();
        urls.insert(
            "@tailwindcss/forms".to_string(),
            "https://esm.sh/@tailwindcss/forms".to_string(),
        );

        let out = rewrite(source, &urls);
        assert_eq!(
            out,
            "const forms = (await import(\"https://esm.sh/@tailwindcss/forms\")).default;\nexport default { plugins: [forms] };"
        );
    }

    #[test]
    fn test_rewrite_keeps_unknown_specifiers() {
        let source = "import x from 'data:text/javascript,export default 1';";
        assert_eq!(rewrite(source, &FxHashMap::default()), source);
    }

    #[test]
    fn test_module_file_name() {
        let name = module_file_name("/plugins/a.js");
        assert_eq!(name.len(), "0123456789abcdef.mjs".len());
        assert!(name.ends_with(".mjs"));
        assert_eq!(name, module_file_name("/plugins/a.js"));
        assert_ne!(name, module_file_name("/plugins/b.js"));
    }

    #[test]
    fn test_data_url() {
        assert_eq!(data_url("export default 1"), "data:text/javascript;base64,ZXhwb3J0IGRlZmF1bHQgMQ==");
    }
}
