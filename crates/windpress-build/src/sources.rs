//! Loads the content behind `@source` declarations.
//!
//! Supported forms:
//!
//! - `jsdelivr:<pkg>[@version]<glob>` lists the package on the CDN, keeps the
//!   files matching the glob and fetches each of them.
//! - `http(s)://...` is fetched as a single string.
//! - `wp-content:<path>` is read by the backend's local file provider.
//!
//! Negated entries are skipped. Sources load concurrently and independently;
//! the caller decides what a failed source means.

use futures::future::{join_all, try_join_all};
use globset::{GlobBuilder, GlobMatcher};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, trace};
use windpress_compiler::{CandidateExtractor, CdnConfig, Fetch, SourceEntry, Url};

use crate::backend::Backend;
use crate::error::{BuildError, SourceError};
use crate::extract;

const JSDELIVR_SCHEME: &str = "jsdelivr:";
const WP_CONTENT_SCHEME: &str = "wp-content:";

/// A parsed `jsdelivr:` source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageGlob {
    pub package: String,
    pub version: String,
    /// Always starts with `/`.
    pub glob: String,
}

impl PackageGlob {
    /// Parse the part after `jsdelivr:`, e.g. `@scope/pkg@1.2.3/dist/**/*.js`.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return None;
        }

        // Scoped names span two path segments.
        let name_end = if spec.starts_with('@') {
            let scope_end = spec.find('/')?;
            spec[scope_end + 1..]
                .find('/')
                .map_or(spec.len(), |i| scope_end + 1 + i)
        } else {
            spec.find('/').unwrap_or(spec.len())
        };
        let (name_part, glob) = spec.split_at(name_end);
        if name_part.is_empty() {
            return None;
        }

        // A leading `@` marks the scope, not a version.
        let scope_len = usize::from(name_part.starts_with('@'));
        let (package, version) = match name_part[scope_len..].rfind('@') {
            Some(at) => (&name_part[..scope_len + at], &name_part[scope_len + at + 1..]),
            None => (name_part, ""),
        };
        if package.is_empty() || package.ends_with('/') {
            return None;
        }

        Some(Self {
            package: package.to_string(),
            version: if version.is_empty() { "latest" } else { version }.to_string(),
            glob: if glob.is_empty() || glob == "/" { "/**/*" } else { glob }.to_string(),
        })
    }

    fn matcher(&self) -> Result<GlobMatcher, SourceError> {
        GlobBuilder::new(&self.glob)
            .literal_separator(true)
            .build()
            .map(|glob| glob.compile_matcher())
            .map_err(|e| SourceError::InvalidGlob {
                pattern: self.glob.clone(),
                reason: e.to_string(),
            })
    }
}

#[derive(Deserialize)]
struct Listing {
    #[serde(default)]
    files: Vec<ListedFile>,
}

#[derive(Deserialize)]
struct ListedFile {
    name: String,
}

#[derive(Clone)]
pub struct SourceLoader {
    fetcher: Arc<dyn Fetch>,
    cdn: CdnConfig,
    backend: Option<Arc<dyn Backend>>,
}

impl SourceLoader {
    pub fn new(fetcher: Arc<dyn Fetch>, cdn: CdnConfig) -> Self {
        Self {
            fetcher,
            cdn,
            backend: None,
        }
    }

    /// Enable `wp-content:` sources.
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Load every non-negated source. Results keep the order of the
    /// non-negated entries.
    pub async fn load(&self, sources: &[SourceEntry]) -> Vec<Result<Vec<String>, SourceError>> {
        join_all(
            sources
                .iter()
                .filter(|source| !source.negated)
                .map(|source| self.load_one(&source.pattern)),
        )
        .await
    }

    /// Candidates in `contents` and in the text behind every loadable
    /// source, sorted and deduplicated. A source that fails to load is
    /// passed to `on_skip` and left out.
    pub async fn candidates(
        &self,
        extractor: &Arc<CandidateExtractor>,
        sources: &[SourceEntry],
        contents: Vec<String>,
        mut on_skip: impl FnMut(&SourceEntry, SourceError),
    ) -> Result<Vec<String>, BuildError> {
        let from_contents = {
            let extractor = Arc::clone(extractor);
            tokio::task::spawn_blocking(move || extractor.get_candidates(&contents))
        };
        let (from_contents, results) = tokio::join!(from_contents, self.load(sources));

        let mut texts = Vec::new();
        let active = sources.iter().filter(|source| !source.negated);
        for (source, result) in active.zip(results) {
            match result {
                Ok(loaded) => texts.extend(loaded),
                Err(err) => on_skip(source, err),
            }
        }

        let mut candidates = from_contents.map_err(|e| BuildError::Task(e.to_string()))??;
        candidates.extend(extractor.get_candidates(&texts)?);
        candidates.sort_unstable();
        candidates.dedup();
        debug!("{} candidates", candidates.len());
        Ok(candidates)
    }

    async fn load_one(&self, pattern: &str) -> Result<Vec<String>, SourceError> {
        let pattern = pattern.trim();
        if let Some(spec) = pattern.strip_prefix(JSDELIVR_SCHEME) {
            let glob = PackageGlob::parse(spec)
                .ok_or_else(|| SourceError::UnsupportedScheme(pattern.to_string()))?;
            self.load_package(&glob).await
        } else if let Some(path) = pattern.strip_prefix(WP_CONTENT_SCHEME) {
            self.load_wp_content(path).await
        } else if windpress_compiler::fetch::is_http_url(pattern) {
            let url = Url::parse(pattern)
                .map_err(|e| windpress_compiler::FetchError::invalid_url(pattern, e))?;
            Ok(vec![self.fetcher.fetch_text(&url).await?])
        } else {
            Err(SourceError::UnsupportedScheme(pattern.to_string()))
        }
    }

    async fn load_package(&self, glob: &PackageGlob) -> Result<Vec<String>, SourceError> {
        let matcher = glob.matcher()?;
        let listing_url = self.cdn.listing_url(&glob.package, &glob.version)?;
        let body = self.fetcher.fetch_text(&listing_url).await?;
        let listing: Listing = serde_json::from_str(&body).map_err(|e| SourceError::Listing {
            package: glob.package.clone(),
            reason: e.to_string(),
        })?;

        let urls = listing
            .files
            .iter()
            .filter(|file| matcher.is_match(&file.name))
            .map(|file| {
                self.cdn
                    .stylesheet_url(&format!("{}@{}{}", glob.package, glob.version, file.name))
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "{}@{}: {} of {} files match {}",
            glob.package,
            glob.version,
            urls.len(),
            listing.files.len(),
            glob.glob
        );

        let contents = try_join_all(urls.iter().map(|url| self.fetcher.fetch_text(url))).await?;
        Ok(contents)
    }

    async fn load_wp_content(&self, path: &str) -> Result<Vec<String>, SourceError> {
        let Some(backend) = &self.backend else {
            return Err(SourceError::UnsupportedScheme(format!("{WP_CONTENT_SCHEME}{path}")));
        };
        let items = backend.scan_local_files(path.trim_start_matches('/')).await?;
        trace!("wp-content:{path} returned {} files", items.len());
        items
            .iter()
            .map(|item| extract::content_text(item).map_err(|e| SourceError::Decode(e.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_package() {
        assert_eq!(
            PackageGlob::parse("daisyui/dist/**/*.js"),
            Some(PackageGlob {
                package: "daisyui".into(),
                version: "latest".into(),
                glob: "/dist/**/*.js".into(),
            })
        );
    }

    #[test]
    fn test_parse_versioned_and_scoped() {
        let glob = PackageGlob::parse("@headlessui/react@2.1.0/dist/*.js").unwrap();
        assert_eq!(glob.package, "@headlessui/react");
        assert_eq!(glob.version, "2.1.0");
        assert_eq!(glob.glob, "/dist/*.js");

        let bare = PackageGlob::parse("flowbite@2").unwrap();
        assert_eq!(bare.package, "flowbite");
        assert_eq!(bare.version, "2");
        assert_eq!(bare.glob, "/**/*");
    }

    #[test]
    fn test_parse_non_ascii_package() {
        let glob = PackageGlob::parse("é/dist/*.js").unwrap();
        assert_eq!(glob.package, "é");
        assert_eq!(glob.version, "latest");
        assert_eq!(glob.glob, "/dist/*.js");

        let versioned = PackageGlob::parse("ñandú@1.0.0").unwrap();
        assert_eq!(versioned.package, "ñandú");
        assert_eq!(versioned.version, "1.0.0");
    }

    #[test]
    fn test_parse_rejects_incomplete_scope() {
        assert_eq!(PackageGlob::parse(""), None);
        assert_eq!(PackageGlob::parse("@scope"), None);
    }

    #[test]
    fn test_glob_does_not_cross_directories_with_single_star() {
        let glob = PackageGlob::parse("pkg/dist/*.js").unwrap();
        let matcher = glob.matcher().unwrap();
        assert!(matcher.is_match("/dist/a.js"));
        assert!(!matcher.is_match("/dist/nested/a.js"));
    }
}
