//! `@source` loading against a fake CDN and backend

mod helpers;

use helpers::*;
use std::sync::Arc;
use windpress_build::{SourceError, SourceLoader};
use windpress_compiler::{CandidateExtractor, CdnConfig, SourceEntry};

fn entry(pattern: &str) -> SourceEntry {
    SourceEntry {
        base: "/".into(),
        pattern: pattern.into(),
        negated: false,
    }
}

const LISTING: &str = r#"{
    "default": "/dist/index.js",
    "files": [
        {"name": "/dist/index.js", "hash": "a", "size": 10},
        {"name": "/dist/theme.css", "hash": "b", "size": 10},
        {"name": "/dist/nested/extra.js", "hash": "c", "size": 10},
        {"name": "/package.json", "hash": "d", "size": 10}
    ]
}"#;

#[tokio::test]
async fn test_jsdelivr_glob_fetches_matching_files() {
    let fetcher = Arc::new(
        FakeFetcher::default()
            .with("https://data.jsdelivr.com/v1/packages/npm/ui-kit@1.0.0?structure=flat", LISTING)
            .with("https://cdn.jsdelivr.net/npm/ui-kit@1.0.0/dist/index.js", "'flex'")
            .with("https://cdn.jsdelivr.net/npm/ui-kit@1.0.0/dist/nested/extra.js", "'grid'"),
    );
    let loader = SourceLoader::new(fetcher.clone(), CdnConfig::default());

    let results = loader.load(&[entry("jsdelivr:ui-kit@1.0.0/dist/**/*.js")]).await;

    assert_eq!(results.len(), 1);
    let mut contents = results.into_iter().next().unwrap().unwrap();
    contents.sort();
    assert_eq!(contents, vec!["'flex'", "'grid'"]);
    assert!(!fetcher.requests().iter().any(|url| url.ends_with("theme.css")));
}

#[tokio::test]
async fn test_failures_are_independent() {
    let fetcher = Arc::new(FakeFetcher::default().with("https://example.com/a.html", "<b class='flex'>"));
    let loader = SourceLoader::new(fetcher, CdnConfig::default());

    let results = loader
        .load(&[
            entry("https://example.com/missing.html"),
            entry("https://example.com/a.html"),
            entry("ftp://example.com/x"),
        ])
        .await;

    assert!(matches!(results[0], Err(SourceError::Fetch(_))));
    assert_eq!(results[1].as_ref().unwrap(), &vec!["<b class='flex'>".to_string()]);
    assert!(matches!(results[2], Err(SourceError::UnsupportedScheme(_))));
}

#[tokio::test]
async fn test_non_ascii_package_fails_alone() {
    let fetcher = Arc::new(FakeFetcher::default().with("https://example.com/a.html", "<b class='flex'>"));
    let loader = SourceLoader::new(fetcher, CdnConfig::default());

    let results = loader
        .load(&[entry("jsdelivr:é/x"), entry("https://example.com/a.html")])
        .await;

    assert!(results[0].is_err());
    assert_eq!(results[1].as_ref().unwrap(), &vec!["<b class='flex'>".to_string()]);
}

#[tokio::test]
async fn test_negated_sources_are_skipped() {
    let fetcher = Arc::new(FakeFetcher::default());
    let loader = SourceLoader::new(fetcher.clone(), CdnConfig::default());

    let mut negated = entry("https://example.com/a.html");
    negated.negated = true;
    let results = loader.load(&[negated]).await;

    assert!(results.is_empty());
    assert!(fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_wp_content_reads_through_backend() {
    let mut backend = FakeBackend::default();
    backend
        .local_files
        .insert("themes/site/templates".into(), vec![text("<main class=&quot;grid&quot;>")]);
    let loader = SourceLoader::new(Arc::new(FakeFetcher::default()), CdnConfig::default())
        .with_backend(Arc::new(backend));

    let results = loader.load(&[entry("wp-content:/themes/site/templates")]).await;

    assert_eq!(results[0].as_ref().unwrap(), &vec!["<main class=\"grid\">".to_string()]);
}

#[tokio::test]
async fn test_wp_content_without_backend_is_unsupported() {
    let loader = SourceLoader::new(Arc::new(FakeFetcher::default()), CdnConfig::default());
    let results = loader.load(&[entry("wp-content:themes")]).await;
    assert!(matches!(results[0], Err(SourceError::UnsupportedScheme(_))));
}

#[tokio::test]
async fn test_candidates_merge_contents_and_sources() {
    let fetcher = Arc::new(FakeFetcher::default().with("https://example.com/a.html", "<b class='grid flex'>"));
    let loader = SourceLoader::new(fetcher.clone(), CdnConfig::default());
    let extractor = Arc::new(CandidateExtractor::new());
    extractor.init();

    let negated = SourceEntry {
        negated: true,
        ..entry("https://example.com/ignored.html")
    };
    let sources = [entry("https://example.com/missing.html"), negated, entry("https://example.com/a.html")];
    let mut skipped = Vec::new();

    let candidates = loader
        .candidates(&extractor, &sources, vec!["<i class='flex p-4'>".into()], |source, err| {
            skipped.push((source.pattern.clone(), err.to_string()))
        })
        .await
        .unwrap();

    for class in ["flex", "grid", "p-4"] {
        assert!(candidates.contains(&class.to_string()), "missing {class}");
    }
    assert_eq!(candidates.iter().filter(|c| *c == "flex").count(), 1);
    assert!(candidates.windows(2).all(|pair| pair[0] < pair[1]));

    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].0, "https://example.com/missing.html");
    assert!(!fetcher.requests().iter().any(|url| url.ends_with("ignored.html")));
}
