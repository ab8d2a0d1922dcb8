//! Network access for CDN stylesheets, modules and package listings.
//!
//! Everything that touches the network goes through the [`Fetch`] trait so
//! the resolver and source loader can run against in-memory fakes in tests.

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;

/// Default CDN serving raw npm package files (stylesheets, source files).
pub const DEFAULT_STYLESHEET_CDN: &str = "https://cdn.jsdelivr.net/npm/";

/// Default CDN serving npm packages as browser-ready ES modules.
pub const DEFAULT_MODULE_CDN: &str = "https://esm.sh/";

/// Default package file-listing API.
pub const DEFAULT_LISTING_API: &str = "https://data.jsdelivr.com/v1/packages/npm/";

/// Fetches remote text resources.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET `url` and return the body as text. Non-2xx responses are errors.
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError>;
}

/// CDN endpoints used for fallback resolution and source globbing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CdnConfig {
    pub stylesheet_base: String,
    pub module_base: String,
    pub listing_api: String,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            stylesheet_base: DEFAULT_STYLESHEET_CDN.to_string(),
            module_base: DEFAULT_MODULE_CDN.to_string(),
            listing_api: DEFAULT_LISTING_API.to_string(),
        }
    }
}

impl CdnConfig {
    /// Raw file URL for an npm path such as `tailwindcss/theme.css`.
    pub fn stylesheet_url(&self, package_path: &str) -> Result<Url, FetchError> {
        join_base(&self.stylesheet_base, package_path)
    }

    /// ES module URL for an npm specifier such as `@tailwindcss/typography`.
    pub fn module_url(&self, specifier: &str) -> Result<Url, FetchError> {
        join_base(&self.module_base, specifier)
    }

    /// npm specifier behind a stylesheet or module CDN URL.
    ///
    /// `https://cdn.jsdelivr.net/npm/daisyui/index.js` -> `daisyui/index.js`
    pub fn package_specifier(&self, url: &Url) -> Option<String> {
        let raw = url.as_str();
        let raw = raw.split(['?', '#']).next().unwrap_or(raw);
        [&self.stylesheet_base, &self.module_base]
            .into_iter()
            .find_map(|base| raw.strip_prefix(&format!("{}/", base.trim_end_matches('/'))))
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    }

    /// Flat file listing URL for `package@version`.
    pub fn listing_url(&self, package: &str, version: &str) -> Result<Url, FetchError> {
        let mut url = join_base(&self.listing_api, &format!("{package}@{version}"))?;
        url.set_query(Some("structure=flat"));
        Ok(url)
    }
}

fn join_base(base: &str, path: &str) -> Result<Url, FetchError> {
    let raw = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&raw).map_err(|e| FetchError::invalid_url(raw, e))
}

/// Whether `value` is an absolute `http:` or `https:` URL.
pub fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Directory of a URL, with a trailing slash (`https://x/a/b.css` -> `https://x/a/`).
pub fn url_dir(url: &Url) -> String {
    url.join(".")
        .map(|dir| dir.to_string())
        .unwrap_or_else(|_| url.to_string())
}

/// [`Fetch`] over HTTP(S) using reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("windpress/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        debug!("GET {url}");
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url.clone()).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(transport)
    }
}
