use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;
use windpress_volume::Entry;

use super::Backend;
use crate::error::BackendError;
use crate::models::{
    BatchMetadata, CssCache, NextBatch, Provider, ScanBatch, ScanContent, ScanRequest, Settings,
    StoreCacheRequest,
};

pub const DEFAULT_REST_PREFIX: &str = "windpress/v1";

/// WordPress application password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// [`Backend`] over the site's REST API.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    /// `<site>/wp-json/<prefix>/admin/`
    base: Url,
    credentials: Option<Credentials>,
}

#[derive(Deserialize)]
struct ProvidersResponse {
    #[serde(default)]
    providers: Vec<Provider>,
}

#[derive(Deserialize)]
struct CacheResponse {
    #[serde(default)]
    cache: CssCache,
}

#[derive(Deserialize)]
struct VolumeResponse {
    #[serde(default)]
    entries: Vec<Entry>,
}

#[derive(Deserialize)]
struct OptionsResponse {
    #[serde(default)]
    options: Value,
}

#[derive(Deserialize)]
struct LocalFilesResponse {
    #[serde(default)]
    contents: Vec<ScanContent>,
}

impl RestBackend {
    pub fn new(
        site_url: &str,
        rest_prefix: &str,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let raw = format!(
            "{}/wp-json/{}/admin/",
            site_url.trim_end_matches('/'),
            rest_prefix.trim_matches('/')
        );
        let base = Url::parse(&raw).map_err(|e| BackendError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("windpress/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport {
                url: raw,
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base.join(path).map_err(|e| BackendError::InvalidUrl {
            url: format!("{}{path}", self.base),
            reason: e.to_string(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(c) => request.basic_auth(&c.username, Some(&c.password)),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = self.endpoint(path)?;
        debug!("GET {url}");
        self.send(url.clone(), self.authorize(self.client.get(url))).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, BackendError> {
        let url = self.endpoint(path)?;
        debug!("POST {url}");
        self.send(url.clone(), self.authorize(self.client.post(url).json(body)))
            .await
    }

    async fn send<T: DeserializeOwned>(&self, url: Url, request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await.map_err(|e| BackendError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| BackendError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: error_message(&body, status.canonical_reason()),
            });
        }

        serde_json::from_str(&body).map_err(|e| BackendError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// WordPress REST errors carry `{code, message, data}`.
fn error_message(body: &str, reason: Option<&str>) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                reason.unwrap_or("request failed").to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        })
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, BackendError> {
    serde_json::to_value(value).map_err(|e| BackendError::Decode {
        url: String::new(),
        message: e.to_string(),
    })
}

#[async_trait]
impl Backend for RestBackend {
    async fn providers(&self) -> Result<Vec<Provider>, BackendError> {
        let response: ProvidersResponse = self.get("settings/cache/providers").await?;
        Ok(response.providers)
    }

    async fn css_cache(&self) -> Result<CssCache, BackendError> {
        let response: CacheResponse = self.get("settings/cache/index").await?;
        Ok(response.cache)
    }

    async fn volume(&self) -> Result<Vec<Entry>, BackendError> {
        let response: VolumeResponse = self.get("volume/index").await?;
        Ok(response.entries)
    }

    async fn settings(&self) -> Result<Settings, BackendError> {
        let response: OptionsResponse = self.get("settings/options/index").await?;
        Ok(Settings(response.options))
    }

    async fn scan_provider(&self, provider_id: &str, next_batch: &NextBatch) -> Result<ScanBatch, BackendError> {
        let body = to_body(&ScanRequest {
            provider_id,
            metadata: BatchMetadata {
                next_batch: next_batch.clone(),
            },
        })?;
        self.post("settings/cache/providers/scan", &body).await
    }

    async fn store_cache(&self, request: &StoreCacheRequest) -> Result<CssCache, BackendError> {
        let response: CacheResponse = self.post("settings/cache/store", &to_body(request)?).await?;
        Ok(response.cache)
    }

    async fn scan_local_files(&self, path: &str) -> Result<Vec<ScanContent>, BackendError> {
        let response: LocalFilesResponse = self
            .post("local-file-provider/scan", &json!({ "path": path }))
            .await?;
        Ok(response.contents)
    }
}
