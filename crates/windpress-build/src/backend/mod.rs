//! The WordPress side of the pipeline.
//!
//! [`Backend`] has one method per admin REST endpoint the build uses.
//! [`RestBackend`] talks to a real site; tests use in-memory fakes.

mod rest;

pub use rest::{Credentials, DEFAULT_REST_PREFIX, RestBackend};

use async_trait::async_trait;
use windpress_volume::Entry;

use crate::error::BackendError;
use crate::models::{CssCache, NextBatch, Provider, ScanBatch, ScanContent, Settings, StoreCacheRequest};

#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET admin/settings/cache/providers`
    async fn providers(&self) -> Result<Vec<Provider>, BackendError>;

    /// `GET admin/settings/cache/index`
    async fn css_cache(&self) -> Result<CssCache, BackendError>;

    /// `GET admin/volume/index`
    async fn volume(&self) -> Result<Vec<Entry>, BackendError>;

    /// `GET admin/settings/options/index`
    async fn settings(&self) -> Result<Settings, BackendError>;

    /// `POST admin/settings/cache/providers/scan`
    async fn scan_provider(&self, provider_id: &str, next_batch: &NextBatch) -> Result<ScanBatch, BackendError>;

    /// `POST admin/settings/cache/store`
    async fn store_cache(&self, request: &StoreCacheRequest) -> Result<CssCache, BackendError>;

    /// `POST admin/local-file-provider/scan`
    async fn scan_local_files(&self, path: &str) -> Result<Vec<ScanContent>, BackendError>;
}
