//! # windpress-build
//!
//! Turns the content of a WordPress site into the WindPress stylesheet.
//!
//! ```text
//! Backend ──providers/volume/settings──► CacheBuilder
//!    ▲                                     │ scan (per provider, cached)
//!    │                                     │ extract candidates + @source
//!    │                                     │ compile (v4 / v3)
//!    └──────────── store_cache ◄───────────┘ optimize
//! ```
//!
//! [`CacheBuilder`] runs the build state machine, reporting progress on a
//! [`windpress_bus::MessageBus`]. [`BuildWorker`] drives it from bus
//! requests, and [`ClassIndex`] keeps class-name completions in sync with the
//! latest build.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use windpress_build::{BuildCacheOptions, CacheBuilder, RestBackend, SourceLoader};
//! use windpress_bus::{BusLogger, MessageBus, peer};
//! use windpress_compiler::{CdnConfig, DesignSystemAdapter, HttpFetcher, TailwindCli};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(RestBackend::new(
//!     "https://example.com",
//!     "windpress/v1",
//!     None,
//!     Duration::from_secs(30),
//! )?);
//! let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(30))?);
//! let compiler = Arc::new(TailwindCli::new(".".into()).await?);
//! let adapter = DesignSystemAdapter::new(compiler, fetcher.clone(), CdnConfig::default());
//! let sources = SourceLoader::new(fetcher, CdnConfig::default()).with_backend(backend.clone());
//!
//! let bus = MessageBus::default();
//! let logger = BusLogger::new(bus, peer::COMPILER, peer::DASHBOARD);
//! let builder = CacheBuilder::new(backend, adapter, sources, logger);
//!
//! let outcome = builder.build_cache(BuildCacheOptions::full()).await?;
//! println!("{} bytes", outcome.css.len());
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod builder;
mod error;
pub mod extract;
mod intellisense;
pub mod models;
mod provider_cache;
pub mod sources;
mod store;
mod worker;

pub use backend::{Backend, Credentials, DEFAULT_REST_PREFIX, RestBackend};
pub use builder::{BuildOutcome, BuildStage, CacheBuilder};
pub use error::{BackendError, BuildError, ProviderCacheError, SourceError};
pub use intellisense::{ClassIndex, ClassSource};
pub use models::{
    BuildCacheOptions, BuildKind, ContentKind, CssCache, IncrementalScope, NextBatch, Provider,
    ProviderCache, ScanBatch, ScanContent, Settings, StoreCacheRequest, TailwindVersion,
};
pub use provider_cache::{KEY_PREFIX, ProviderCacheStore, cache_key};
pub use sources::{PackageGlob, SourceLoader};
pub use store::{DurableStore, MemoryStore, RedbStore};
pub use worker::BuildWorker;
