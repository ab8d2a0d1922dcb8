//! Tailwind CSS compilation for WindPress volumes
//!
//! This crate turns a [`windpress_volume::Volume`] plus a set of class
//! candidates into optimized CSS:
//!
//! ```text
//! Volume ──► DesignSystemAdapter::compile ──► DesignSystem::build(candidates)
//!               │   (nesting, @apply)              │
//!               ▼                                  ▼
//!            Resolver ◄── @import/@plugin ──── TailwindCompiler ──► optimize()
//!               │
//!               └──► CDN (jsdelivr / esm.sh) for missing node_modules
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use windpress_compiler::{
//!     CdnConfig, CompileRequest, DesignSystemAdapter, HttpFetcher, OptimizeOptions, TailwindCli,
//!     optimize,
//! };
//! use windpress_volume::Volume;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cli = TailwindCli::new(PathBuf::from(".")).await?;
//! let fetcher = HttpFetcher::new(Duration::from_secs(30))?;
//! let adapter = DesignSystemAdapter::new(Arc::new(cli), Arc::new(fetcher), CdnConfig::default());
//!
//! let mut volume = Volume::new();
//! volume.insert("/main.css", "@import \"tailwindcss\";");
//! let request = CompileRequest::new(volume).with_candidates(vec!["p-4".into()]);
//!
//! let css = adapter.build(&request).await?;
//! let out = optimize(&css, &OptimizeOptions::default().with_minify(true))?;
//! println!("{}", out.code);
//! # Ok(())
//! # }
//! ```

pub mod builtins;
pub mod candidates;
pub mod cli;
pub mod design;
mod error;
pub mod fetch;
pub mod optimize;
pub mod preprocess;
pub mod resolve;

pub use candidates::CandidateExtractor;
pub use cli::{PackageManager, TailwindCli};
pub use design::{
    CompileRequest, Compiled, DesignSystem, DesignSystemAdapter, LegacyBuildRequest,
    SourceEntry, TailwindCompiler,
};
pub use error::{CandidateError, CompileError, FetchError, OptimizeError, ResolveError};
pub use fetch::{CdnConfig, Fetch, HttpFetcher};
pub use optimize::{OptimizeOptions, Optimized, optimize};
pub use resolve::{
    AssetLoader, LoadedModule, LoadedStylesheet, ModuleLinking, ResourceHint, Resolver,
};

/// Re-exported so callers can build URLs for [`Fetch`] without a direct
/// `reqwest` dependency.
pub use reqwest::Url;
