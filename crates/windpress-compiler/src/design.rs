//! The design-system seam and the adapter that feeds it a volume.
//!
//! [`TailwindCompiler`] is whatever turns an entry stylesheet into a
//! [`DesignSystem`]: the Tailwind CLI in production, in-memory fakes in
//! tests. [`DesignSystemAdapter`] sits in front of it and owns the parts
//! that are the same for every engine:
//!
//! - reading the entrypoint from the volume,
//! - flattening nested rules and (in non-strict mode) stripping `@apply`,
//! - writing the processed entrypoint back into a private volume copy,
//! - wiring a [`Resolver`] in as the engine's asset loader.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use windpress_volume::{Volume, path};

use crate::builtins::LEGACY_MAIN_CSS;
use crate::error::CompileError;
use crate::fetch::{CdnConfig, Fetch};
use crate::preprocess;
use crate::resolve::{AssetLoader, ModuleLinking, Resolver};

pub const DEFAULT_ENTRYPOINT: &str = "/main.css";
pub const DEFAULT_LEGACY_CONFIG: &str = "/tailwind.config.js";

/// A `@source` declaration found while compiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Directory or URL of the stylesheet that declared it.
    pub base: String,
    pub pattern: String,
    pub negated: bool,
}

/// A compiled stylesheet that can generate CSS for candidate sets.
#[async_trait]
pub trait DesignSystem: Send + Sync {
    /// Extra globs the stylesheet asks to be scanned.
    fn sources(&self) -> &[SourceEntry];

    /// Generate CSS for `candidates`.
    async fn build(&mut self, candidates: &[String]) -> Result<String, CompileError>;

    /// Source map (JSON) of the most recent [`DesignSystem::build`], if the
    /// engine produced one.
    fn build_source_map(&self) -> Option<String>;
}

/// Input for a Tailwind v3 build.
#[derive(Debug, Clone)]
pub struct LegacyBuildRequest {
    /// Virtual path of the JS config.
    pub config_path: String,
    pub main_css: String,
    /// Raw content the legacy engine scans for classes itself.
    pub contents: Vec<String>,
}

/// A Tailwind engine.
#[async_trait]
pub trait TailwindCompiler: Send + Sync {
    /// Compile `css` (whose imports resolve relative to `base`) into a design system.
    async fn compile(
        &self,
        css: &str,
        base: &str,
        loader: Arc<dyn AssetLoader>,
    ) -> Result<Box<dyn DesignSystem>, CompileError>;

    /// Run a complete Tailwind v3 build.
    async fn build_legacy(
        &self,
        request: LegacyBuildRequest,
        loader: Arc<dyn AssetLoader>,
    ) -> Result<String, CompileError>;

    /// How the engine's module loader expects modules to be linked.
    fn module_linking(&self) -> ModuleLinking {
        ModuleLinking::Url
    }
}

/// What to compile.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub entrypoint: String,
    pub volume: Volume,
    pub candidates: Vec<String>,
    /// When false, `@apply` rules are removed before compiling.
    pub strict: bool,
}

impl CompileRequest {
    pub fn new(volume: Volume) -> Self {
        Self {
            entrypoint: DEFAULT_ENTRYPOINT.to_string(),
            volume,
            candidates: Vec::new(),
            strict: true,
        }
    }

    pub fn with_entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = path::normalize(&entrypoint.into());
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// A compiled design system together with the resolver that loaded it.
pub struct Compiled {
    design: Box<dyn DesignSystem>,
    resolver: Arc<Resolver>,
}

impl Compiled {
    pub fn sources(&self) -> &[SourceEntry] {
        self.design.sources()
    }

    pub async fn build(&mut self, candidates: &[String]) -> Result<String, CompileError> {
        self.design.build(candidates).await
    }

    pub fn build_source_map(&self) -> Option<String> {
        self.design.build_source_map()
    }

    /// Volume as the resolver saw it, including memoized CDN files.
    pub fn volume(&self) -> Volume {
        self.resolver.volume()
    }
}

/// Front end shared by every [`TailwindCompiler`].
#[derive(Clone)]
pub struct DesignSystemAdapter {
    compiler: Arc<dyn TailwindCompiler>,
    fetcher: Arc<dyn Fetch>,
    cdn: CdnConfig,
}

impl DesignSystemAdapter {
    pub fn new(compiler: Arc<dyn TailwindCompiler>, fetcher: Arc<dyn Fetch>, cdn: CdnConfig) -> Self {
        Self { compiler, fetcher, cdn }
    }

    fn resolver(&self, volume: &Volume) -> Arc<Resolver> {
        Arc::new(
            Resolver::new(volume, self.fetcher.clone(), self.cdn.clone())
                .with_linking(self.compiler.module_linking()),
        )
    }

    /// Compile the request's entrypoint into a design system.
    pub async fn compile(&self, request: &CompileRequest) -> Result<Compiled, CompileError> {
        let entrypoint = path::normalize(&request.entrypoint);
        let source = request
            .volume
            .get(&entrypoint)
            .ok_or_else(|| CompileError::MissingEntrypoint {
                path: entrypoint.clone(),
            })?;

        let mut css = match preprocess::flatten_nesting(source, &entrypoint) {
            Ok(flat) => flat,
            Err(reason) => {
                warn!("nesting pass skipped for {entrypoint}: {reason}");
                source.to_string()
            }
        };
        if !request.strict {
            css = preprocess::strip_apply(&css);
        }

        let mut volume = request.volume.clone();
        volume.insert(&entrypoint, css.clone());

        let resolver = self.resolver(&volume);
        debug!("compiling {entrypoint} ({} files in volume)", volume.len());
        let design = self
            .compiler
            .compile(&css, &path::dirname(&entrypoint), resolver.clone())
            .await?;

        Ok(Compiled { design, resolver })
    }

    /// `compile(request)` then `build(request.candidates)`.
    pub async fn build(&self, request: &CompileRequest) -> Result<String, CompileError> {
        let mut compiled = self.compile(request).await?;
        compiled.build(&request.candidates).await
    }

    /// Tailwind v3 build over raw contents.
    pub async fn build_legacy(
        &self,
        volume: &Volume,
        config_path: &str,
        entrypoint: &str,
        contents: Vec<String>,
    ) -> Result<String, CompileError> {
        let main_css = volume.get(entrypoint).unwrap_or(LEGACY_MAIN_CSS).to_string();
        let request = LegacyBuildRequest {
            config_path: path::normalize(config_path),
            main_css,
            contents,
        };
        self.compiler.build_legacy(request, self.resolver(volume)).await
    }
}
