//! Shared test doubles for windpress-compiler tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use windpress_compiler::{
    AssetLoader, CdnConfig, CompileError, DesignSystem, FetchError, Fetch, LegacyBuildRequest,
    Resolver, SourceEntry, TailwindCompiler, Url,
};
use windpress_volume::Volume;

/// In-memory [`Fetch`] that records every requested URL.
#[derive(Default)]
pub struct FakeFetcher {
    responses: FxHashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_string(), body.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Fetch for FakeFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        self.requests.lock().push(url.to_string());
        self.responses
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

pub fn resolver(volume: &Volume, fetcher: Arc<FakeFetcher>) -> Resolver {
    Resolver::new(volume, fetcher, CdnConfig::default())
}

/// Compiler that records its input and emits one rule per candidate.
#[derive(Default)]
pub struct RecordingCompiler {
    pub inputs: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl TailwindCompiler for RecordingCompiler {
    async fn compile(
        &self,
        css: &str,
        base: &str,
        _loader: Arc<dyn AssetLoader>,
    ) -> Result<Box<dyn DesignSystem>, CompileError> {
        self.inputs.lock().push((css.to_string(), base.to_string()));
        Ok(Box::new(EchoDesign { sources: Vec::new() }))
    }

    async fn build_legacy(
        &self,
        request: LegacyBuildRequest,
        _loader: Arc<dyn AssetLoader>,
    ) -> Result<String, CompileError> {
        Ok(format!("{}/* {} contents */", request.main_css, request.contents.len()))
    }
}

pub struct EchoDesign {
    sources: Vec<SourceEntry>,
}

#[async_trait]
impl DesignSystem for EchoDesign {
    fn sources(&self) -> &[SourceEntry] {
        &self.sources
    }

    async fn build(&mut self, candidates: &[String]) -> Result<String, CompileError> {
        Ok(candidates.iter().map(|c| format!(".{c}{{}}")).collect())
    }

    fn build_source_map(&self) -> Option<String> {
        None
    }
}
