//! Tailwind CSS CLI engine
//!
//! Implements [`TailwindCompiler`] by driving the Tailwind CLI through the
//! project's package manager (pnpm/npm/bun/deno) over stdin/stdout. The
//! volume never touches disk as a tree: stylesheets are inlined through the
//! asset loader, and only `@plugin`/`@config` modules are written into a
//! private temporary workspace that lives as long as the design system.
//!
//! Node-based package managers cannot import `https:` modules, so for them
//! modules are linked as files inside `node_modules/.cache/windpress` under
//! the project root, where bare package imports resolve against the
//! project's installed dependencies. Deno keeps CDN URLs and a system
//! temp workspace.

mod expand;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, LazyLock};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{Duration, timeout};
use tracing::debug;

use crate::design::{DesignSystem, LegacyBuildRequest, SourceEntry, TailwindCompiler};
use crate::error::{CompileError, ResolveError};
use crate::resolve::{AssetLoader, ModuleLinking, ResourceHint};
use expand::{Expander, quote};

/// Maximum allowed size for CLI output (50 MB)
const MAX_OUTPUT_SIZE: usize = 50 * 1024 * 1024;

/// Default timeout for CLI operations (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

static UTILITIES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@tailwind\s+utilities\s*;").expect("valid regex"));

const INLINE_MAP_MARKER: &str = "/*# sourceMappingURL=";
const INLINE_MAP_PREFIX: &str = "data:application/json;base64,";

/// Workspace parent for Node-linked modules, relative to the project root.
const NODE_WORKSPACE_DIR: &str = "node_modules/.cache/windpress";

/// Supported package managers for running Tailwind CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Pnpm,
    Npm,
    Bun,
    Deno,
}

impl PackageManager {
    /// Detect package manager from package.json and lockfiles
    ///
    /// Priority: packageManager field > lockfiles > default to npm
    pub fn detect(project_root: &Path) -> Option<Self> {
        let package_json_path = project_root.join("package.json");

        if let Ok(content) = std::fs::read_to_string(&package_json_path) {
            if let Some(pm) = serde_json::from_str::<serde_json::Value>(&content)
                .ok()
                .and_then(|v| v.get("packageManager")?.as_str().and_then(Self::from_name))
            {
                return Some(pm);
            }
        }

        let lockfiles = [
            ("pnpm-lock.yaml", Self::Pnpm),
            ("bun.lockb", Self::Bun),
            ("bun.lock", Self::Bun),
            ("deno.lock", Self::Deno),
            ("package-lock.json", Self::Npm),
        ];
        for (file, pm) in lockfiles {
            if project_root.join(file).exists() {
                return Some(pm);
            }
        }

        package_json_path.exists().then_some(Self::Npm)
    }

    /// Parse a name or a Corepack spec such as `pnpm@9.0.0`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.split('@').next().unwrap_or(name);
        match name {
            "pnpm" => Some(Self::Pnpm),
            "npm" => Some(Self::Npm),
            "bun" => Some(Self::Bun),
            "deno" => Some(Self::Deno),
            _ => None,
        }
    }

    /// Command running the project's Tailwind v4 CLI
    fn build_command(&self) -> Vec<&'static str> {
        match self {
            Self::Pnpm => vec!["pnpm", "exec", "tailwindcss"],
            Self::Npm => vec!["npx", "--no-install", "tailwindcss"],
            Self::Bun => vec!["bunx", "tailwindcss"],
            Self::Deno => vec!["deno", "run", "--allow-all", "npm:@tailwindcss/cli"],
        }
    }

    /// Command running a Tailwind v3 CLI, fetched on demand
    fn legacy_command(&self) -> Vec<&'static str> {
        match self {
            Self::Pnpm => vec!["pnpm", "dlx", "tailwindcss@3"],
            Self::Npm => vec!["npx", "--yes", "tailwindcss@3"],
            Self::Bun => vec!["bunx", "tailwindcss@3"],
            Self::Deno => vec!["deno", "run", "--allow-all", "npm:tailwindcss@3"],
        }
    }

    /// Deno imports `https:` modules natively; the others run Node's loader.
    pub fn module_linking(&self) -> ModuleLinking {
        match self {
            Self::Deno => ModuleLinking::Url,
            Self::Pnpm | Self::Npm | Self::Bun => ModuleLinking::Node,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pnpm => "pnpm",
            Self::Npm => "npm",
            Self::Bun => "bun",
            Self::Deno => "deno",
        }
    }

    /// Check if this package manager binary is available on the system
    pub async fn validate_binary(&self) -> Result<(), CompileError> {
        let binary_name = match self {
            Self::Pnpm => "pnpm",
            Self::Npm => "npx",
            Self::Bun => "bunx",
            Self::Deno => "deno",
        };

        #[cfg(unix)]
        let check_cmd = "which";
        #[cfg(windows)]
        let check_cmd = "where";

        let status = Command::new(check_cmd)
            .arg(binary_name)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(CompileError::spawn_failed)?;

        if !status.success() {
            return Err(CompileError::PackageManagerNotFound {
                package_manager: self.name().to_string(),
                binary_name: binary_name.to_string(),
            });
        }
        Ok(())
    }
}

/// Tailwind engine backed by the Tailwind CLI
#[derive(Debug, Clone)]
pub struct TailwindCli {
    package_manager: PackageManager,
    project_root: PathBuf,
    timeout_secs: u64,
}

impl TailwindCli {
    /// Create by auto-detecting the package manager in `project_root`.
    pub async fn new(project_root: PathBuf) -> Result<Self, CompileError> {
        let package_manager = PackageManager::detect(&project_root).ok_or_else(|| {
            CompileError::cli_not_found(vec![
                project_root.join("package.json"),
                project_root.join("pnpm-lock.yaml"),
                project_root.join("package-lock.json"),
            ])
        })?;
        Self::with_package_manager(package_manager, project_root).await
    }

    /// Validates that the package manager binary exists before creating.
    pub async fn with_package_manager(
        package_manager: PackageManager,
        project_root: PathBuf,
    ) -> Result<Self, CompileError> {
        package_manager.validate_binary().await?;
        Ok(Self {
            package_manager,
            project_root,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn package_manager(&self) -> PackageManager {
        self.package_manager
    }

    /// Private directory for one compilation's generated files.
    fn workspace(&self) -> Result<TempDir, CompileError> {
        let parent = match self.package_manager.module_linking() {
            ModuleLinking::Node => self.project_root.join(NODE_WORKSPACE_DIR),
            ModuleLinking::Url => std::env::temp_dir(),
        };
        std::fs::create_dir_all(&parent).map_err(|e| CompileError::workspace(&parent, e))?;
        tempfile::Builder::new()
            .prefix("windpress-")
            .tempdir_in(&parent)
            .map_err(|e| CompileError::workspace(&parent, e))
    }

    async fn run(&self, command: &[&str], args: &[String], input: Option<&str>) -> Result<String, CompileError> {
        let Some((program, rest)) = command.split_first() else {
            return Err(CompileError::Engine("empty CLI command".to_string()));
        };

        let mut cmd = Command::new(program);
        cmd.args(rest)
            .args(args)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .current_dir(&self.project_root)
            .kill_on_drop(true);

        debug!("running {} {}", command.join(" "), args.join(" "));
        let mut child = cmd.spawn().map_err(CompileError::spawn_failed)?;

        if let Some(input) = input {
            let mut stdin = child.stdin.take().ok_or_else(|| {
                CompileError::spawn_failed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "Failed to capture stdin",
                ))
            })?;
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(CompileError::spawn_failed)?;
            drop(stdin);
        }

        let output = timeout(Duration::from_secs(self.timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| CompileError::timeout(self.timeout_secs))?
            .map_err(CompileError::spawn_failed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(CompileError::cli_exit_error(output.status.code().unwrap_or(-1), stderr));
        }
        if output.stdout.len() > MAX_OUTPUT_SIZE {
            return Err(CompileError::output_too_large(output.stdout.len(), MAX_OUTPUT_SIZE));
        }

        String::from_utf8(output.stdout).map_err(|source| CompileError::ParseError { source })
    }
}

#[async_trait]
impl TailwindCompiler for TailwindCli {
    async fn compile(
        &self,
        css: &str,
        base: &str,
        loader: Arc<dyn AssetLoader>,
    ) -> Result<Box<dyn DesignSystem>, CompileError> {
        let workspace = self.workspace()?;
        let modules_dir = workspace.path().join("modules");

        let mut expander = Expander::new(loader.as_ref(), &modules_dir, self.module_linking());
        let expanded = expander.expand(css.to_string(), base.to_string(), 0).await?;
        let sources = expander.into_sources();

        // Sources are scanned by the build, never by the CLI.
        let css = UTILITIES_RE
            .replace_all(&expanded, "@tailwind utilities source(none);")
            .into_owned();

        Ok(Box::new(CliDesignSystem {
            cli: self.clone(),
            css,
            sources,
            last_map: None,
            _workspace: Arc::new(workspace),
        }))
    }

    async fn build_legacy(
        &self,
        request: LegacyBuildRequest,
        loader: Arc<dyn AssetLoader>,
    ) -> Result<String, CompileError> {
        let workspace = self.workspace()?;
        let root = workspace.path();
        let mut expander = Expander::new(loader.as_ref(), &root.join("modules"), self.module_linking());

        let mut args = Vec::new();
        match loader
            .load_module(&request.config_path, "/", ResourceHint::Config)
            .await
        {
            Ok(module) => {
                let config = expander.write_module(&module)?;
                args.push("-c".to_string());
                args.push(config.to_string_lossy().into_owned());
            }
            Err(ResolveError::ModuleNotFound { remote: false, .. }) => {
                debug!("no {} in volume, using Tailwind defaults", request.config_path);
            }
            Err(e) => return Err(e.into()),
        }

        let main_css = expander.expand(request.main_css, "/".to_string(), 0).await?;
        let input = root.join("main.css");
        write_file(&input, &main_css)?;

        let content_dir = root.join("content");
        for (index, content) in request.contents.iter().enumerate() {
            write_file(&content_dir.join(format!("{index}.html")), content)?;
        }

        args.extend([
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-o".to_string(),
            "-".to_string(),
            "--content".to_string(),
            format!("{}/*.html", content_dir.to_string_lossy()),
        ]);

        self.run(&self.package_manager.legacy_command(), &args, None).await
    }

    fn module_linking(&self) -> ModuleLinking {
        self.package_manager.module_linking()
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), CompileError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CompileError::workspace(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| CompileError::workspace(path, e))
}

/// Design system compiled by [`TailwindCli`]
struct CliDesignSystem {
    cli: TailwindCli,
    css: String,
    sources: Vec<SourceEntry>,
    last_map: Option<String>,
    _workspace: Arc<TempDir>,
}

#[async_trait]
impl DesignSystem for CliDesignSystem {
    fn sources(&self) -> &[SourceEntry] {
        &self.sources
    }

    async fn build(&mut self, candidates: &[String]) -> Result<String, CompileError> {
        let mut input = self.css.clone();
        let inline = inline_candidates(candidates);
        if !inline.is_empty() {
            input.push_str(&format!("\n@source inline({});\n", quote(&inline)));
        }

        let args = ["-i", "-", "-o", "-", "--map"].map(String::from);
        let output = self
            .cli
            .run(&self.cli.package_manager.build_command(), &args, Some(&input))
            .await?;

        let (code, map) = split_inline_map(&output);
        self.last_map = map;
        Ok(code)
    }

    fn build_source_map(&self) -> Option<String> {
        self.last_map.clone()
    }
}

/// Space-separated candidate list for `@source inline(...)`. Brace
/// expansion syntax is reserved there, so candidates containing braces
/// are left out.
fn inline_candidates(candidates: &[String]) -> String {
    candidates
        .iter()
        .filter(|c| !c.contains(['{', '}', '"', '\\']))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split CLI output into CSS and its inline source map, if any.
fn split_inline_map(output: &str) -> (String, Option<String>) {
    match output.split_once(INLINE_MAP_MARKER) {
        Some((code, comment)) => {
            let map = comment
                .trim()
                .trim_end_matches("*/")
                .trim()
                .strip_prefix(INLINE_MAP_PREFIX)
                .and_then(|encoded| STANDARD.decode(encoded).ok())
                .and_then(|bytes| String::from_utf8(bytes).ok());
            (format!("{}\n", code.trim_end()), map)
        }
        None => (output.to_string(), None),
    }
}
