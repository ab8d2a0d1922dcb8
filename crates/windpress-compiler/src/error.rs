//! Error types for resolution, compilation and optimization

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

fn location(remote: &bool) -> &'static str {
    if *remote { "remote" } else { "local" }
}

/// Network failures while loading CDN or URL resources.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum FetchError {
    #[error("invalid URL '{url}': {reason}")]
    #[diagnostic(code(windpress::fetch::invalid_url))]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {message}")]
    #[diagnostic(
        code(windpress::fetch::transport),
        help("Check your network connection and that the CDN is reachable")
    )]
    Transport { url: String, message: String },

    #[error("{url} responded with HTTP {status}")]
    #[diagnostic(code(windpress::fetch::status))]
    Status { url: String, status: u16 },
}

impl FetchError {
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failures resolving `@import`, `@plugin`, `@config` or JS specifiers.
#[derive(Error, Debug, Diagnostic)]
pub enum ResolveError {
    #[error("Cannot find stylesheet '{id}' from '{base}' ({}): {reason}", location(.remote))]
    #[diagnostic(
        code(windpress::resolve::stylesheet_not_found),
        help("Check the path in your @import, or that the package exists on the CDN")
    )]
    StylesheetNotFound {
        id: String,
        base: String,
        remote: bool,
        reason: String,
    },

    #[error("Cannot find module '{id}' from '{base}' ({}): {reason}", location(.remote))]
    #[diagnostic(
        code(windpress::resolve::module_not_found),
        help("Check the path in your @plugin/@config directive or import statement")
    )]
    ModuleNotFound {
        id: String,
        base: String,
        remote: bool,
        reason: String,
    },

    #[error("Circular module import: {chain}")]
    #[diagnostic(code(windpress::resolve::module_cycle))]
    ModuleCycle { chain: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),
}

/// Failures producing a design system or generating CSS from it.
#[derive(Error, Debug, Diagnostic)]
pub enum CompileError {
    #[error("Entrypoint '{path}' not found in volume")]
    #[diagnostic(
        code(windpress::compile::missing_entrypoint),
        help("Create {path} in the WindPress file editor")
    )]
    MissingEntrypoint { path: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Module '{id}' is only available at {url}, which Node cannot import")]
    #[diagnostic(
        code(windpress::compile::remote_module),
        help("Install the package in the project, or use deno as the package manager")
    )]
    RemoteModule { id: String, url: String },

    #[error("Stylesheet import depth exceeded at '{id}' (max {max_depth})")]
    #[diagnostic(code(windpress::compile::import_depth))]
    ImportDepth { id: String, max_depth: usize },

    /// Tailwind CLI not found (no package.json or lockfile)
    #[error("Tailwind CLI not found. Searched in: {searched_paths:?}")]
    #[diagnostic(
        code(windpress::tailwind::cli_not_found),
        help("Install Tailwind CSS: npm install -D tailwindcss @tailwindcss/cli")
    )]
    CliNotFound { searched_paths: Vec<PathBuf> },

    /// Package manager binary not found in PATH
    #[error("Package manager '{package_manager}' binary '{binary_name}' not found in PATH")]
    #[diagnostic(
        code(windpress::tailwind::package_manager_not_found),
        help("Ensure {package_manager} is installed and available in your PATH")
    )]
    PackageManagerNotFound {
        package_manager: String,
        binary_name: String,
    },

    #[error("Failed to spawn Tailwind CLI process: {source}")]
    #[diagnostic(
        code(windpress::tailwind::spawn_failed),
        help("Check that the Tailwind CLI is installed and permissions are correct")
    )]
    SpawnFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("Tailwind CLI exited with code {exit_code}")]
    #[diagnostic(code(windpress::tailwind::cli_exit_error))]
    CliExitError {
        exit_code: i32,
        #[help]
        stderr: String,
    },

    #[error("CLI output too large: {actual_bytes} bytes (max: {max_bytes} bytes)")]
    #[diagnostic(
        code(windpress::tailwind::output_too_large),
        help("Your CSS output is too large. Consider splitting your styles.")
    )]
    OutputTooLarge {
        actual_bytes: usize,
        max_bytes: usize,
    },

    #[error("Failed to parse CLI output as UTF-8: {source}")]
    #[diagnostic(code(windpress::tailwind::parse_error))]
    ParseError {
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("Tailwind CLI timed out after {timeout_secs} seconds")]
    #[diagnostic(
        code(windpress::tailwind::timeout),
        help("Try increasing the timeout or check if Tailwind is stuck")
    )]
    Timeout { timeout_secs: u64 },

    #[error("Failed to prepare compiler workspace at {}: {source}", .path.display())]
    #[diagnostic(code(windpress::compile::workspace))]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other failure reported by a compiler backend.
    #[error("Tailwind compiler error: {0}")]
    #[diagnostic(code(windpress::compile::engine))]
    Engine(String),
}

impl CompileError {
    pub fn cli_not_found(searched_paths: Vec<PathBuf>) -> Self {
        Self::CliNotFound { searched_paths }
    }

    pub fn spawn_failed(source: std::io::Error) -> Self {
        Self::SpawnFailed { source }
    }

    pub fn cli_exit_error(exit_code: i32, stderr: String) -> Self {
        Self::CliExitError { exit_code, stderr }
    }

    pub fn output_too_large(actual_bytes: usize, max_bytes: usize) -> Self {
        Self::OutputTooLarge {
            actual_bytes,
            max_bytes,
        }
    }

    pub fn timeout(timeout_secs: u64) -> Self {
        Self::Timeout { timeout_secs }
    }

    pub fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Workspace {
            path: path.into(),
            source,
        }
    }
}

/// Failures in the optimize pass. Recoverable CSS issues are warnings, not errors.
#[derive(Error, Debug, Diagnostic)]
pub enum OptimizeError {
    #[error("Failed to parse CSS in {file}: {message}")]
    #[diagnostic(code(windpress::optimize::parse))]
    Parse { file: String, message: String },

    #[error("Failed to minify CSS in {file}: {message}")]
    #[diagnostic(code(windpress::optimize::minify))]
    Minify { file: String, message: String },

    #[error("Failed to print CSS for {file}: {message}")]
    #[diagnostic(code(windpress::optimize::print))]
    Print { file: String, message: String },

    #[error("Source map error: {0}")]
    #[diagnostic(code(windpress::optimize::sourcemap))]
    SourceMap(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum CandidateError {
    #[error("Candidate extractor used before init()")]
    #[diagnostic(
        code(windpress::candidates::uninitialized),
        help("Call CandidateExtractor::init() once before extracting candidates")
    )]
    Uninitialized,
}
