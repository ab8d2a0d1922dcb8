//! POSIX path helpers for virtual paths.
//!
//! Virtual paths always use `/` separators and always start with `/`,
//! regardless of the host platform.

use path_clean::PathClean;
use std::path::PathBuf;

/// Normalize a virtual path: leading `/`, no `.`/`..` segments, no trailing `/`.
pub fn normalize(path: &str) -> String {
    let rooted = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    let cleaned = PathBuf::from(rooted).clean();
    let mut out = cleaned.to_string_lossy().replace('\\', "/");
    if !out.starts_with('/') {
        out.insert(0, '/');
    }
    out
}

/// Resolve `specifier` against the directory `base`.
///
/// Absolute specifiers ignore the base.
pub fn join(base: &str, specifier: &str) -> String {
    if specifier.starts_with('/') {
        normalize(specifier)
    } else {
        normalize(&format!("{}/{}", base.trim_end_matches('/'), specifier))
    }
}

/// Directory portion of a virtual path (`/a/b.css` -> `/a`).
pub fn dirname(path: &str) -> String {
    let normalized = normalize(path);
    match normalized.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => normalized[..idx].to_string(),
    }
}

/// Final segment of a virtual path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Whether the last segment carries a file extension such as `.css` or `.js`.
///
/// Version suffixes (`daisyui@5.0.1`) are not extensions.
pub fn has_extension(path: &str) -> bool {
    let name = file_name(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => {
            name[idx + 1..].chars().all(|c| c.is_ascii_alphabetic())
        }
        _ => false,
    }
}

/// Whether a specifier is relative (`./x`, `../x`).
pub fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".."
}
