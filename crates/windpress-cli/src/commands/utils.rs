//! Helpers shared by the commands.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use windpress_compiler::{PackageManager, TailwindCli};

use crate::config::WindpressConfig;
use crate::error::{CliError, ConfigError, Result, ResultExt};

/// Tailwind engine for the configured project root and package manager.
pub(crate) async fn tailwind_cli(config: &WindpressConfig) -> Result<TailwindCli> {
    let cli = match config.package_manager.as_deref() {
        Some(name) => {
            let package_manager = PackageManager::from_name(name).ok_or_else(|| ConfigError::InvalidValue {
                field: "packageManager".to_string(),
                value: name.to_string(),
                hint: "Use one of npm, pnpm, bun or deno".to_string(),
            })?;
            TailwindCli::with_package_manager(package_manager, config.project_root.clone()).await?
        }
        None => TailwindCli::new(config.project_root.clone()).await?,
    };
    debug!("using {} for the Tailwind CLI", cli.package_manager().name());
    Ok(cli.with_timeout(config.timeout_secs))
}

/// Compile `patterns` into one matcher. Paths are matched relative to the
/// walk root with `/` separators.
pub(crate) fn content_matcher(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern.trim_start_matches("./"))
            .map_err(|e| CliError::InvalidArgument(format!("invalid --content glob '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| CliError::InvalidArgument(format!("invalid --content globs: {e}")))
}

/// Files below `root` matching `matcher`, sorted. Hidden entries and
/// `node_modules` are skipped.
pub(crate) fn find_content_files(root: &Path, matcher: &GlobSet) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|e| {
        let name = e.file_name().to_string_lossy();
        e.depth() == 0 || !(name.starts_with('.') || name == "node_modules")
    });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| CliError::Io(std::io::Error::other(e.to_string())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if matcher.is_match(&relative) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Write `content`, creating the parent directory.
pub(crate) fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_path(parent)?;
    }
    fs::write(path, content).with_path(path)?;
    Ok(())
}

/// `out.css` -> `out.css.map`
pub(crate) fn map_path(out: &Path) -> PathBuf {
    let mut name = out.as_os_str().to_os_string();
    name.push(".map");
    PathBuf::from(name)
}

/// Write the stylesheet and, when given, its source map next to it with a
/// `sourceMappingURL` comment pointing at the map.
pub(crate) fn write_stylesheet(out: &Path, css: &str, map: Option<&str>) -> Result<()> {
    match map {
        Some(map) => {
            let map_file = map_path(out);
            let map_name = map_file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            write_file(out, &format!("{css}\n/*# sourceMappingURL={map_name} */\n"))?;
            write_file(&map_file, map)
        }
        None => write_file(out, css),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_content_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("templates/parts")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("templates/index.html"), "<div class=\"flex\"></div>").unwrap();
        fs::write(root.join("templates/parts/header.html"), "").unwrap();
        fs::write(root.join("templates/notes.txt"), "").unwrap();
        fs::write(root.join("node_modules/pkg/index.html"), "").unwrap();

        let matcher = content_matcher(&["./**/*.html".to_string()]).unwrap();
        let files = find_content_files(root, &matcher).unwrap();

        assert_eq!(
            files,
            vec![
                root.join("templates/index.html"),
                root.join("templates/parts/header.html"),
            ]
        );
    }

    #[test]
    fn test_invalid_glob() {
        let err = content_matcher(&["templates/[".to_string()]).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }

    #[test]
    fn test_write_stylesheet_with_map() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dist/windpress.css");

        write_stylesheet(&out, ".flex{display:flex}", Some("{\"version\":3}")).unwrap();

        let css = fs::read_to_string(&out).unwrap();
        assert!(css.ends_with("/*# sourceMappingURL=windpress.css.map */\n"));
        assert_eq!(
            fs::read_to_string(dir.path().join("dist/windpress.css.map")).unwrap(),
            "{\"version\":3}"
        );
    }
}
