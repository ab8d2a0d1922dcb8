use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::entry::Entry;
use crate::error::{VolumeError, VolumeResult};
use crate::path;

/// In-memory mapping of absolute virtual paths to text content.
///
/// Keys are normalized on insert, so `main.css`, `/main.css` and
/// `/css/../main.css` all address the same file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Volume {
    files: BTreeMap<String, String>,
}

impl Volume {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a volume from backend entries. Only `relative_path` and
    /// `content` are read.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Self {
        let mut volume = Self::new();
        for entry in entries {
            volume.insert(&entry.relative_path, entry.content.clone());
        }
        volume
    }

    /// Convert back into entries with the default handler.
    pub fn to_entries(&self) -> Vec<Entry> {
        self.files
            .iter()
            .map(|(path, content)| Entry::new(path.trim_start_matches('/'), content.clone()))
            .collect()
    }

    /// Insert a file, returning the previous content if any.
    pub fn insert(&mut self, path: &str, content: impl Into<String>) -> Option<String> {
        self.files.insert(path::normalize(path), content.into())
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(&path::normalize(path)).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(&path::normalize(path))
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.files.remove(&path::normalize(path))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Return a copy of this volume with `defaults` added wherever the
    /// volume has no file of its own at that path.
    pub fn with_fallbacks<'a>(&self, defaults: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut copy = self.clone();
        for (path, content) in defaults {
            let key = path::normalize(path);
            copy.files.entry(key).or_insert_with(|| content.to_string());
        }
        copy
    }

    /// Load every UTF-8 file under `root`.
    ///
    /// Hidden files and `node_modules` directories are skipped.
    pub fn from_dir(root: &Path) -> VolumeResult<Self> {
        let mut volume = Self::new();

        let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            e.depth() == 0 || !(name.starts_with('.') || name == "node_modules")
        });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                VolumeError::io(path, std::io::Error::other(e.to_string()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|_| VolumeError::InvalidPath(entry.path().display().to_string()))?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let bytes = std::fs::read(entry.path()).map_err(|e| VolumeError::io(entry.path(), e))?;
            match String::from_utf8(bytes) {
                Ok(content) => {
                    volume.insert(&key, content);
                }
                Err(_) => debug!("skipping non UTF-8 file {}", entry.path().display()),
            }
        }

        Ok(volume)
    }

    /// Write every file below `root`, creating directories as needed.
    /// Returns the number of files written.
    pub fn write_to(&self, root: &Path) -> VolumeResult<usize> {
        for (virtual_path, content) in &self.files {
            let relative = virtual_path.trim_start_matches('/');
            if relative.is_empty() || relative.split('/').any(|seg| seg == "..") {
                return Err(VolumeError::InvalidPath(virtual_path.clone()));
            }

            let target = root.join(relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| VolumeError::io(parent, e))?;
            }
            std::fs::write(&target, content).map_err(|e| VolumeError::io(&target, e))?;
        }
        Ok(self.files.len())
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Volume {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut volume = Volume::new();
        for (k, v) in iter {
            volume.insert(k.as_ref(), v);
        }
        volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_insert_normalizes_paths() {
        let mut volume = Volume::new();
        volume.insert("css/../main.css", "a");
        assert_eq!(volume.get("/main.css"), Some("a"));
        assert!(volume.contains("main.css"));
        assert_eq!(volume.len(), 1);
    }

    #[test]
    fn test_with_fallbacks_keeps_user_files_and_source_untouched() {
        let mut volume = Volume::new();
        volume.insert("/node_modules/tailwindcss/index.css", "user");

        let merged = volume.with_fallbacks([
            ("/node_modules/tailwindcss/index.css", "builtin"),
            ("/node_modules/tailwindcss/utilities.css", "@tailwind utilities;"),
        ]);

        assert_eq!(merged.get("/node_modules/tailwindcss/index.css"), Some("user"));
        assert!(merged.contains("/node_modules/tailwindcss/utilities.css"));
        assert_eq!(volume.len(), 1);
    }

    #[test]
    fn test_from_entries_reads_path_and_content() {
        let entries = vec![Entry::new("main.css", "@import \"tailwindcss\";")];
        let volume = Volume::from_entries(&entries);
        assert_eq!(volume.get("/main.css"), Some("@import \"tailwindcss\";"));
    }

    #[test]
    fn test_dir_round_trip() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("css")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/x")).unwrap();
        std::fs::write(dir.path().join("main.css"), "@import './css/a.css';").unwrap();
        std::fs::write(dir.path().join("css/a.css"), ".a{}").unwrap();
        std::fs::write(dir.path().join("node_modules/x/index.css"), "ignored").unwrap();
        std::fs::write(dir.path().join(".env"), "ignored").unwrap();

        let volume = Volume::from_dir(dir.path()).unwrap();
        assert_eq!(volume.paths().collect::<Vec<_>>(), vec!["/css/a.css", "/main.css"]);

        let out = TempDir::new().unwrap();
        assert_eq!(volume.write_to(out.path()).unwrap(), 2);
        assert_eq!(std::fs::read_to_string(out.path().join("css/a.css")).unwrap(), ".a{}");
    }
}
