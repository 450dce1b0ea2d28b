//! File-system loader for include templates.
//!
//! Every file under the includes root is an include, named by its path
//! relative to the root with `/` separators (`partials/nav.html`). The loader
//! keeps two maps: `paths_to_names` (absolute path to logical name) and its own
//! source `cache` (logical name to template source). Evicted names are read
//! from disk again on the next [`FileSystemLoader::load_all`].

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Include loader rooted at a single directory.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    root: PathBuf,
    paths_to_names: HashMap<PathBuf, String>,
    cache: HashMap<String, String>,
}

impl FileSystemLoader {
    /// Create a loader. Nothing is read until [`scan`](Self::scan) or
    /// [`load_all`](Self::load_all).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            paths_to_names: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path to logical name index.
    pub fn paths_to_names(&self) -> &HashMap<PathBuf, String> {
        &self.paths_to_names
    }

    /// Logical name of an include, if `path` is a known include file.
    pub fn name_for(&self, path: &Path) -> Option<&str> {
        self.paths_to_names.get(path).map(String::as_str)
    }

    /// Whether `path` lies under the includes root.
    pub fn covers(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Drop a cached include source. Returns whether it was cached.
    pub fn evict(&mut self, name: &str) -> bool {
        let evicted = self.cache.remove(name).is_some();
        if evicted {
            tracing::debug!(name, "Evicted include from loader cache");
        }
        evicted
    }

    /// Rebuild the path index from disk.
    ///
    /// A missing root yields an empty index. Cache entries for includes that
    /// no longer exist are dropped.
    pub fn scan(&mut self) -> Result<(), LoaderError> {
        let mut index = HashMap::new();

        if self.root.is_dir() {
            let walker = WalkDir::new(&self.root)
                .sort_by_file_name()
                .follow_links(true)
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

            for entry in walker {
                let entry = entry.map_err(|source| LoaderError::Walk {
                    root: self.root.clone(),
                    source,
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.into_path();
                if let Some(name) = logical_name(&self.root, &path) {
                    index.insert(path, name);
                }
            }
        }

        self.cache
            .retain(|name, _| index.values().any(|known| known == name));
        self.paths_to_names = index;
        Ok(())
    }

    /// Rescan the root and return every include as `(name, source)`, sorted by
    /// name. Cached sources are reused; anything else is read from disk.
    ///
    /// Files that are not valid UTF-8 are skipped with a warning and left out
    /// of the index.
    pub fn load_all(&mut self) -> Result<Vec<(String, String)>, LoaderError> {
        self.scan()?;

        let mut known: Vec<(PathBuf, String)> = self
            .paths_to_names
            .iter()
            .map(|(path, name)| (path.clone(), name.clone()))
            .collect();
        known.sort_by(|a, b| a.1.cmp(&b.1));

        let mut sources = Vec::with_capacity(known.len());
        for (path, name) in known {
            if let Some(source) = self.cache.get(&name) {
                sources.push((name, source.clone()));
                continue;
            }

            match std::fs::read_to_string(&path) {
                Ok(source) => {
                    tracing::trace!(?path, name = %name, "Loaded include");
                    self.cache.insert(name.clone(), source.clone());
                    sources.push((name, source));
                }
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    tracing::warn!(?path, "Skipping include that is not valid UTF-8");
                    self.paths_to_names.remove(&path);
                }
                Err(source) => return Err(LoaderError::Io { path, source }),
            }
        }

        Ok(sources)
    }
}

fn is_hidden(file_name: &std::ffi::OsStr) -> bool {
    file_name.to_str().is_some_and(|s| s.starts_with('.'))
}

fn logical_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("failed to read include {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to walk includes directory {root}: {source}")]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },
    #[error("failed to parse includes from {root}: {source}")]
    Parse {
        root: PathBuf,
        source: tera::Error,
    },
}
