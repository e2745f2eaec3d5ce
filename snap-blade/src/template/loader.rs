//! Template source loading
//!
//! Dotted template names map to files under one or more search roots.
//! Roots are searched in order and the first match wins, so a child theme
//! listed before its parent overrides individual templates.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{BladeError, Result};

/// Source of template text
pub trait TemplateLoader: Send + Sync {
    /// Source of template `name`, or `None` if this loader does not have it
    ///
    /// # Errors
    ///
    /// Returns [`BladeError::Io`] if the template exists but cannot be read.
    fn load(&self, name: &str) -> Result<Option<String>>;

    /// Dotted names of every template this loader can provide
    ///
    /// # Errors
    ///
    /// Returns [`BladeError::Io`] if a search root cannot be listed.
    fn list(&self) -> Result<Vec<String>>;
}

/// Loads templates from ordered directories on disk
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    roots: Vec<PathBuf>,
    extension: String,
}

impl FileSystemLoader {
    /// Create a loader over `roots` for files ending in `extension`
    pub fn new<I, P>(roots: I, extension: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            extension: extension.into(),
        }
    }

    /// Search roots in lookup order
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Path template `name` would have under `root`
    #[must_use]
    pub fn path_for(&self, root: &Path, name: &str) -> PathBuf {
        let mut path = root.to_path_buf();
        let segments: Vec<&str> = name.split('.').collect();
        if let Some((last, dirs)) = segments.split_last() {
            for dir in dirs {
                path.push(dir);
            }
            path.push(format!("{last}{}", self.extension));
        }
        path
    }

    /// File backing template `name`, if any root has it
    #[must_use]
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| self.path_for(root, name))
            .find(|path| path.is_file())
    }

    fn name_for(&self, root: &Path, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(root).ok()?.to_str()?;
        let stem = relative.strip_suffix(self.extension.as_str())?;
        Some(stem.replace(['/', '\\'], "."))
    }
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, name: &str) -> Result<Option<String>> {
        let Some(path) = self.locate(name) else {
            return Ok(None);
        };
        tracing::trace!(template = name, path = %path.display(), "loading template");
        std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| BladeError::Io {
                name: name.to_string(),
                source,
            })
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for root in self.roots.iter().filter(|root| root.is_dir()) {
            for entry in WalkDir::new(root).follow_links(true) {
                let entry = entry.map_err(|e| BladeError::Io {
                    name: root.display().to_string(),
                    source: e.into(),
                })?;
                if entry.file_type().is_file() {
                    if let Some(name) = self.name_for(root, entry.path()) {
                        names.insert(name);
                    }
                }
            }
        }
        Ok(names.into_iter().collect())
    }
}

/// Holds template sources in memory
#[derive(Debug, Default)]
pub struct MemoryLoader {
    templates: RwLock<HashMap<String, String>>,
}

impl MemoryLoader {
    /// Create an empty loader
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a template
    #[must_use]
    pub fn with(self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    /// Add or replace a template in place
    pub fn insert(&self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.write().insert(name.into(), source.into());
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryLoader
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let loader = Self::new();
        for (name, source) in iter {
            loader.insert(name, source);
        }
        loader
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&self, name: &str) -> Result<Option<String>> {
        Ok(self.templates.read().get(name).cloned())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.templates.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
