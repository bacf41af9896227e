use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;

use crate::foundation::error::{RaypoolError, RaypoolResult};

/// Immutable `name -> bytes` mapping handed to every worker at pool creation.
///
/// Cloning is cheap: payloads are reference counted and never mutated, so each worker holds its own
/// copy of the map without duplicating the bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedResourceSet {
    entries: BTreeMap<String, Arc<Vec<u8>>>,
}

impl SharedResourceSet {
    /// Empty resource set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from `(name, bytes)` pairs. Later duplicates replace earlier ones.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<u8>)>,
        K: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), Arc::new(v)))
                .collect(),
        }
    }

    /// Return a new set with `name` added (or replaced).
    pub fn with(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.entries.insert(name.into(), Arc::new(bytes));
        self
    }

    /// Borrow a payload by name.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(|b| b.as_slice())
    }

    /// Return `true` when `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Resource names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when the set has no resources.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of payload sizes in bytes.
    pub fn total_bytes(&self) -> usize {
        self.entries.values().map(|b| b.len()).sum()
    }
}

/// Source of the shared resource set, loaded once before pool creation.
pub trait SharedResourceProvider {
    /// Load every resource up front. No IO happens in workers afterwards.
    fn load(&self) -> RaypoolResult<SharedResourceSet>;
}

/// Provider with no resources.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyProvider;

impl SharedResourceProvider for EmptyProvider {
    fn load(&self) -> RaypoolResult<SharedResourceSet> {
        Ok(SharedResourceSet::new())
    }
}

/// Loads every regular file of a directory (non-recursive), keyed by file stem.
///
/// `textures/backdrop.jpeg` becomes the resource `backdrop`.
#[derive(Clone, Debug)]
pub struct DirectoryProvider {
    root: PathBuf,
}

impl DirectoryProvider {
    /// Provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory this provider reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SharedResourceProvider for DirectoryProvider {
    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    fn load(&self) -> RaypoolResult<SharedResourceSet> {
        let rd = std::fs::read_dir(&self.root)
            .with_context(|| format!("read resource dir '{}'", self.root.display()))?;

        let mut paths = Vec::new();
        for entry in rd {
            let entry = entry
                .with_context(|| format!("list resource dir '{}'", self.root.display()))?;
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut entries = BTreeMap::new();
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if entries.contains_key(stem) {
                return Err(RaypoolError::validation(format!(
                    "resource name '{stem}' is provided by more than one file in '{}'",
                    self.root.display()
                )));
            }
            let bytes = std::fs::read(&path)
                .with_context(|| format!("read resource '{}'", path.display()))?;
            entries.insert(stem.to_owned(), bytes);
        }

        let set = SharedResourceSet::from_entries(entries);
        tracing::info!(
            resources = set.len(),
            bytes = set.total_bytes(),
            "loaded shared resources"
        );
        Ok(set)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/resources.rs"]
mod tests;
