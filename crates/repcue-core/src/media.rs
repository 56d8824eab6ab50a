//! Step media lookup.
//!
//! The player never loads media itself; hosts use a [`MediaStore`] to preload
//! whatever the current step shows.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

/// Prefix used by media paths written by the browser build.
const OPFS_PREFIX: &str = "opfs://";

pub trait MediaStore {
    /// Raw bytes behind `path`, `None` when it does not resolve.
    fn load(&self, path: &str) -> Option<Vec<u8>>;
}

/// Media files stored below a root directory.
#[derive(Debug, Clone)]
pub struct DirMediaStore {
    root: PathBuf,
}

impl DirMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored media path to a file below the root.
    ///
    /// Absolute paths and parent-directory components never resolve.
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.strip_prefix(OPFS_PREFIX).unwrap_or(path));
        let clean = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !clean || path.is_empty() {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl MediaStore for DirMediaStore {
    fn load(&self, path: &str) -> Option<Vec<u8>> {
        let file = self.resolve(path)?;
        match std::fs::read(&file) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!(path, error = %e, "media not available");
                None
            }
        }
    }
}
