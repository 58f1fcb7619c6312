//! The configured set of browsable root directories

use std::path::{Component, Path, PathBuf};

/// Ordered, immutable list of root directories
///
/// Built once at startup and shared through [`crate::ServerState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSet {
    roots: Vec<PathBuf>,
}

impl RootSet {
    /// Create a root set from configured paths, keeping their order
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// Iterate over the roots in configured order
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Whether `path` is exactly one of the roots
    pub fn is_root(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| root == path)
    }

    /// Whether `path` lies lexically inside one of the roots
    ///
    /// Paths containing `..` are never confined, since they can climb out of
    /// a root without the prefix check noticing.
    pub fn confines(&self, path: &Path) -> bool {
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return false;
        }
        self.roots.iter().any(|root| path.starts_with(root))
    }
}
