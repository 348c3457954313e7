//! Read-only filesystem access used to locate volumes on the host.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use glob::{MatchOptions, Pattern};

use crate::error::MatchError;

/// `*` never crosses a path separator.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Drops trailing separators so a pattern names entries, not their contents.
///
/// `glob` would otherwise match the parent directory of a pattern ending in
/// `/`, which no in-memory path set can mirror.
fn strip_trailing_separator(pattern: &str) -> &str {
    let trimmed = pattern.trim_end_matches('/');
    if trimmed.is_empty() { pattern } else { trimmed }
}

/// Filesystem queries needed by the path matcher.
pub trait Filesystem: Send + Sync {
    /// Returns every existing path matching the glob pattern, sorted.
    ///
    /// Trailing separators in `pattern` are ignored.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is malformed or traversal fails.
    fn glob(&self, pattern: &str) -> Result<Vec<String>, MatchError>;
}

impl<T: Filesystem + ?Sized> Filesystem for Arc<T> {
    fn glob(&self, pattern: &str) -> Result<Vec<String>, MatchError> {
        (**self).glob(pattern)
    }
}

/// The node's real filesystem.
///
/// Patterns are absolute. A rooted filesystem resolves them below its root
/// instead of `/`, for agents that mount the pods root somewhere else.
#[derive(Debug, Clone, Default)]
pub struct OsFilesystem {
    root: Option<PathBuf>,
}

impl OsFilesystem {
    /// Creates a new handle to the host filesystem.
    #[must_use]
    pub const fn new() -> Self {
        Self { root: None }
    }

    /// Creates a handle resolving patterns below `root`.
    #[must_use]
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn full_pattern(&self, pattern: &str) -> String {
        let pattern = strip_trailing_separator(pattern);
        match &self.root {
            Some(root) => {
                let root = root.to_string_lossy();
                format!(
                    "{}/{}",
                    Pattern::escape(root.trim_end_matches('/')),
                    pattern.trim_start_matches('/')
                )
            }
            None => pattern.to_string(),
        }
    }
}

impl Filesystem for OsFilesystem {
    fn glob(&self, pattern: &str) -> Result<Vec<String>, MatchError> {
        let full = self.full_pattern(pattern);
        let entries =
            glob::glob_with(&full, MATCH_OPTIONS).map_err(|e| MatchError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.msg.to_string(),
            })?;

        let mut matches = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| MatchError::Io {
                pattern: pattern.to_string(),
                source: e.into_error(),
            })?;
            matches.push(path.to_string_lossy().into_owned());
        }
        matches.sort();
        Ok(matches)
    }
}

/// An in-memory filesystem for testing.
///
/// Holds a flat set of existing paths; parents are implied.
#[derive(Debug, Clone, Default)]
pub struct FakeFilesystem {
    paths: BTreeSet<String>,
}

impl FakeFilesystem {
    /// Creates an empty fake filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an existing path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.add_path(path);
        self
    }

    /// Adds an existing path.
    pub fn add_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        let mut parent = path.as_str();
        while let Some(idx) = parent.rfind('/') {
            parent = &parent[..idx];
            if parent.is_empty() {
                break;
            }
            self.paths.insert(parent.to_string());
        }
        self.paths.insert(path);
    }

    /// Number of known paths, implied parents included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true if no path was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Filesystem for FakeFilesystem {
    fn glob(&self, pattern: &str) -> Result<Vec<String>, MatchError> {
        let compiled =
            Pattern::new(strip_trailing_separator(pattern)).map_err(|e| {
                MatchError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.msg.to_string(),
                }
            })?;

        Ok(self
            .paths
            .iter()
            .filter(|p| compiled.matches_with(p, MATCH_OPTIONS))
            .cloned()
            .collect())
    }
}
