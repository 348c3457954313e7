//! Single-path matching.
//!
//! A volume's host location is only trusted when its search pattern matches
//! exactly one entry. Zero or several candidates is always an error; there
//! is no tie-break.

use tracing::debug;

use crate::error::{BoxError, MatchError};
use crate::fs::Filesystem;

/// Returns the only path matching `pattern`.
///
/// # Errors
///
/// Returns [`MatchError::NoMatch`] or [`MatchError::AmbiguousMatch`] when the
/// pattern does not match exactly one path, or the filesystem's own error.
pub fn single_path_match(pattern: &str, fs: &dyn Filesystem) -> Result<String, MatchError> {
    let mut matches = fs.glob(pattern)?;

    match matches.len() {
        0 => Err(MatchError::NoMatch {
            pattern: pattern.to_string(),
        }),
        1 => {
            let path = matches.remove(0);
            debug!(path = %path, "valid volume path");
            Ok(path)
        }
        count => Err(MatchError::AmbiguousMatch {
            pattern: pattern.to_string(),
            count,
        }),
    }
}

/// Strategy for turning a search pattern into one host path.
pub trait PathMatcher: Send + Sync {
    /// Returns the single path matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns error unless exactly one path matches.
    fn match_single(&self, pattern: &str, fs: &dyn Filesystem) -> Result<String, BoxError>;
}

/// The production matcher, backed by [`single_path_match`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePathMatcher;

impl PathMatcher for SinglePathMatcher {
    fn match_single(&self, pattern: &str, fs: &dyn Filesystem) -> Result<String, BoxError> {
        single_path_match(pattern, fs).map_err(Into::into)
    }
}

/// Adapts a closure into a [`PathMatcher`].
pub struct FnPathMatcher<F>(F);

impl<F> FnPathMatcher<F>
where
    F: Fn(&str, &dyn Filesystem) -> Result<String, BoxError> + Send + Sync,
{
    /// Wraps the closure.
    #[must_use]
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> PathMatcher for FnPathMatcher<F>
where
    F: Fn(&str, &dyn Filesystem) -> Result<String, BoxError> + Send + Sync,
{
    fn match_single(&self, pattern: &str, fs: &dyn Filesystem) -> Result<String, BoxError> {
        (self.0)(pattern, fs)
    }
}
