//! Error types for host path resolution.

use thiserror::Error;

/// Opaque failure returned by an injected collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for exposer operations.
pub type Result<T> = std::result::Result<T, ExposerError>;

/// Errors surfaced by the host path resolver and the path translator.
///
/// Every variant names the operation and the identifying context so the
/// message is self-explanatory without inspecting the wrapped cause.
#[derive(Debug, Error)]
pub enum ExposerError {
    /// The on-host directory backing the volume could not be determined.
    #[error("error getting volume directory name for volume {volume} in pod {pod}: {source}")]
    VolumeDirectory {
        /// The claim or pod volume name.
        volume: String,
        /// The pod name.
        pod: String,
        /// The collaborator failure.
        #[source]
        source: BoxError,
    },

    /// The storage mode of the volume could not be determined.
    #[error("error getting volume mode for volume {volume} in pod {pod}: {source}")]
    VolumeMode {
        /// The claim or pod volume name.
        volume: String,
        /// The pod name.
        pod: String,
        /// The collaborator failure.
        #[source]
        source: BoxError,
    },

    /// The search pattern did not match exactly one host path.
    #[error("error identifying unique volume path on host for volume {volume} in pod {pod}: {source}")]
    PathMatch {
        /// The claim or pod volume name.
        volume: String,
        /// The pod name.
        pod: String,
        /// The matcher failure, usually a [`MatchError`].
        #[source]
        source: BoxError,
    },

    /// The node-agent could not report its kubelet pods root.
    #[error("error getting host pod path from node-agent: {source}")]
    NodeAgentQuery {
        /// The collaborator failure.
        #[source]
        source: BoxError,
    },

    /// The path to translate does not contain the mount-point marker.
    #[error("path {path} is not under the node-agent mount point {mount_point}")]
    MountPointNotFound {
        /// The path that was being translated.
        path: String,
        /// The marker segment that was expected.
        mount_point: String,
    },

    /// The caller cancelled the operation before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    Config {
        /// Why the configuration was rejected.
        reason: String,
    },
}

impl ExposerError {
    /// Returns true if the caller gave up, as opposed to the volume not
    /// being resolvable.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the structured matcher failure behind a [`ExposerError::PathMatch`].
    ///
    /// `None` for other variants, or when an injected matcher failed with
    /// its own error type.
    #[must_use]
    pub fn match_error(&self) -> Option<&MatchError> {
        match self {
            Self::PathMatch { source, .. } => source.downcast_ref::<MatchError>(),
            _ => None,
        }
    }
}

/// Failures of the single-path matcher.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Nothing on the host matched the pattern.
    #[error("expected one matching path: {pattern}, got 0")]
    NoMatch {
        /// The pattern that was searched.
        pattern: String,
    },

    /// More than one host path matched the pattern.
    #[error("expected one matching path: {pattern}, got {count}")]
    AmbiguousMatch {
        /// The pattern that was searched.
        pattern: String,
        /// Number of candidates found.
        count: usize,
    },

    /// The pattern is not a valid glob expression.
    #[error("invalid path pattern {pattern}: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Parser message.
        reason: String,
    },

    /// Filesystem traversal failed.
    #[error("failed to search {pattern}: {source}")]
    Io {
        /// The pattern being searched.
        pattern: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl MatchError {
    /// Number of candidates the search produced, when it got that far.
    #[must_use]
    pub const fn candidate_count(&self) -> Option<usize> {
        match self {
            Self::NoMatch { .. } => Some(0),
            Self::AmbiguousMatch { count, .. } => Some(*count),
            Self::InvalidPattern { .. } | Self::Io { .. } => None,
        }
    }

    /// The pattern that was being searched.
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::NoMatch { pattern }
            | Self::AmbiguousMatch { pattern, .. }
            | Self::InvalidPattern { pattern, .. }
            | Self::Io { pattern, .. } => pattern,
        }
    }
}
