//! Translation of node-agent paths into real host paths.
//!
//! The node-agent sees the kubelet pods root at `/<mount-point>`. A path
//! under that mount point is rewritten against a node's real kubelet root,
//! as reported by that node's agent, and rendered with the node's separator.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::cancel::run_cancellable;
use crate::config::ExposerConfig;
use crate::error::{ExposerError, Result};
use crate::lookup::NodeAgentPathClient;
use crate::types::NodeOs;

const SEPARATORS: [char; 2] = ['/', '\\'];

/// Rewrites `raw_path` so the part up to and including the `mount_point`
/// segment becomes `host_prefix`, then renders every separator of the
/// result for `os`.
///
/// The marker only counts as a whole path component preceded by a
/// separator. Returns `None` if `raw_path` has no such component.
#[must_use]
pub fn rewrite_host_path(
    raw_path: &str,
    host_prefix: &str,
    mount_point: &str,
    os: &NodeOs,
) -> Option<String> {
    let marker_end = find_marker_end(raw_path, mount_point)?;
    let prefix = host_prefix.trim_end_matches(SEPARATORS);
    let joined = format!("{prefix}{}", &raw_path[marker_end..]);
    Some(normalize_separators(&joined, os))
}

/// Renders every separator in `path` with the separator of `os`.
///
/// Unrecognized operating systems get the path back unchanged.
#[must_use]
pub fn normalize_separators(path: &str, os: &NodeOs) -> String {
    match os.separator() {
        Some(sep) => path.replace(SEPARATORS, &sep.to_string()),
        None => path.to_string(),
    }
}

fn find_marker_end(path: &str, mount_point: &str) -> Option<usize> {
    if mount_point.is_empty() {
        return None;
    }

    let bytes = path.as_bytes();
    path.match_indices(mount_point).find_map(|(start, _)| {
        let end = start + mount_point.len();
        let after_ok = end == bytes.len() || matches!(bytes[end], b'/' | b'\\');
        let before_ok = start > 0 && matches!(bytes[start - 1], b'/' | b'\\');
        (before_ok && after_ok).then_some(end)
    })
}

/// Rewrites node-agent paths against a node's real kubelet root.
#[derive(Clone)]
pub struct PathTranslator {
    config: ExposerConfig,
    node_agent: Arc<dyn NodeAgentPathClient>,
}

impl PathTranslator {
    /// Creates a translator querying `node_agent` for host prefixes.
    #[must_use]
    pub fn new(config: ExposerConfig, node_agent: Arc<dyn NodeAgentPathClient>) -> Self {
        Self { config, node_agent }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ExposerConfig {
        &self.config
    }

    /// Translates `raw_path`, expressed under the node-agent mount point,
    /// into the real host path on `node_name`.
    ///
    /// The host prefix is fetched from the node-agent on every call.
    ///
    /// # Errors
    ///
    /// - [`ExposerError::NodeAgentQuery`] if the node-agent query fails
    /// - [`ExposerError::MountPointNotFound`] if `raw_path` is not under the mount point
    /// - [`ExposerError::Cancelled`] if `cancel` fires first
    #[instrument(skip_all, fields(node = %node_name, os = %os))]
    pub async fn extract_pod_volume_host_path(
        &self,
        cancel: &CancellationToken,
        raw_path: &str,
        node_name: &str,
        os: &NodeOs,
    ) -> Result<String> {
        let namespace = self.config.node_agent_namespace.as_str();
        let host_prefix = run_cancellable(
            cancel,
            self.node_agent.host_pod_path(cancel, node_name, namespace),
        )
        .await?
        .map_err(|source| {
            warn!(namespace, error = %source, "node-agent host pod path query failed");
            ExposerError::NodeAgentQuery { source }
        })?;

        let mount_point = self.config.host_pods_mount_point.as_str();
        let path = rewrite_host_path(raw_path, &host_prefix, mount_point, os).ok_or_else(|| {
            ExposerError::MountPointNotFound {
                path: raw_path.to_string(),
                mount_point: mount_point.to_string(),
            }
        })?;

        debug!(raw_path, host_path = %path, "translated pod volume path");
        Ok(path)
    }
}

impl std::fmt::Debug for PathTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathTranslator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
