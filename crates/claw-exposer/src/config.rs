//! Exposer configuration.
//!
//! Describes how the node-agent sees the kubelet pods root and which
//! plugin directories are searched for volumes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExposerError, Result};

/// Directory the node-agent mounts the kubelet pods root at.
pub const DEFAULT_HOST_PODS_MOUNT_POINT: &str = "host_pods";

/// Plugin segment matching any volume plugin directory.
pub const ANY_PLUGIN_SEGMENT: &str = "*";

/// Namespace the node-agent daemon runs in.
pub const DEFAULT_NODE_AGENT_NAMESPACE: &str = "velero";

/// Configuration shared by the host path resolver and the path translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposerConfig {
    /// Mount-point marker: the node-agent sees the kubelet pods root at `/<marker>`.
    pub host_pods_mount_point: String,
    /// Plugin directory segment of the search pattern (`*` for any plugin).
    pub plugin_segment: String,
    /// Namespace passed to node-agent queries.
    pub node_agent_namespace: String,
}

impl Default for ExposerConfig {
    fn default() -> Self {
        Self {
            host_pods_mount_point: DEFAULT_HOST_PODS_MOUNT_POINT.to_string(),
            plugin_segment: ANY_PLUGIN_SEGMENT.to_string(),
            node_agent_namespace: DEFAULT_NODE_AGENT_NAMESPACE.to_string(),
        }
    }
}

impl ExposerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the mount-point marker.
    #[must_use]
    pub fn with_host_pods_mount_point(mut self, mount_point: impl Into<String>) -> Self {
        self.host_pods_mount_point = mount_point.into();
        self
    }

    /// Pins the plugin directory segment, e.g. `kubernetes.io~csi`.
    #[must_use]
    pub fn with_plugin_segment(mut self, segment: impl Into<String>) -> Self {
        self.plugin_segment = segment.into();
        self
    }

    /// Sets the node-agent namespace.
    #[must_use]
    pub fn with_node_agent_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.node_agent_namespace = namespace.into();
        self
    }

    /// Path of the mount point as seen inside the node-agent, e.g. `/host_pods`.
    #[must_use]
    pub fn host_pods_mount_path(&self) -> String {
        format!("/{}", self.host_pods_mount_point)
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ExposerError::Config {
            reason: format!("failed to read config file '{}': {e}", path.display()),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or fails validation.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).map_err(|e| ExposerError::Config {
            reason: format!("invalid JSON: {e}"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is empty or the marker is not a single
    /// path segment.
    pub fn validate(&self) -> Result<()> {
        if self.host_pods_mount_point.is_empty() {
            return Err(ExposerError::Config {
                reason: "host_pods_mount_point cannot be empty".to_string(),
            });
        }

        if self.host_pods_mount_point.contains(['/', '\\']) {
            return Err(ExposerError::Config {
                reason: "host_pods_mount_point must be a single path segment".to_string(),
            });
        }

        if self.plugin_segment.is_empty() || self.plugin_segment.contains(['/', '\\']) {
            return Err(ExposerError::Config {
                reason: "plugin_segment must be a single non-empty path segment".to_string(),
            });
        }

        if self.node_agent_namespace.is_empty() {
            return Err(ExposerError::Config {
                reason: "node_agent_namespace cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}
