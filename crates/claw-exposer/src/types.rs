//! Core types for host path resolution.
//!
//! - [`PodRef`]: the workload pod a volume is mounted into
//! - [`VolumeMode`]: filesystem or raw block presentation
//! - [`NodeOs`]: operating system of the node, selecting path separators
//! - [`AccessPoint`]: a resolved host path together with its mode
//! - [`SearchPattern`]: the glob used to locate a volume under the pods root

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ExposerConfig;

/// Identity of the pod a volume belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PodRef {
    /// Pod namespace.
    pub namespace: String,
    /// Pod name.
    pub name: String,
    /// Pod UID, which names the pod's directory under the kubelet root.
    pub uid: String,
}

impl PodRef {
    /// Creates a new pod reference.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        uid: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            uid: uid.into(),
        }
    }

    /// Returns `namespace/name`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for PodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// How a persistent volume is presented to the pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VolumeMode {
    /// Mounted filesystem tree. Also the meaning of an unset mode.
    #[default]
    Filesystem,
    /// Raw block device file.
    Block,
}

impl VolumeMode {
    /// Directory under the pod root that holds volumes of this mode.
    #[must_use]
    pub const fn volume_subdir(&self) -> &'static str {
        match self {
            Self::Filesystem => "volumes",
            Self::Block => "volumeDevices",
        }
    }

    /// Returns true for block volumes.
    #[must_use]
    pub const fn is_block(&self) -> bool {
        matches!(self, Self::Block)
    }
}

impl fmt::Display for VolumeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filesystem => write!(f, "Filesystem"),
            Self::Block => write!(f, "Block"),
        }
    }
}

/// Operating system of a node.
///
/// Unrecognized values are kept verbatim and leave separators untouched, so
/// a new node OS never breaks translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeOs {
    /// Linux node.
    #[default]
    Linux,
    /// Windows node.
    Windows,
    /// Any other value reported for the node.
    Other(String),
}

impl NodeOs {
    /// Separator every path on this node is rendered with, if known.
    #[must_use]
    pub const fn separator(&self) -> Option<char> {
        match self {
            Self::Linux => Some('/'),
            Self::Windows => Some('\\'),
            Self::Other(_) => None,
        }
    }

    /// Returns the OS name as reported by the node label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Other(other) => other,
        }
    }
}

impl From<&str> for NodeOs {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("linux") {
            Self::Linux
        } else if value.eq_ignore_ascii_case("windows") {
            Self::Windows
        } else {
            Self::Other(value.to_string())
        }
    }
}

impl From<String> for NodeOs {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<NodeOs> for String {
    fn from(value: NodeOs) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for NodeOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A volume's location on the host, ready for the data mover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPoint {
    /// Host path of the mounted directory or block device file.
    pub by_path: String,
    /// How the volume is presented.
    pub vol_mode: VolumeMode,
}

/// Glob locating one volume under the node-agent's view of the pods root.
///
/// Layout: `/<mount-point>/<pod-uid>/<volumes|volumeDevices>/<plugin>/<token>*`.
///
/// The token is a name root. An empty token matches every entry one level
/// below the plugin directory, never the plugin directory itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchPattern(String);

impl SearchPattern {
    /// Builds the pattern for a volume of the given mode.
    #[must_use]
    pub fn for_volume(config: &ExposerConfig, pod_uid: &str, mode: VolumeMode, token: &str) -> Self {
        Self(format!(
            "/{}/{}/{}/{}/{}*",
            config.host_pods_mount_point,
            pod_uid,
            mode.volume_subdir(),
            config.plugin_segment,
            token
        ))
    }

    /// Returns the glob expression.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
