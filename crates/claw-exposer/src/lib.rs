//! Host path resolution for pod volumes exposed to the node agent.
//!
//! `claw-exposer` answers, from inside the privileged node agent, where the
//! bytes of a claim mounted into a workload pod actually live on the node,
//! so a data mover can read or write them without entering the pod.
//!
//! # Features
//!
//! - **Host path resolution**: [`HostPathResolver`] turns (pod, claim) into
//!   exactly one host directory or block device file
//! - **Path translation**: [`PathTranslator`] rewrites a path under the
//!   node agent's mount point against a node's real kubelet root
//! - **Strict matching**: zero or several candidates is always an error,
//!   never a silent pick
//! - **Cancellation**: every collaborator call races the caller's
//!   [`CancellationToken`](tokio_util::sync::CancellationToken)
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use claw_exposer::{
//!     ExposerConfig, FakeFilesystem, FakeVolumeLookup, HostPathResolver, PodRef,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> claw_exposer::Result<()> {
//! let lookup = Arc::new(FakeVolumeLookup::new("pvc-1234/mount"));
//! let fs = FakeFilesystem::new()
//!     .with_path("/host_pods/uid-1/volumes/kubernetes.io~csi/pvc-1234/mount");
//!
//! let resolver = HostPathResolver::new(
//!     ExposerConfig::default(),
//!     lookup.clone(),
//!     lookup,
//!     Arc::new(fs),
//! );
//!
//! let pod = PodRef::new("app", "web-0", "uid-1");
//! let access = resolver
//!     .get_pod_volume_host_path(&CancellationToken::new(), &pod, "data")
//!     .await?;
//! assert_eq!(
//!     access.by_path,
//!     "/host_pods/uid-1/volumes/kubernetes.io~csi/pvc-1234/mount"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Host layout
//!
//! ```text
//! /<mount-point>/<pod-uid>/volumes/<plugin>/<volume-dir>        filesystem
//! /<mount-point>/<pod-uid>/volumeDevices/<plugin>/<volume-dir>  block
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![cfg_attr(test, allow(clippy::expect_used))]

mod cancel;
pub mod config;
pub mod error;
pub mod fs;
pub mod host_path;
pub mod lookup;
pub mod matcher;
pub mod translate;
pub mod types;

// Re-export main types
pub use config::ExposerConfig;
pub use error::{BoxError, ExposerError, MatchError, Result};
pub use fs::{FakeFilesystem, Filesystem, OsFilesystem};
pub use host_path::HostPathResolver;
pub use lookup::{
    BoxFuture, FakeNodeAgent, FakeResponse, FakeVolumeLookup, NodeAgentPathClient,
    VolumeDirectoryResolver, VolumeModeResolver,
};
pub use matcher::{single_path_match, FnPathMatcher, PathMatcher, SinglePathMatcher};
pub use translate::{normalize_separators, rewrite_host_path, PathTranslator};
pub use types::{AccessPoint, NodeOs, PodRef, SearchPattern, VolumeMode};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::ExposerConfig;
    pub use crate::error::{BoxError, ExposerError, MatchError, Result};
    pub use crate::fs::{Filesystem, OsFilesystem};
    pub use crate::host_path::HostPathResolver;
    pub use crate::lookup::{NodeAgentPathClient, VolumeDirectoryResolver, VolumeModeResolver};
    pub use crate::matcher::{PathMatcher, SinglePathMatcher};
    pub use crate::translate::PathTranslator;
    pub use crate::types::{AccessPoint, NodeOs, PodRef, VolumeMode};
}
