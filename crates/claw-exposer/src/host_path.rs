//! Host path resolution for pod volumes.
//!
//! The [`HostPathResolver`] answers one question: where on this node does
//! the data of a given volume in a given pod live? It:
//! - Asks the directory resolver for the plugin-assigned volume directory
//! - Asks the mode resolver whether the volume is a filesystem or a block device
//! - Searches the pod's `volumes` or `volumeDevices` tree for exactly one match
//!
//! Steps run strictly in that order and the first failure short-circuits the
//! rest. Nothing is retried here.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cancel::{ensure_active, run_cancellable};
use crate::config::ExposerConfig;
use crate::error::{ExposerError, Result};
use crate::fs::Filesystem;
use crate::lookup::{VolumeDirectoryResolver, VolumeModeResolver};
use crate::matcher::{PathMatcher, SinglePathMatcher};
use crate::types::{AccessPoint, PodRef, SearchPattern};

/// Resolves the host path backing a volume mounted into a pod.
///
/// Holds only shared, immutable collaborators; one resolver can serve
/// concurrent calls for unrelated volumes.
#[derive(Clone)]
pub struct HostPathResolver {
    config: ExposerConfig,
    directories: Arc<dyn VolumeDirectoryResolver>,
    modes: Arc<dyn VolumeModeResolver>,
    matcher: Arc<dyn PathMatcher>,
    fs: Arc<dyn Filesystem>,
}

impl HostPathResolver {
    /// Creates a resolver with the production single-path matcher.
    #[must_use]
    pub fn new(
        config: ExposerConfig,
        directories: Arc<dyn VolumeDirectoryResolver>,
        modes: Arc<dyn VolumeModeResolver>,
        fs: Arc<dyn Filesystem>,
    ) -> Self {
        Self {
            config,
            directories,
            modes,
            matcher: Arc::new(SinglePathMatcher),
            fs,
        }
    }

    /// Replaces the path matcher.
    #[must_use]
    pub fn with_matcher(mut self, matcher: Arc<dyn PathMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ExposerConfig {
        &self.config
    }

    /// Resolves the host location of `volume` in `pod`.
    ///
    /// The returned [`AccessPoint::by_path`] is exactly what the matcher
    /// produced.
    ///
    /// # Errors
    ///
    /// - [`ExposerError::VolumeDirectory`] if the directory lookup fails
    /// - [`ExposerError::VolumeMode`] if the mode lookup fails
    /// - [`ExposerError::PathMatch`] unless exactly one host path matches
    /// - [`ExposerError::Cancelled`] if `cancel` fires first
    #[instrument(skip_all, fields(pod = %pod.qualified_name(), pod_uid = %pod.uid, volume = %volume))]
    pub async fn get_pod_volume_host_path(
        &self,
        cancel: &CancellationToken,
        pod: &PodRef,
        volume: &str,
    ) -> Result<AccessPoint> {
        let token = run_cancellable(cancel, self.directories.volume_directory(cancel, pod, volume))
            .await?
            .map_err(|source| {
                warn!(error = %source, "volume directory lookup failed");
                ExposerError::VolumeDirectory {
                    volume: volume.to_string(),
                    pod: pod.name.clone(),
                    source,
                }
            })?;
        info!(vol_dir = %token, "got volume dir");

        let vol_mode = run_cancellable(cancel, self.modes.volume_mode(cancel, pod, volume))
            .await?
            .map_err(|source| {
                warn!(error = %source, "volume mode lookup failed");
                ExposerError::VolumeMode {
                    volume: volume.to_string(),
                    pod: pod.name.clone(),
                    source,
                }
            })?;

        let pattern = SearchPattern::for_volume(&self.config, &pod.uid, vol_mode, &token);
        debug!(%vol_mode, pattern = %pattern, "looking for path matching glob");

        ensure_active(cancel)?;
        let by_path = self
            .matcher
            .match_single(pattern.as_str(), self.fs.as_ref())
            .map_err(|source| {
                warn!(pattern = %pattern, error = %source, "no unique volume path on host");
                ExposerError::PathMatch {
                    volume: volume.to_string(),
                    pod: pod.name.clone(),
                    source,
                }
            })?;
        info!(path = %by_path, "found path matching glob");

        Ok(AccessPoint { by_path, vol_mode })
    }
}

impl std::fmt::Debug for HostPathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostPathResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BoxError, MatchError};
    use crate::fs::FakeFilesystem;
    use crate::lookup::{FakeResponse, FakeVolumeLookup};
    use crate::matcher::FnPathMatcher;
    use crate::types::VolumeMode;

    fn resolver(lookup: &Arc<FakeVolumeLookup>, fs: FakeFilesystem) -> HostPathResolver {
        HostPathResolver::new(
            ExposerConfig::default(),
            lookup.clone(),
            lookup.clone(),
            Arc::new(fs),
        )
    }

    fn failing_matcher(message: &'static str) -> Arc<dyn PathMatcher> {
        Arc::new(FnPathMatcher::new(
            move |_: &str, _: &dyn Filesystem| -> std::result::Result<String, BoxError> {
                Err(message.into())
            },
        ))
    }

    #[tokio::test]
    async fn get_volume_dir_fail() {
        let lookup = Arc::new(
            FakeVolumeLookup::new("").with_directory(FakeResponse::Fail("fake-error-1".into())),
        );
        let pod = PodRef::new("velero", "fake-pod-1", "fake-pod-1-id");

        let err = resolver(&lookup, FakeFilesystem::new())
            .get_pod_volume_host_path(&CancellationToken::new(), &pod, "fake-pvc-1")
            .await
            .expect_err("directory failure");

        assert_eq!(
            err.to_string(),
            "error getting volume directory name for volume fake-pvc-1 in pod fake-pod-1: fake-error-1"
        );
        // Mode is never looked up once the directory lookup failed.
        assert_eq!(lookup.mode_calls(), 0);
    }

    #[tokio::test]
    async fn get_volume_mode_fail() {
        let lookup = Arc::new(
            FakeVolumeLookup::new("fake-pvc-1").with_mode(FakeResponse::Fail("fake-error-3".into())),
        );
        let pod = PodRef::new("velero", "fake-pod-1", "fake-pod-1-id");

        let err = resolver(&lookup, FakeFilesystem::new())
            .get_pod_volume_host_path(&CancellationToken::new(), &pod, "fake-pvc-1")
            .await
            .expect_err("mode failure");

        assert!(matches!(err, ExposerError::VolumeMode { .. }));
        assert_eq!(
            err.to_string(),
            "error getting volume mode for volume fake-pvc-1 in pod fake-pod-1: fake-error-3"
        );
    }

    #[tokio::test]
    async fn single_path_match_fail() {
        let lookup = Arc::new(FakeVolumeLookup::new(""));
        let pod = PodRef::new("velero", "fake-pod-2", "fake-pod-2-id");

        let err = resolver(&lookup, FakeFilesystem::new())
            .with_matcher(failing_matcher("fake-error-2"))
            .get_pod_volume_host_path(&CancellationToken::new(), &pod, "fake-pvc-1")
            .await
            .expect_err("match failure");

        assert_eq!(
            err.to_string(),
            "error identifying unique volume path on host for volume fake-pvc-1 in pod fake-pod-2: fake-error-2"
        );
    }

    #[tokio::test]
    async fn get_block_volume_dir_success() {
        let lookup = Arc::new(
            FakeVolumeLookup::new("fake-pvc-1").with_mode(FakeResponse::Ready(VolumeMode::Block)),
        );
        let pod = PodRef::new("velero", "fake-pod-1", "fake-pod-1-id");
        let matcher: Arc<dyn PathMatcher> = Arc::new(FnPathMatcher::new(
            |pattern: &str, _: &dyn Filesystem| -> std::result::Result<String, BoxError> {
                assert_eq!(pattern, "/host_pods/fake-pod-1-id/volumeDevices/*/fake-pvc-1*");
                Ok("/host_pods/fake-pod-1-id/volumeDevices/kubernetes.io~csi/fake-pvc-1-id".into())
            },
        ));

        let access = resolver(&lookup, FakeFilesystem::new())
            .with_matcher(matcher)
            .get_pod_volume_host_path(&CancellationToken::new(), &pod, "fake-pvc-1")
            .await
            .expect("resolved");

        assert_eq!(
            access.by_path,
            "/host_pods/fake-pod-1-id/volumeDevices/kubernetes.io~csi/fake-pvc-1-id"
        );
        assert_eq!(access.vol_mode, VolumeMode::Block);
    }

    #[tokio::test]
    async fn filesystem_volume_resolved_from_fake_fs() {
        let lookup = Arc::new(FakeVolumeLookup::new("pvc-1234/mount"));
        let fs = FakeFilesystem::new()
            .with_path("/host_pods/uid-1/volumes/kubernetes.io~csi/pvc-1234/mount")
            .with_path("/host_pods/uid-1/volumeDevices/kubernetes.io~csi/pvc-1234")
            .with_path("/host_pods/uid-2/volumes/kubernetes.io~csi/pvc-1234/mount");
        let pod = PodRef::new("app", "web-0", "uid-1");

        let access = resolver(&lookup, fs)
            .get_pod_volume_host_path(&CancellationToken::new(), &pod, "data")
            .await
            .expect("resolved");

        assert_eq!(
            access.by_path,
            "/host_pods/uid-1/volumes/kubernetes.io~csi/pvc-1234/mount"
        );
        assert_eq!(access.vol_mode, VolumeMode::Filesystem);
    }

    #[tokio::test]
    async fn ambiguous_match_never_picks_a_candidate() {
        let lookup = Arc::new(FakeVolumeLookup::new("pvc-1234/mount"));
        let fs = FakeFilesystem::new()
            .with_path("/host_pods/uid-1/volumes/kubernetes.io~csi/pvc-1234/mount")
            .with_path("/host_pods/uid-1/volumes/kubernetes.io~other/pvc-1234/mount");
        let pod = PodRef::new("app", "web-0", "uid-1");

        let err = resolver(&lookup, fs)
            .get_pod_volume_host_path(&CancellationToken::new(), &pod, "data")
            .await
            .expect_err("ambiguous");

        assert!(matches!(
            err.match_error(),
            Some(MatchError::AmbiguousMatch { count: 2, .. })
        ));
        assert!(err.to_string().starts_with(
            "error identifying unique volume path on host for volume data in pod web-0: expected one matching path"
        ));
    }

    #[tokio::test]
    async fn missing_volume_is_no_match() {
        let lookup = Arc::new(FakeVolumeLookup::new("pvc-1234/mount"));
        let pod = PodRef::new("app", "web-0", "uid-1");

        let err = resolver(&lookup, FakeFilesystem::new())
            .get_pod_volume_host_path(&CancellationToken::new(), &pod, "data")
            .await
            .expect_err("no match");

        assert!(matches!(err.match_error(), Some(MatchError::NoMatch { .. })));
    }

    #[tokio::test]
    async fn pinned_plugin_segment_excludes_other_plugins() {
        let lookup = Arc::new(FakeVolumeLookup::new("pvc-1234/mount"));
        let fs = FakeFilesystem::new()
            .with_path("/host_pods/uid-1/volumes/kubernetes.io~csi/pvc-1234/mount")
            .with_path("/host_pods/uid-1/volumes/kubernetes.io~other/pvc-1234/mount");
        let pod = PodRef::new("app", "web-0", "uid-1");
        let resolver = HostPathResolver::new(
            ExposerConfig::default().with_plugin_segment("kubernetes.io~csi"),
            lookup.clone(),
            lookup,
            Arc::new(fs),
        );

        let access = resolver
            .get_pod_volume_host_path(&CancellationToken::new(), &pod, "data")
            .await
            .expect("resolved");
        assert_eq!(
            access.by_path,
            "/host_pods/uid-1/volumes/kubernetes.io~csi/pvc-1234/mount"
        );
    }

    #[tokio::test]
    async fn cancelled_before_directory_lookup_completes() {
        let lookup =
            Arc::new(FakeVolumeLookup::new("").with_directory(FakeResponse::Pending));
        let pod = PodRef::new("app", "web-0", "uid-1");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = resolver(&lookup, FakeFilesystem::new())
            .get_pod_volume_host_path(&cancel, &pod, "data")
            .await
            .expect_err("cancelled");

        assert!(err.is_cancelled());
        assert!(err.match_error().is_none());
        assert_eq!(lookup.mode_calls(), 0);
    }

    #[tokio::test]
    async fn repeated_resolution_is_identical() {
        let lookup = Arc::new(FakeVolumeLookup::new("pvc-1234/mount"));
        let fs = FakeFilesystem::new()
            .with_path("/host_pods/uid-1/volumes/kubernetes.io~csi/pvc-1234/mount");
        let resolver = resolver(&lookup, fs);
        let pod = PodRef::new("app", "web-0", "uid-1");
        let cancel = CancellationToken::new();

        let first = resolver
            .get_pod_volume_host_path(&cancel, &pod, "data")
            .await
            .expect("first");
        let second = resolver
            .get_pod_volume_host_path(&cancel, &pod, "data")
            .await
            .expect("second");

        assert_eq!(first, second);
        assert_eq!(lookup.directory_calls(), 2);
    }

    #[tokio::test]
    async fn empty_token_never_resolves_to_plugin_directory() {
        let lookup = Arc::new(FakeVolumeLookup::new(""));
        let fs = FakeFilesystem::new()
            .with_path("/host_pods/uid-1/volumes/kubernetes.io~csi/pvc-1/mount");
        let pod = PodRef::new("app", "web-0", "uid-1");

        let access = resolver(&lookup, fs.clone())
            .get_pod_volume_host_path(&CancellationToken::new(), &pod, "data")
            .await
            .expect("resolved");
        assert_eq!(access.by_path, "/host_pods/uid-1/volumes/kubernetes.io~csi/pvc-1");

        let fs = fs.with_path("/host_pods/uid-1/volumes/kubernetes.io~csi/pvc-2/mount");
        let err = resolver(&lookup, fs)
            .get_pod_volume_host_path(&CancellationToken::new(), &pod, "data")
            .await
            .expect_err("ambiguous");
        assert!(matches!(
            err.match_error(),
            Some(MatchError::AmbiguousMatch { count: 2, .. })
        ));
    }
}
