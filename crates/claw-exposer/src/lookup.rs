//! Collaborator contracts consumed by the resolvers.
//!
//! Talking to the cluster API, working out which volume plugin backs a
//! claim, and querying the node-agent daemon all happen outside this crate.
//! The resolvers only see these traits, injected at construction time, so
//! tests swap in the fakes below without any global state.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::BoxError;
use crate::types::{PodRef, VolumeMode};

/// Boxed future returned by collaborator calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Resolves the plugin-assigned directory name of a pod volume.
pub trait VolumeDirectoryResolver: Send + Sync {
    /// Returns the directory or device-file name the volume plugin uses for
    /// `volume` in `pod`. An empty string is a valid answer.
    ///
    /// # Errors
    ///
    /// Returns error if the claim or its backing volume cannot be looked up.
    fn volume_directory<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        pod: &'a PodRef,
        volume: &'a str,
    ) -> BoxFuture<'a, Result<String, BoxError>>;
}

/// Resolves whether a pod volume is a filesystem or a block volume.
pub trait VolumeModeResolver: Send + Sync {
    /// Returns the storage mode of `volume` in `pod`.
    ///
    /// # Errors
    ///
    /// Returns error if the claim or its backing volume cannot be looked up.
    fn volume_mode<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        pod: &'a PodRef,
        volume: &'a str,
    ) -> BoxFuture<'a, Result<VolumeMode, BoxError>>;
}

/// Queries the node-agent running on a node for its kubelet pods root.
pub trait NodeAgentPathClient: Send + Sync {
    /// Returns the real host directory the node-agent mounts at its
    /// mount-point marker, e.g. `/var/lib/kubelet/pods`.
    ///
    /// # Errors
    ///
    /// Returns error if the node-agent cannot be reached or reports no path.
    fn host_pod_path<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        node_name: &'a str,
        namespace: &'a str,
    ) -> BoxFuture<'a, Result<String, BoxError>>;
}

/// Scripted answer of a fake collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeResponse<T> {
    /// Succeed with the value.
    Ready(T),
    /// Fail with the message.
    Fail(String),
    /// Never complete.
    Pending,
}

impl<T: Clone + Send + 'static> FakeResponse<T> {
    fn respond(&self) -> BoxFuture<'static, Result<T, BoxError>> {
        let response = self.clone();
        Box::pin(async move {
            match response {
                Self::Ready(value) => Ok(value),
                Self::Fail(message) => Err(BoxError::from(message)),
                Self::Pending => std::future::pending().await,
            }
        })
    }
}

/// A fake volume lookup for testing, answering both directory and mode
/// queries.
#[derive(Debug)]
pub struct FakeVolumeLookup {
    directory: FakeResponse<String>,
    mode: FakeResponse<VolumeMode>,
    directory_calls: AtomicUsize,
    mode_calls: AtomicUsize,
}

impl FakeVolumeLookup {
    /// Creates a lookup answering `directory` in filesystem mode.
    #[must_use]
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            directory: FakeResponse::Ready(directory.into()),
            mode: FakeResponse::Ready(VolumeMode::Filesystem),
            directory_calls: AtomicUsize::new(0),
            mode_calls: AtomicUsize::new(0),
        }
    }

    /// Sets the directory response.
    #[must_use]
    pub fn with_directory(mut self, response: FakeResponse<String>) -> Self {
        self.directory = response;
        self
    }

    /// Sets the mode response.
    #[must_use]
    pub fn with_mode(mut self, response: FakeResponse<VolumeMode>) -> Self {
        self.mode = response;
        self
    }

    /// Number of directory queries received.
    #[must_use]
    pub fn directory_calls(&self) -> usize {
        self.directory_calls.load(Ordering::SeqCst)
    }

    /// Number of mode queries received.
    #[must_use]
    pub fn mode_calls(&self) -> usize {
        self.mode_calls.load(Ordering::SeqCst)
    }
}

impl VolumeDirectoryResolver for FakeVolumeLookup {
    fn volume_directory<'a>(
        &'a self,
        _cancel: &'a CancellationToken,
        pod: &'a PodRef,
        volume: &'a str,
    ) -> BoxFuture<'a, Result<String, BoxError>> {
        self.directory_calls.fetch_add(1, Ordering::SeqCst);
        debug!(pod = %pod, volume, "fake volume directory lookup");
        self.directory.respond()
    }
}

impl VolumeModeResolver for FakeVolumeLookup {
    fn volume_mode<'a>(
        &'a self,
        _cancel: &'a CancellationToken,
        pod: &'a PodRef,
        volume: &'a str,
    ) -> BoxFuture<'a, Result<VolumeMode, BoxError>> {
        self.mode_calls.fetch_add(1, Ordering::SeqCst);
        debug!(pod = %pod, volume, "fake volume mode lookup");
        self.mode.respond()
    }
}

/// A fake node-agent for testing.
#[derive(Debug)]
pub struct FakeNodeAgent {
    response: FakeResponse<String>,
    queries: Mutex<Vec<(String, String)>>,
}

impl FakeNodeAgent {
    /// Creates a node-agent reporting `host_pod_path`.
    #[must_use]
    pub fn new(host_pod_path: impl Into<String>) -> Self {
        Self::with_response(FakeResponse::Ready(host_pod_path.into()))
    }

    /// Creates a node-agent with a scripted response.
    #[must_use]
    pub fn with_response(response: FakeResponse<String>) -> Self {
        Self {
            response,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Every `(node_name, namespace)` pair queried so far.
    #[must_use]
    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().clone()
    }
}

impl NodeAgentPathClient for FakeNodeAgent {
    fn host_pod_path<'a>(
        &'a self,
        _cancel: &'a CancellationToken,
        node_name: &'a str,
        namespace: &'a str,
    ) -> BoxFuture<'a, Result<String, BoxError>> {
        self.queries
            .lock()
            .push((node_name.to_string(), namespace.to_string()));
        self.response.respond()
    }
}
