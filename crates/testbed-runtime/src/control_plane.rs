use crate::RuntimeError;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

/// Something that can apply a manifest file against a cluster.
///
/// Implementations must give up after `timeout` and release whatever they
/// started (child processes, connections) on every exit path, including when
/// the returned future is dropped early.
pub trait ControlPlane: Send + Sync {
    fn name(&self) -> &str;

    /// Apply `manifest`, returning the client's combined output on success.
    fn apply(
        &self,
        manifest: &Path,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, RuntimeError>> + Send;
}
