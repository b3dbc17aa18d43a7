pub mod overlay;

use std::path::PathBuf;

pub use overlay::OverlayService;

/// Invocation strings handed to the filesystem service when it is spawned.
///
/// The controller shares this with the worker as an `Arc`, so it stays alive
/// for as long as either side may still read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceArgs {
    /// argv[0] of the launcher, used as a label in logs.
    pub program: String,
    /// Backing image exposed read-only through the mount.
    pub image: PathBuf,
    pub mountpoint: PathBuf,
}

impl ServiceArgs {
    pub fn new(
        program: impl Into<String>,
        image: impl Into<PathBuf>,
        mountpoint: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            image: image.into(),
            mountpoint: mountpoint.into(),
        }
    }
}

/// A filesystem service that can be mounted on a worker thread and driven by
/// the lifecycle controller.
pub trait FsService: Send + Sync {
    /// Mounts and serves the filesystem, blocking until it is unmounted or
    /// fails. Returns the service's exit status.
    fn run(&self, args: &ServiceArgs) -> i32;

    /// Whether the mount is up and can serve requests. Must not block.
    fn is_ready(&self) -> bool;

    /// Asks a running service to unmount and let `run` return. Must not block.
    fn request_stop(&self);

    /// Best-effort release of the mount when the controller gives up on the
    /// service without waiting for it.
    fn abandon(&self, args: &ServiceArgs) {
        let _ = args;
        self.request_stop();
    }
}
