use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use tokio::sync::Notify;

use super::{FsService, ServiceArgs};
use crate::rt;

/// Status returned by [`OverlayService::run`] when mounting or serving fails.
pub const SERVICE_FAILED: i32 = 1;

/// Serves `image` as the read-only lower layer of a FUSE overlay mount, with
/// writes going to `upper_dir`.
///
/// The mount lives on its own Tokio runtime inside [`FsService::run`], so the
/// controller can stay synchronous and only poll [`FsService::is_ready`].
pub struct OverlayService {
    upper_dir: PathBuf,
    privileged: bool,
    ready: AtomicBool,
    stop: Notify,
}

impl OverlayService {
    pub fn new(upper_dir: impl Into<PathBuf>, privileged: bool) -> Self {
        Self {
            upper_dir: upper_dir.into(),
            privileged,
            ready: AtomicBool::new(false),
            stop: Notify::new(),
        }
    }

    pub fn upper_dir(&self) -> &Path {
        &self.upper_dir
    }

    async fn serve(&self, args: &ServiceArgs) -> Result<()> {
        for dir in [&args.image, &self.upper_dir, &args.mountpoint] {
            if !fs::metadata(dir).map(|m| m.is_dir()).unwrap_or(false) {
                bail!(
                    "Cannot mount: {} does not exist or is not a directory",
                    dir.display()
                );
            }
        }

        let lowerdir = vec![path_string(&args.image)?];
        let upperdir = path_string(&self.upper_dir)?;
        let mountpoint = path_string(&args.mountpoint)?;

        tracing::info!(
            program = %args.program,
            image = %args.image.display(),
            mountpoint = %args.mountpoint.display(),
            upper = %self.upper_dir().display(),
            privileged = self.privileged,
            "Mounting overlay filesystem"
        );
        let mut mount_handle =
            libfuse_fs::overlayfs::mount_fs(mountpoint, upperdir, lowerdir, self.privileged).await;
        self.ready.store(true, Ordering::Release);

        let handle = &mut mount_handle;
        let result = tokio::select! {
            res = handle => {
                tracing::info!("Filesystem session ended without a stop request");
                res.context("Filesystem session failed")
            },
            _ = self.stop.notified() => {
                tracing::debug!("Stop requested, unmounting {}", args.mountpoint.display());
                mount_handle
                    .unmount()
                    .await
                    .with_context(|| format!("Failed to unmount {}", args.mountpoint.display()))
            }
        };
        self.ready.store(false, Ordering::Release);
        result
    }
}

impl FsService for OverlayService {
    fn run(&self, args: &ServiceArgs) -> i32 {
        match rt::block_on("mountrun-fuse", self.serve(args)).and_then(|res| res) {
            Ok(()) => 0,
            Err(e) => {
                tracing::error!("Overlay filesystem service failed: {e:?}");
                SERVICE_FAILED
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn request_stop(&self) {
        self.stop.notify_one();
    }

    fn abandon(&self, args: &ServiceArgs) {
        self.request_stop();
        if is_mounted(&args.mountpoint) {
            force_unmount(&args.mountpoint);
        }
    }
}

fn path_string(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .with_context(|| format!("Path is not valid UTF-8: {}", path.display()))
}

/// Whether `path` shows up as a mount target in /proc/mounts.
fn is_mounted(path: &Path) -> bool {
    let Ok(mounts) = fs::read_to_string("/proc/mounts") else {
        return false;
    };
    let target = path.to_string_lossy();
    mounts
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|mounted| mounted == target)
}

/// Detaches a mount the service did not get to release itself.
fn force_unmount(mountpoint: &Path) {
    let target = mountpoint.to_string_lossy();
    tracing::warn!(mountpoint = %target, "Forcing unmount of abandoned mount");

    // fuse3 ships fusermount3, fuse2 only fusermount
    let output = Command::new("fusermount3")
        .args(["-u", &target])
        .output()
        .or_else(|_| Command::new("fusermount").args(["-u", &target]).output());
    match output {
        Ok(output) if output.status.success() => return,
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(mountpoint = %target, stderr = %stderr, "fusermount -u failed");
        }
        Err(e) => {
            tracing::warn!(mountpoint = %target, error = %e, "Failed to run fusermount");
        }
    }

    if nix::unistd::getuid().is_root()
        && let Err(e) = nix::mount::umount2(mountpoint, nix::mount::MntFlags::MNT_DETACH)
    {
        tracing::warn!(mountpoint = %target, error = %e, "Lazy unmount failed");
    }
}
