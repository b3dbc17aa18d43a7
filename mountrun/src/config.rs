use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;

use crate::action::CommandAction;
use crate::gate::RetryBudget;
use crate::service::ServiceArgs;

pub static IMAGE_PATH: &str = "/var/lib/mountrun/image";
pub static MOUNT_POINT: &str = "/var/lib/mountrun/mnt";
pub static ENTRY: &str = "test-0.sh";
static UPPER_PATH: &str = "/var/lib/mountrun/upper";

pub const MAX_WAIT_CYCLES: u32 = 10;
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub static IS_ROOT: Lazy<bool> = Lazy::new(|| nix::unistd::getuid().is_root());

/// Writable layer of the overlay. Root uses a system path; everyone else
/// gets a directory under their data dir.
pub static UPPER_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if *IS_ROOT {
        PathBuf::from(UPPER_PATH)
    } else {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("mountrun")
            .join("upper")
    }
});

/// Everything the launcher needs for one run, resolved from compiled-in
/// defaults and command line overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub program: String,
    pub image: PathBuf,
    pub mountpoint: PathBuf,
    pub upper_dir: PathBuf,
    pub privileged: bool,
    pub budget: RetryBudget,
    /// Command run inside the mount, `[program, args...]`.
    pub entry: Vec<String>,
}

impl LaunchConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            image: PathBuf::from(IMAGE_PATH),
            mountpoint: PathBuf::from(MOUNT_POINT),
            upper_dir: UPPER_DIR.clone(),
            privileged: *IS_ROOT,
            budget: RetryBudget::default(),
            entry: vec![ENTRY.to_string()],
        }
    }

    pub fn service_args(&self) -> ServiceArgs {
        ServiceArgs::new(&self.program, &self.image, &self.mountpoint)
    }

    pub fn action(&self) -> Result<CommandAction> {
        CommandAction::from_argv(&self.entry).context("No entry command configured")
    }

    /// Creates the upper layer and mount point if needed. The image has to
    /// exist already.
    pub fn prepare(&self) -> Result<()> {
        if !self.image.is_dir() {
            bail!("Image directory {} does not exist", self.image.display());
        }
        fs::create_dir_all(&self.upper_dir).with_context(|| {
            format!("Failed to create upper directory at {:?}", self.upper_dir)
        })?;
        fs::create_dir_all(&self.mountpoint)
            .with_context(|| format!("Failed to create mount point at {:?}", self.mountpoint))?;
        Ok(())
    }
}
