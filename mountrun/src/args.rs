use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{LaunchConfig, MAX_WAIT_CYCLES, POLL_INTERVAL};
use crate::gate::RetryBudget;

#[derive(Parser, Debug)]
#[command(
    name = "mountrun",
    about = "Mount an overlay image in the background and run an entry command inside it"
)]
pub struct Cli {
    /// Read-only image directory exposed through the mount
    #[arg(long, value_name = "DIR")]
    pub image: Option<PathBuf>,

    /// Where to mount the image
    #[arg(short, long, value_name = "DIR")]
    pub mountpoint: Option<PathBuf>,

    /// Writable overlay layer
    #[arg(long, value_name = "DIR")]
    pub upper_dir: Option<PathBuf>,

    /// Mount through fusermount even when running as root
    #[arg(long)]
    pub unprivileged: bool,

    /// Number of readiness polls before giving up
    #[arg(long, value_name = "N", default_value_t = MAX_WAIT_CYCLES)]
    pub max_wait_cycles: u32,

    /// Delay between readiness polls
    #[arg(long, value_name = "MS", default_value_t = POLL_INTERVAL.as_millis() as u64)]
    pub poll_interval_ms: u64,

    /// Turn verbose logging on
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to run inside the mount, relative to the mount point
    #[arg(last = true, value_name = "ENTRY")]
    pub entry: Vec<String>,
}

impl Cli {
    pub fn into_config(self, program: impl Into<String>) -> LaunchConfig {
        let mut config = LaunchConfig::new(program);
        if let Some(image) = self.image {
            config.image = image;
        }
        if let Some(mountpoint) = self.mountpoint {
            config.mountpoint = mountpoint;
        }
        if let Some(upper_dir) = self.upper_dir {
            config.upper_dir = upper_dir;
        }
        if self.unprivileged {
            config.privileged = false;
        }
        config.budget = RetryBudget::new(
            self.max_wait_cycles,
            Duration::from_millis(self.poll_interval_ms),
        );
        if !self.entry.is_empty() {
            config.entry = self.entry;
        }
        config
    }
}
