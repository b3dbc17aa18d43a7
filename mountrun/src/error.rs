use std::io;
use std::time::Duration;

use thiserror::Error;

/// Exit code used when startup fails for a reason other than the service's
/// own status.
pub const STARTUP_FAILED: i32 = -1;

/// Reasons the controller gives up before the mount becomes usable.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to spawn filesystem service thread: {0}")]
    Spawn(#[from] io::Error),

    #[error("Filesystem service startup failed with status {code}. Exiting ...")]
    WorkerFailed { code: i32 },

    #[error("Exceeded startup time ({cycles} polls over {waited:?}). Exiting ...")]
    Timeout { cycles: u32, waited: Duration },
}

impl StartupError {
    /// Process exit code for this failure. A failed service surfaces its own
    /// status verbatim.
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::WorkerFailed { code } => *code,
            StartupError::Spawn(_) | StartupError::Timeout { .. } => STARTUP_FAILED,
        }
    }
}
