//! Background mount lifecycle: start a filesystem service on a worker
//! thread, wait for it to become ready, run an action against the mount and
//! shut the service down again.

pub mod action;
pub mod args;
pub mod config;
pub mod controller;
pub mod error;
pub mod gate;
pub mod rt;
pub mod service;
pub mod status;
pub mod worker;

pub use action::{CommandAction, MountAction};
pub use controller::{Controller, LifecycleState};
pub use error::{STARTUP_FAILED, StartupError};
pub use gate::{GateOutcome, ReadinessGate, RetryBudget};
pub use service::{FsService, OverlayService, ServiceArgs};
pub use status::{StatusCell, StatusWriter};
pub use worker::Worker;
