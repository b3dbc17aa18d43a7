use std::fmt;
use std::sync::Arc;

use crate::action::MountAction;
use crate::error::StartupError;
use crate::gate::{GateOutcome, ReadinessGate, RetryBudget};
use crate::service::{FsService, ServiceArgs};
use crate::status::StatusCell;
use crate::worker::Worker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Init,
    Starting,
    AwaitingReady,
    Active,
    Failed,
    TerminatedClean,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Init => "init",
            LifecycleState::Starting => "starting",
            LifecycleState::AwaitingReady => "awaiting-ready",
            LifecycleState::Active => "active",
            LifecycleState::Failed => "failed",
            LifecycleState::TerminatedClean => "terminated-clean",
        };
        f.write_str(name)
    }
}

/// Starts a filesystem service on a worker thread, waits for it to come up,
/// runs an action against the mount and shuts the service down again.
pub struct Controller<S: FsService + ?Sized> {
    service: Arc<S>,
    gate: ReadinessGate,
    state: LifecycleState,
}

impl<S: FsService + ?Sized + 'static> Controller<S> {
    pub fn new(service: Arc<S>, budget: RetryBudget) -> Self {
        Self {
            service,
            gate: ReadinessGate::new(budget),
            state: LifecycleState::Init,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    fn transition(&mut self, next: LifecycleState) {
        tracing::debug!("Lifecycle {} -> {}", self.state, next);
        self.state = next;
    }

    /// Runs the whole lifecycle.
    ///
    /// On a clean run this returns the service's final status. If the service
    /// fails or does not become ready in time, the worker is abandoned without
    /// being joined and the startup error is returned; the caller is expected
    /// to exit the process.
    pub fn run<A>(&mut self, args: ServiceArgs, action: &mut A) -> Result<i32, StartupError>
    where
        A: MountAction + ?Sized,
    {
        let args = Arc::new(args);
        let (status, writer) = StatusCell::new();

        self.transition(LifecycleState::Starting);
        let worker = match Worker::spawn(self.service.clone(), args.clone(), writer) {
            Ok(worker) => worker,
            Err(e) => {
                self.transition(LifecycleState::Failed);
                let err = StartupError::from(e);
                tracing::debug!("{err}");
                return Err(err);
            }
        };

        self.transition(LifecycleState::AwaitingReady);
        let service = self.service.clone();
        let outcome = self.gate.wait(&status, || service.is_ready());

        let err = match outcome {
            GateOutcome::Ready { cycle } => {
                tracing::info!(
                    "{} mounted at {} after {cycle} poll(s)",
                    args.image.display(),
                    args.mountpoint.display()
                );
                return Ok(self.serve(&args, worker, &status, action));
            }
            GateOutcome::WorkerFailed { code, .. } => StartupError::WorkerFailed { code },
            GateOutcome::Timeout { cycles } => StartupError::Timeout {
                cycles,
                waited: self.gate.budget().max_wait(),
            },
        };

        self.transition(LifecycleState::Failed);
        tracing::debug!("{err}");
        // The worker may still be mid-mount; give the backend a chance to
        // release the mount point, but do not wait for the thread.
        self.service.abandon(&args);
        if !worker.is_finished() {
            tracing::warn!("Leaving filesystem service thread running");
        }
        drop(worker);
        Err(err)
    }

    fn serve<A>(
        &mut self,
        args: &ServiceArgs,
        worker: Worker,
        status: &StatusCell,
        action: &mut A,
    ) -> i32
    where
        A: MountAction + ?Sized,
    {
        self.transition(LifecycleState::Active);
        if let Err(e) = action.perform(&args.mountpoint) {
            tracing::error!("Action against {} failed: {e:?}", args.mountpoint.display());
        }

        tracing::debug!("Requesting filesystem service stop");
        self.service.request_stop();
        worker.join();

        self.transition(LifecycleState::TerminatedClean);
        let code = status.get();
        tracing::info!("Filesystem service exited with status {code}");
        code
    }
}
