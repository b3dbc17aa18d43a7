use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::service::{FsService, ServiceArgs};
use crate::status::StatusWriter;

/// The thread running a filesystem service's blocking entry point.
pub struct Worker {
    handle: JoinHandle<()>,
}

impl Worker {
    /// Starts `service.run(args)` on a dedicated thread. The entry point is
    /// called exactly once and its return value is published to `status`.
    pub fn spawn<S>(service: Arc<S>, args: Arc<ServiceArgs>, status: StatusWriter) -> io::Result<Self>
    where
        S: FsService + ?Sized + 'static,
    {
        let handle = thread::Builder::new()
            .name("fs-service".to_string())
            .spawn(move || {
                tracing::debug!(program = %args.program, "Filesystem service thread started");
                let code = service.run(&args);
                tracing::debug!(code, "Filesystem service returned");
                status.publish(code);
            })?;
        Ok(Self { handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the service thread to exit. A panic inside the entry point is
    /// logged; its status has already been published by the dropped writer.
    pub fn join(self) {
        if self.handle.join().is_err() {
            tracing::error!("Filesystem service thread panicked");
        }
    }
}
