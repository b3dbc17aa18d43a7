use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

use mountrun::{FsService, ServiceArgs};

/// Test double for a filesystem service whose readiness and exit status are
/// scripted up front.
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedService {
    /// `is_ready` starts returning true on this poll (1-based).
    pub ready_on_poll: Option<usize>,
    /// `run` returns this immediately instead of serving.
    pub fail_with: Option<i32>,
    /// Status `run` returns once stopped.
    pub exit_code: i32,
    pub polls: AtomicUsize,
    pub stop_requests: AtomicUsize,
    pub abandoned: AtomicBool,
    pub run_finished: AtomicBool,
    stopped: Mutex<bool>,
    stop_cv: Condvar,
}

#[allow(dead_code)]
impl ScriptedService {
    pub fn ready_on(poll: usize) -> Self {
        Self {
            ready_on_poll: Some(poll),
            ..Default::default()
        }
    }

    pub fn never_ready() -> Self {
        Self::default()
    }

    pub fn failing(code: i32) -> Self {
        Self {
            fail_with: Some(code),
            ..Default::default()
        }
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn stop_requests(&self) -> usize {
        self.stop_requests.load(Ordering::SeqCst)
    }

    /// Lets a blocked `run` return, as an external unmount would.
    pub fn release(&self) {
        let mut stopped = self.stopped.lock().unwrap();
        *stopped = true;
        self.stop_cv.notify_all();
    }
}

impl FsService for ScriptedService {
    fn run(&self, _args: &ServiceArgs) -> i32 {
        if let Some(code) = self.fail_with {
            self.run_finished.store(true, Ordering::SeqCst);
            return code;
        }
        let mut stopped = self.stopped.lock().unwrap();
        while !*stopped {
            stopped = self.stop_cv.wait(stopped).unwrap();
        }
        self.run_finished.store(true, Ordering::SeqCst);
        self.exit_code
    }

    fn is_ready(&self) -> bool {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        self.ready_on_poll.is_some_and(|ready_on| poll >= ready_on)
    }

    fn request_stop(&self) {
        self.stop_requests.fetch_add(1, Ordering::SeqCst);
        self.release();
    }

    // Keep the worker blocked so tests can observe that it was never joined.
    fn abandon(&self, _args: &ServiceArgs) {
        self.abandoned.store(true, Ordering::SeqCst);
    }
}
