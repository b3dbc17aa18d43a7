use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

/// Status published when the service entry point unwinds instead of returning.
pub const PANICKED: i32 = 101;

/// Exit status of the filesystem service, shared between the controller and
/// the worker thread.
///
/// `0` means the worker has not terminated yet. The worker publishes its
/// result exactly once through the matching [`StatusWriter`]; after a non-zero
/// value is stored it never changes again.
#[derive(Debug, Clone)]
pub struct StatusCell {
    value: Arc<AtomicI32>,
}

/// One-shot write access to a [`StatusCell`], handed to the worker.
#[derive(Debug)]
pub struct StatusWriter {
    value: Arc<AtomicI32>,
    published: bool,
}

impl StatusCell {
    pub fn new() -> (StatusCell, StatusWriter) {
        let value = Arc::new(AtomicI32::new(0));
        let writer = StatusWriter {
            value: value.clone(),
            published: false,
        };
        (StatusCell { value }, writer)
    }

    pub fn get(&self) -> i32 {
        self.value.load(Ordering::Acquire)
    }

    /// Returns the published code once the worker has stored a non-zero status.
    pub fn failure(&self) -> Option<i32> {
        match self.get() {
            0 => None,
            code => Some(code),
        }
    }
}

impl StatusWriter {
    pub fn publish(mut self, code: i32) {
        self.store(code);
    }

    fn store(&mut self, code: i32) {
        self.published = true;
        // First non-zero value wins.
        let _ = self
            .value
            .compare_exchange(0, code, Ordering::AcqRel, Ordering::Acquire);
    }
}

impl Drop for StatusWriter {
    fn drop(&mut self) {
        if !self.published {
            tracing::error!("filesystem service exited without reporting a status");
            self.store(PANICKED);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_value_is_zero() {
        let (cell, _writer) = StatusCell::new();
        assert_eq!(cell.get(), 0);
        assert_eq!(cell.failure(), None);
    }

    #[test]
    fn test_published_value_is_stable() {
        let (cell, writer) = StatusCell::new();
        let reader = cell.clone();
        writer.publish(7);
        for _ in 0..1000 {
            assert_eq!(cell.get(), 7);
            assert_eq!(reader.failure(), Some(7));
        }
    }

    #[test]
    fn test_publish_zero_keeps_cell_clear() {
        let (cell, writer) = StatusCell::new();
        writer.publish(0);
        assert_eq!(cell.failure(), None);
    }

    #[test]
    fn test_dropped_writer_reports_panic() {
        let (cell, writer) = StatusCell::new();
        drop(writer);
        assert_eq!(cell.failure(), Some(PANICKED));
    }

    #[test]
    fn test_publish_visible_across_threads() {
        let (cell, writer) = StatusCell::new();
        std::thread::spawn(move || writer.publish(-3))
            .join()
            .unwrap();
        assert_eq!(cell.failure(), Some(-3));
    }

    #[test]
    fn test_panicking_thread_publishes_panic_status() {
        let (cell, writer) = StatusCell::new();
        let result = std::thread::spawn(move || {
            let _writer = writer;
            panic!("entry point blew up");
        })
        .join();
        assert!(result.is_err());
        assert_eq!(cell.failure(), Some(PANICKED));
    }
}
