use std::thread;
use std::time::Duration;

use crate::config::{MAX_WAIT_CYCLES, POLL_INTERVAL};
use crate::status::StatusCell;

/// How long the controller is willing to wait for the service to come up:
/// at most `max_cycles` polls, `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub max_cycles: u32,
    pub interval: Duration,
}

impl RetryBudget {
    pub fn new(max_cycles: u32, interval: Duration) -> Self {
        Self {
            max_cycles: max_cycles.max(1),
            interval,
        }
    }

    /// Worst-case time spent sleeping before giving up.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_cycles
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(MAX_WAIT_CYCLES, POLL_INTERVAL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// The service reported ready on poll `cycle` (1-based).
    Ready { cycle: u32 },
    /// The worker published a non-zero status before the service became ready.
    WorkerFailed { code: i32, cycle: u32 },
    /// The budget ran out with the worker still alive and the service not ready.
    Timeout { cycles: u32 },
}

impl GateOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, GateOutcome::Ready { .. })
    }
}

pub struct ReadinessGate {
    budget: RetryBudget,
}

impl ReadinessGate {
    pub fn new(budget: RetryBudget) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> RetryBudget {
        self.budget
    }

    /// Polls until `is_ready` returns true, the worker publishes a failure, or
    /// the budget is spent. `is_ready` is queried once per cycle plus once
    /// more after the last sleep, so at most `max_cycles + 1` times.
    pub fn wait<F>(&self, status: &StatusCell, mut is_ready: F) -> GateOutcome
    where
        F: FnMut() -> bool,
    {
        let RetryBudget {
            max_cycles,
            interval,
        } = self.budget;

        for cycle in 1..=max_cycles {
            if let Some(code) = status.failure() {
                tracing::debug!(code, cycle, "Worker terminated before the mount was ready");
                return GateOutcome::WorkerFailed { code, cycle };
            }
            if is_ready() {
                tracing::debug!(cycle, "Filesystem service is ready");
                return GateOutcome::Ready { cycle };
            }
            tracing::trace!(cycle, max_cycles, "Filesystem service not ready yet");
            thread::sleep(interval);
        }

        // The last sleep may have been enough for either outcome.
        if let Some(code) = status.failure() {
            tracing::debug!(code, "Worker terminated while the budget ran out");
            return GateOutcome::WorkerFailed {
                code,
                cycle: max_cycles,
            };
        }
        if is_ready() {
            tracing::debug!(max_cycles, "Filesystem service became ready on the last cycle");
            return GateOutcome::Ready { cycle: max_cycles };
        }
        tracing::debug!(max_cycles, "Readiness budget exhausted");
        GateOutcome::Timeout { cycles: max_cycles }
    }
}
