use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use cogent_core::error::{CogentError, Result, TimeoutScope};

/// An absolute deadline tagged with the scope that bound it.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    pub scope: TimeoutScope,
    pub at: Instant,
    /// Start of the budget window this deadline was derived from, for
    /// elapsed-time diagnostics.
    pub since: Instant,
    pub limit: Duration,
}

/// Tracks a whole run's time budget and derives nested per-step
/// deadlines from it.
#[derive(Debug, Clone, Copy)]
pub struct TaskDeadline {
    scope: TimeoutScope,
    started: Instant,
    budget: Duration,
}

impl TaskDeadline {
    /// Start the run clock. `scope` is `Task` for a full task run,
    /// `Chat` for one interactive turn.
    pub fn new(scope: TimeoutScope, budget: Duration) -> Self {
        Self {
            scope,
            started: Instant::now(),
            budget,
        }
    }

    pub fn deadline(&self) -> Deadline {
        Deadline {
            scope: self.scope,
            at: self.started + self.budget,
            since: self.started,
            limit: self.budget,
        }
    }

    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.budget
    }

    pub fn to_error(&self) -> CogentError {
        CogentError::TimedOut {
            scope: self.scope,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            limit_ms: self.budget.as_millis() as u64,
        }
    }

    /// Per-step deadline: the step budget clamped to the remaining run
    /// budget. The tighter bound decides the scope reported on expiry,
    /// so a task deadline firing mid-step is still classified as a
    /// task overrun.
    pub fn step_deadline(&self, step_budget: Duration) -> Deadline {
        let now = Instant::now();
        let run = self.deadline();
        if run.at <= now + step_budget {
            run
        } else {
            Deadline {
                scope: TimeoutScope::Step,
                at: now + step_budget,
                since: now,
                limit: step_budget,
            }
        }
    }
}

/// Run a future under a deadline. On expiry the in-flight future is
/// dropped — cancelled, not orphaned — and a `TimedOut` failure for
/// the deadline's scope is returned.
pub async fn run_with_deadline<T, F>(deadline: Deadline, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout_at(deadline.at, fut).await {
        Ok(result) => result,
        Err(_) => Err(CogentError::TimedOut {
            scope: deadline.scope,
            elapsed_ms: deadline.since.elapsed().as_millis() as u64,
            limit_ms: deadline.limit.as_millis() as u64,
        }),
    }
}
