//! Per-job wall clock accounting.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::{WorkerError, WorkerResult};

/// Tracks a job's hard wall clock so subprocess calls can inherit the
/// remaining budget.
#[derive(Debug, Clone)]
pub struct JobDeadline {
    started: Instant,
    hard: Duration,
}

impl JobDeadline {
    pub fn new(hard: Duration) -> Self {
        Self {
            started: Instant::now(),
            hard,
        }
    }

    /// Remaining budget, or a timeout error once exhausted.
    pub fn remaining(&self) -> WorkerResult<Duration> {
        let elapsed = self.started.elapsed();
        if elapsed >= self.hard {
            return Err(WorkerError::Timeout(self.hard.as_secs()));
        }
        Ok(self.hard - elapsed)
    }
}

/// Spawn a task that logs a warning when the soft wall clock passes.
/// Abort the returned handle when the job finishes.
pub fn spawn_soft_timeout_warning(
    record_id: String,
    soft: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(soft).await;
        warn!(
            record = %record_id,
            soft_secs = soft.as_secs(),
            "Job passed the soft wall clock and is still running"
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_shrinks_from_hard_budget() {
        let deadline = JobDeadline::new(Duration::from_secs(100));
        let remaining = deadline.remaining().unwrap();
        assert!(remaining <= Duration::from_secs(100));
        assert!(remaining > Duration::from_secs(90));
    }

    #[test]
    fn exhausted_budget_is_a_timeout() {
        let deadline = JobDeadline {
            started: Instant::now() - Duration::from_secs(10),
            hard: Duration::from_secs(5),
        };
        assert!(matches!(
            deadline.remaining(),
            Err(WorkerError::Timeout(5))
        ));
    }
}
