//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Jobs processed concurrently by this worker
    pub max_concurrent_jobs: usize,
    /// Base directory for per-job scratch space
    pub work_dir: PathBuf,
    /// Hard per-job wall clock; the job is aborted past this
    pub job_hard_timeout: Duration,
    /// Soft wall clock; a warning fires when a job passes this
    pub job_soft_timeout: Duration,
    /// How often to scan for messages stranded by crashed workers
    pub claim_interval: Duration,
    /// How long a dequeue blocks when the streams are empty
    pub dequeue_block: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            work_dir: PathBuf::from("/tmp/clipforge"),
            job_hard_timeout: Duration::from_secs(65 * 60),
            job_soft_timeout: Duration::from_secs(60 * 60),
            claim_interval: Duration::from_secs(60),
            dequeue_block: Duration::from_secs(1),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: env_parse("WORKER_MAX_JOBS", defaults.max_concurrent_jobs),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            job_hard_timeout: Duration::from_secs(env_parse(
                "WORKER_JOB_HARD_TIMEOUT_SECS",
                defaults.job_hard_timeout.as_secs(),
            )),
            job_soft_timeout: Duration::from_secs(env_parse(
                "WORKER_JOB_SOFT_TIMEOUT_SECS",
                defaults.job_soft_timeout.as_secs(),
            )),
            claim_interval: Duration::from_secs(env_parse(
                "WORKER_CLAIM_INTERVAL_SECS",
                defaults.claim_interval.as_secs(),
            )),
            dequeue_block: defaults.dequeue_block,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_wall_clock_contract() {
        let config = WorkerConfig::default();
        assert_eq!(config.job_hard_timeout, Duration::from_secs(3900));
        assert_eq!(config.job_soft_timeout, Duration::from_secs(3600));
        assert!(config.job_soft_timeout < config.job_hard_timeout);
    }
}
