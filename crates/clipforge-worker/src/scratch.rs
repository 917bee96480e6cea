//! Per-job scratch directories.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::WorkerResult;

/// Scratch space for one job, removed on every exit path.
///
/// Backed by a temp directory whose `Drop` deletes it, so cleanup also
/// happens when a job errors out or the task unwinds.
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a scratch directory under `base`, named after the job id.
    pub fn create(base: &Path, job_id: &str) -> WorkerResult<Self> {
        std::fs::create_dir_all(base)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{job_id}-"))
            .tempdir_in(base)?;
        Ok(Self { dir })
    }

    /// The scratch directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_is_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let path;
        {
            let scratch = ScratchDir::create(base.path(), "job-1").unwrap();
            path = scratch.path().to_path_buf();
            std::fs::write(scratch.file("payload.bin"), b"data").unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn scratch_is_removed_when_a_task_panics() {
        let base = tempfile::tempdir().unwrap();
        let base_path = base.path().to_path_buf();

        let result = std::panic::catch_unwind(move || {
            let scratch = ScratchDir::create(&base_path, "job-2").unwrap();
            std::fs::write(scratch.file("payload.bin"), b"data").unwrap();
            panic!("boom");
        });
        assert!(result.is_err());

        // Nothing left behind under the base directory
        let leftovers: Vec<_> = std::fs::read_dir(base.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }
}
