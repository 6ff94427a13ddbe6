use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Changes the process working directory and puts the previous one back on drop.
///
/// The working directory is process-global, so holders must not overlap across threads.
#[derive(Debug)]
pub struct WorkDirGuard {
    previous: PathBuf,
}

impl WorkDirGuard {
    pub fn enter(dir: &Path) -> Result<Self> {
        let previous = env::current_dir().map_err(|e| Error::io("cwd error", e))?;
        env::set_current_dir(dir)
            .map_err(|e| Error::io(format!("failed to enter {}", dir.display()), e))?;
        Ok(Self { previous })
    }

    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for WorkDirGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            tracing::warn!(
                dir = %self.previous.display(),
                "failed to restore working directory: {e}"
            );
        }
    }
}
