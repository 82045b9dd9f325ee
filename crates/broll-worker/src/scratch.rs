//! Per-job scratch directories.

use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use broll_models::JobId;

/// Scratch directory owned by one job.
///
/// Removed by [`ScratchDir::cleanup`] or, failing that, on drop. Either way
/// every file written by cancelled scene work goes with it.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    removed: bool,
}

impl ScratchDir {
    /// Create `<work_dir>/<job_id>` and its stage subdirectories.
    ///
    /// The job ID must be a single plain path component, so the directory
    /// (and everything [`ScratchDir::cleanup`] removes) stays inside
    /// `work_dir`. The returned path is absolute.
    pub async fn create(work_dir: impl AsRef<Path>, job_id: &JobId) -> std::io::Result<Self> {
        let mut components = Path::new(job_id.as_str()).components();
        let single_normal = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single_normal {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("job id {:?} is not a single path component", job_id.as_str()),
            ));
        }

        let path = work_dir.as_ref().join(job_id.as_str());
        tokio::fs::create_dir_all(path.join("raw")).await?;
        tokio::fs::create_dir_all(path.join("normalized")).await?;
        // ffmpeg resolves relative concat entries against the list file
        let path = tokio::fs::canonicalize(&path).await?;
        debug!(path = %path.display(), "Created scratch directory");
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Downloads land here.
    pub fn raw_dir(&self) -> PathBuf {
        self.path.join("raw")
    }

    /// Canonical clips land here.
    pub fn normalized_dir(&self) -> PathBuf {
        self.path.join("normalized")
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub async fn cleanup(mut self) {
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "Removed scratch directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "Failed to remove scratch directory: {}", e),
        }
        self.removed = true;
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), "Failed to remove scratch directory: {}", e);
            }
        }
    }
}
