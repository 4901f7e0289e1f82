use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::core::errors::GradeError;

/// Private directory of one grading run. Every artifact of the run lives
/// inside it, so concurrent runs never share a path. Removed on drop.
#[derive(Debug)]
pub struct ArtifactScope {
    id: Uuid,
    dir: PathBuf,
}

impl ArtifactScope {
    pub async fn create(work_dir: &Path) -> Result<Self, GradeError> {
        let id = Uuid::new_v4();
        let dir = work_dir.join(format!("run_{}", id.simple()));

        fs::create_dir_all(&dir)
            .await
            .map_err(|source| GradeError::Scope {
                path: dir.clone(),
                source,
            })?;

        tracing::debug!(scope = %dir.display(), "Artifact scope created");
        Ok(Self { id, dir })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns a fresh, not yet existing path inside the scope.
    pub fn unique_path(&self, prefix: &str) -> PathBuf {
        self.dir.join(format!("{}_{}", prefix, Uuid::new_v4().simple()))
    }
}

impl Drop for ArtifactScope {
    fn drop(&mut self) {
        // Best effort; a leftover directory is not worth failing a run over.
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(scope = %self.dir.display(), error = %e, "Failed to remove artifact scope");
            }
        }
    }
}
