use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

/// How to start a compiled artifact. Written next to the artifact by the
/// compiler and read back by the executor, which knows nothing else about
/// the artifact's format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchDescriptor {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchDescriptorError {
    #[error("failed to access launch descriptor {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed launch descriptor {}: {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl LaunchDescriptor {
    /// The artifact is itself a native executable.
    pub fn native(executable: &Path) -> Self {
        Self {
            program: executable.to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// The artifact is loaded by a runtime host, e.g. `mono program.exe`.
    pub fn hosted(runtime: &Path, artifact: &Path) -> Self {
        Self {
            program: runtime.to_path_buf(),
            args: vec![artifact.to_string_lossy().into_owned()],
            env: BTreeMap::new(),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), LaunchDescriptorError> {
        let content = serde_json::to_vec_pretty(self).map_err(|source| LaunchDescriptorError::Format {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content)
            .await
            .map_err(|source| LaunchDescriptorError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    pub async fn load(path: &Path) -> Result<Self, LaunchDescriptorError> {
        let content = fs::read(path)
            .await
            .map_err(|source| LaunchDescriptorError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_slice(&content).map_err(|source| LaunchDescriptorError::Format {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("program.launch.json");

        let descriptor = LaunchDescriptor::hosted(Path::new("/usr/bin/mono"), Path::new("/tmp/program.exe"));
        descriptor.save(&path).await.unwrap();

        let loaded = LaunchDescriptor::load(&path).await.unwrap();
        assert_eq!(loaded.program, PathBuf::from("/usr/bin/mono"));
        assert_eq!(loaded.args, vec!["/tmp/program.exe".to_string()]);
    }

    #[tokio::test]
    async fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = LaunchDescriptor::load(&dir.path().join("missing.json")).await;
        assert!(matches!(missing, Err(LaunchDescriptorError::Io { .. })));

        let garbage_path = dir.path().join("garbage.json");
        std::fs::write(&garbage_path, "{ not json").unwrap();
        let garbage = LaunchDescriptor::load(&garbage_path).await;
        assert!(matches!(garbage, Err(LaunchDescriptorError::Format { .. })));
    }
}
