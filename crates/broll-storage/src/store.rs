//! Artifact store contract and local-directory implementation.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use broll_media::fs_utils::move_file;
use broll_models::JobId;

use crate::error::{StorageError, StorageResult};

/// Where a stored artifact can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Store-relative key, e.g. `2026/10/18/<job>.mp4`
    pub key: String,
    /// Reference handed back to the caller (URL or file URI)
    pub reference: String,
    pub size_bytes: u64,
}

/// Durable home for finished videos.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Take ownership of the file at `path` and return its reference.
    async fn store(&self, job_id: &JobId, path: &Path) -> StorageResult<ArtifactRef>;
}

/// Configuration for [`LocalArtifactStore`].
#[derive(Debug, Clone)]
pub struct LocalStoreConfig {
    /// Directory artifacts are published into
    pub root: PathBuf,
    /// Public URL prefix serving `root`, if any
    pub public_base_url: Option<String>,
}

/// Publishes artifacts by moving them into a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    config: LocalStoreConfig,
}

impl LocalArtifactStore {
    pub fn new(config: LocalStoreConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    fn reference_for(&self, key: &str, dest: &Path) -> String {
        match &self.config.public_base_url {
            Some(base) => {
                let encoded: Vec<String> = key
                    .split('/')
                    .map(|segment| urlencoding::encode(segment).into_owned())
                    .collect();
                format!("{}/{}", base.trim_end_matches('/'), encoded.join("/"))
            }
            None => format!("file://{}", dest.display()),
        }
    }
}

/// Date-partitioned key for a job's video.
pub fn artifact_key(job_id: &JobId) -> StorageResult<String> {
    if !job_id.is_valid() {
        return Err(StorageError::InvalidKey(job_id.to_string()));
    }
    Ok(format!("{}/{}.mp4", Utc::now().format("%Y/%m/%d"), job_id))
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn store(&self, job_id: &JobId, path: &Path) -> StorageResult<ArtifactRef> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| StorageError::not_found(path.display().to_string()))?;

        let key = artifact_key(job_id)?;
        let dest = self.config.root.join(&key);
        move_file(path, &dest).await?;

        let reference = self.reference_for(&key, &dest);
        info!(job_id = %job_id, key = %key, bytes = metadata.len(), "Stored artifact");

        Ok(ArtifactRef {
            key,
            reference,
            size_bytes: metadata.len(),
        })
    }
}
