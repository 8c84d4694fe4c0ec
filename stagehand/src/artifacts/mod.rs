//! Content-addressed artifact deduplication and upload.

pub mod archive;

use crate::core::{ArtifactRecord, LocalArtifact};
use crate::errors::OrchestratorError;
use crate::storage::ObjectStore;
use crate::tracker::TaskTracker;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Chunk size for streamed hashing; bounds memory on large artifacts.
const HASH_CHUNK_SIZE: usize = 128 * 1024;

/// Computes the streamed SHA-256 of a file, hex encoded.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> Result<String, OrchestratorError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Builds a [`LocalArtifact`] by hashing the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn local_artifact(path: &Path) -> Result<LocalArtifact, OrchestratorError> {
    Ok(LocalArtifact::new(path, hash_file(path)?))
}

/// Decides per artifact whether an upload is needed and performs it.
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    tracker: Arc<dyn TaskTracker>,
    storage: Arc<dyn ObjectStore>,
}

impl ArtifactManager {
    /// Creates a manager over the given tracker and storage clients.
    #[must_use]
    pub fn new(tracker: Arc<dyn TaskTracker>, storage: Arc<dyn ObjectStore>) -> Self {
        Self { tracker, storage }
    }

    /// Pushes each artifact through the dedup/upload pipeline.
    ///
    /// An artifact whose content hash the tracker already knows is
    /// recorded as a dedup hit and not uploaded; anything else lands in
    /// the run's bucket under `artifacts/{filename}`. Artifacts are
    /// processed independently; the check-then-upload is best effort,
    /// not atomic against other runs.
    ///
    /// # Errors
    ///
    /// Returns an error on any tracker or storage failure.
    pub async fn upload_all(
        &self,
        run_id: &str,
        artifacts: &[LocalArtifact],
    ) -> Result<Vec<ArtifactRecord>, OrchestratorError> {
        let mut records = Vec::with_capacity(artifacts.len());

        for artifact in artifacts {
            let filename = artifact.filename();
            match self.tracker.artifact_uri_for_hash(&artifact.hashsum).await? {
                Some(uri) => {
                    info!(%filename, "artifact already stored, skipping upload");
                    records.push(ArtifactRecord::found(filename, uri));
                }
                None => {
                    debug!(%filename, bucket = run_id, "artifact not found, uploading");
                    self.storage.ensure_bucket(run_id).await?;
                    let key = format!("artifacts/{filename}");
                    let stat = self
                        .storage
                        .put_object(run_id, &key, &artifact.path)
                        .await?;
                    let uri = format!("{run_id}/{key}");
                    records.push(ArtifactRecord::uploaded(filename, uri, stat.etag));
                }
            }
        }

        Ok(records)
    }
}
