//! Artifact types for the content-addressed upload pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How an artifact ended up in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupState {
    /// The artifact was uploaded this run.
    Uploaded,
    /// An identical-hash artifact already existed; no upload performed.
    Found,
}

impl fmt::Display for DedupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uploaded => write!(f, "uploaded"),
            Self::Found => write!(f, "found"),
        }
    }
}

/// A local build output awaiting upload, identified by its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
    /// Path of the file on disk.
    pub path: PathBuf,
    /// Streamed SHA-256 of the file contents, hex encoded.
    pub hashsum: String,
}

impl LocalArtifact {
    /// Creates a new local artifact.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, hashsum: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hashsum: hashsum.into(),
        }
    }

    /// Returns the file name component of the artifact path.
    #[must_use]
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// The outcome of pushing one artifact through the dedup/upload pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// The artifact's file name.
    pub filename: String,
    /// Where the artifact lives in storage.
    pub uri: String,
    /// Storage etag; absent on a dedup hit.
    pub etag: Option<String>,
    /// Whether the artifact was uploaded or found already stored.
    pub state: DedupState,
    /// When the record was produced (ISO 8601).
    pub timestamp: String,
}

impl ArtifactRecord {
    /// Creates a record for an artifact uploaded this run.
    #[must_use]
    pub fn uploaded(filename: impl Into<String>, uri: impl Into<String>, etag: Option<String>) -> Self {
        Self {
            filename: filename.into(),
            uri: uri.into(),
            etag,
            state: DedupState::Uploaded,
            timestamp: crate::utils::iso_timestamp(),
        }
    }

    /// Creates a record for a dedup hit on an already-stored artifact.
    #[must_use]
    pub fn found(filename: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            uri: uri.into(),
            etag: None,
            state: DedupState::Found,
            timestamp: crate::utils::iso_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_artifact_filename() {
        let artifact = LocalArtifact::new("/tmp/build/output.zip", "abc123");
        assert_eq!(artifact.filename(), "output.zip");
    }

    #[test]
    fn test_uploaded_record() {
        let record = ArtifactRecord::uploaded("a.zip", "run-1/artifacts/a.zip", Some("etag-1".to_string()));
        assert_eq!(record.state, DedupState::Uploaded);
        assert_eq!(record.etag.as_deref(), Some("etag-1"));
    }

    #[test]
    fn test_found_record_has_no_etag() {
        let record = ArtifactRecord::found("a.zip", "other-run/artifacts/a.zip");
        assert_eq!(record.state, DedupState::Found);
        assert!(record.etag.is_none());
    }

    #[test]
    fn test_dedup_state_serialize() {
        assert_eq!(serde_json::to_string(&DedupState::Found).unwrap(), r#""found""#);
        assert_eq!(serde_json::to_string(&DedupState::Uploaded).unwrap(), r#""uploaded""#);
    }
}
