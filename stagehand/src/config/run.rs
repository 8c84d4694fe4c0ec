//! Run configuration: the endpoints and credentials a pipeline run uses.

use super::AnalyzerSpec;
use crate::errors::{OrchestratorError, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Object storage endpoint and credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Base URL of the storage service.
    pub url: String,
    /// Access key sent with every storage request.
    pub access_key: String,
    /// Secret key sent with every storage request.
    pub secret_key: String,
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Name of the project being built.
    pub project_name: String,
    /// Project version string.
    #[serde(default)]
    pub version: String,
    /// Base URL of the task tracker.
    pub tracker_url: String,
    /// Base URL of the job execution service; resource uris are appended.
    pub executor_url: String,
    /// Object storage settings.
    pub storage: StorageConfig,
    /// Analyzer records resolving well-known resource names to endpoints.
    #[serde(default)]
    pub analyzers: Vec<AnalyzerSpec>,
    /// Free-form option sets, keyed by analyzer `options_key`.
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

impl RunConfig {
    /// Parses a run configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed, contains unknown keys,
    /// or fails validation.
    pub fn from_str(content: &str) -> Result<Self, OrchestratorError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a run configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OrchestratorError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Validates that the required endpoints are present.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a missing project name or endpoint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_name.trim().is_empty() {
            return Err(ValidationError::new("project_name must not be empty"));
        }
        if self.tracker_url.trim().is_empty() {
            return Err(ValidationError::new("tracker_url must not be empty"));
        }
        if self.executor_url.trim().is_empty() {
            return Err(ValidationError::new("executor_url must not be empty"));
        }
        if self.storage.url.trim().is_empty() {
            return Err(ValidationError::new("storage url must not be empty"));
        }
        Ok(())
    }
}
