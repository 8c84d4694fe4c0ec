//! Generic analyzer records.
//!
//! An analyzer is a named remote check (a linter, a security scanner)
//! exposed as an execution endpoint. One record per analyzer is all the
//! configuration needed; stages reference analyzers by resource name and
//! the registry fills in the endpoint uri.

use super::{RunConfig, StageDefinition};
use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration record for one analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzerSpec {
    /// The analyzer name, matched against stage resource names.
    pub name: String,
    /// Key into [`RunConfig::options`] holding the analyzer's defaults.
    pub options_key: String,
    /// Path of the analyzer endpoint, relative to the executor base URL.
    pub uri: String,
}

/// Lookup table from analyzer name to its configuration record.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerRegistry {
    by_name: HashMap<String, AnalyzerSpec>,
}

impl AnalyzerRegistry {
    /// Builds a registry from the run configuration's analyzer records.
    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            by_name: config
                .analyzers
                .iter()
                .map(|spec| (spec.name.clone(), spec.clone()))
                .collect(),
        }
    }

    /// Looks up an analyzer by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AnalyzerSpec> {
        self.by_name.get(name)
    }

    /// Resolves an analyzer's default options from the run configuration.
    #[must_use]
    pub fn default_options<'a>(
        &self,
        config: &'a RunConfig,
        name: &str,
    ) -> Option<&'a serde_json::Value> {
        let spec = self.get(name)?;
        config.options.get(&spec.options_key)
    }

    /// Fills in empty resource uris from matching analyzer records.
    ///
    /// A stage may declare a resource by analyzer name alone; the registry
    /// supplies the endpoint. A resource with neither a uri nor a matching
    /// analyzer is a configuration error.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the unresolvable resource.
    pub fn expand(
        &self,
        mut definitions: Vec<StageDefinition>,
    ) -> Result<Vec<StageDefinition>, ValidationError> {
        for definition in &mut definitions {
            for resource in &mut definition.resources {
                if resource.uri.is_empty() {
                    match self.get(&resource.name) {
                        Some(spec) => resource.uri.clone_from(&spec.uri),
                        None => {
                            return Err(ValidationError::new(format!(
                                "Resource '{}' of stage '{}' has no uri and no analyzer record",
                                resource.name, definition.name
                            ))
                            .with_stages(vec![definition.name.clone()]));
                        }
                    }
                }
            }
        }
        Ok(definitions)
    }
}
